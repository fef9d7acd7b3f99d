// types.rs - Data structures shared by the client, the session controller and the CLI
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::timecode::{format_duration, format_file_size};
use crate::trim::CommittedRange;

// Local video selected for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl VideoFile {
    /// Stat a local file and capture its display name and size
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size_bytes: metadata.len(),
        })
    }
}

// Client-side record of the submitted file and its trim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub name: String,
    pub size: String,
    pub duration: String,
    pub duration_seconds: f64,
    pub start_time: String,
    pub end_time: String,
    pub file_id: Option<String>,
    pub job_id: Option<String>,
}

impl VideoMeta {
    pub fn new(file: &VideoFile, range: &CommittedRange, duration_seconds: f64) -> Self {
        Self {
            name: file.name.clone(),
            size: format_file_size(file.size_bytes),
            duration: format_duration(duration_seconds),
            duration_seconds,
            start_time: range.start.clone(),
            end_time: range.end.clone(),
            file_id: None,
            job_id: None,
        }
    }
}

fn default_success() -> bool {
    true
}

// POST /api/upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    pub file_id: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub duration_seconds: f64,
}

// POST /api/analyze
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub job_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Server-side job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

// GET /api/job/{job_id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub status: JobState,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_phase: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_status_from_wire() {
        let status: JobStatus = serde_json::from_value(json!({
            "job_id": "job-1",
            "status": "processing",
            "progress": 42.5,
            "current_phase": "Tracking players",
            "message": "Frame 120/400"
        }))
        .unwrap();

        assert_eq!(status.status, JobState::Processing);
        assert_eq!(status.progress, 42.5);
        assert_eq!(status.output_file, None);
        assert!(!status.status.is_terminal());
    }

    #[test]
    fn test_failed_job_carries_error() {
        let status: JobStatus = serde_json::from_value(json!({
            "job_id": "job-1",
            "status": "failed",
            "progress": 12,
            "current_phase": "",
            "message": "",
            "error": "decode error"
        }))
        .unwrap();

        assert!(status.status.is_terminal());
        assert_eq!(status.error.as_deref(), Some("decode error"));
    }

    #[test]
    fn test_unknown_job_state_is_rejected() {
        let result = serde_json::from_value::<JobStatus>(json!({
            "job_id": "job-1",
            "status": "paused"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_upload_response_defaults() {
        let upload: UploadResponse = serde_json::from_value(json!({ "file_id": "abc" })).unwrap();
        assert!(upload.success);
        assert_eq!(upload.file_id, "abc");

        let analyze: AnalyzeResponse =
            serde_json::from_value(json!({ "job_id": "j1", "status": "pending" })).unwrap();
        assert_eq!(analyze.job_id, "j1");
        assert_eq!(analyze.extra.get("status"), Some(&json!("pending")));
    }

    #[test]
    fn test_video_meta_snapshot() {
        let file = VideoFile {
            path: PathBuf::from("/tmp/rally.mp4"),
            name: "rally.mp4".to_string(),
            size_bytes: 3 * 1024 * 1024,
        };
        let range = CommittedRange { start: "0:10".into(), end: "0:40".into() };
        let meta = VideoMeta::new(&file, &range, 75.2);

        assert_eq!(meta.size, "3.00 MB");
        assert_eq!(meta.duration, "01:15");
        assert_eq!(meta.start_time, "0:10");
        assert_eq!(meta.end_time, "0:40");
        assert_eq!(meta.file_id, None);
        assert_eq!(meta.job_id, None);
    }

    #[tokio::test]
    async fn test_video_file_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("serve.mov");
        tokio::fs::write(&path, vec![0u8; 2048]).await.unwrap();

        let file = VideoFile::open(&path).await.unwrap();
        assert_eq!(file.name, "serve.mov");
        assert_eq!(file.size_bytes, 2048);

        assert!(VideoFile::open(dir.path()).await.is_err());
        assert!(VideoFile::open(dir.path().join("missing.mp4")).await.is_err());
    }
}
