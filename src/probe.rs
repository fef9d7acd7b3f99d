// src/probe.rs
//! Local media inspection through FFprobe

use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("3gp", "video/3gpp"),
];

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to execute FFprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("FFprobe error: {0}")]
    Failed(String),
    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// MIME type for a video path, `None` when the extension is not a known video format
pub fn video_mime_type(path: &Path) -> Option<&'static str> {
    let ext = extension_of(path)?;
    VIDEO_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_supported_video(path: &Path) -> bool {
    video_mime_type(path).is_some()
}

/// Run ffprobe with the given arguments and return its stdout
pub async fn execute_ffprobe_command(args: &[&str]) -> Result<String, ProbeError> {
    let output = Command::new("ffprobe").args(args).output().await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::Failed(stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Container duration in seconds as reported by ffprobe
pub async fn probe_duration(path: &Path) -> Result<f64, ProbeError> {
    let path_str = path.to_string_lossy();
    let args = [
        "-v",
        "quiet",
        "-print_format",
        "json",
        "-show_format",
        path_str.as_ref(),
    ];
    let output = execute_ffprobe_command(&args).await?;
    let duration = parse_format_duration(&output)?;

    tracing::debug!("Probed {}: {:.3}s", path.display(), duration);
    Ok(duration)
}

fn parse_format_duration(ffprobe_output: &str) -> Result<f64, ProbeError> {
    let json: Value = serde_json::from_str(ffprobe_output)
        .map_err(|e| ProbeError::Parse(e.to_string()))?;

    let raw = &json["format"]["duration"];
    let duration = match raw {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    match duration {
        Some(d) if d.is_finite() && d > 0.0 => Ok(d),
        _ => Err(ProbeError::Parse(format!("no usable duration in format section: {}", raw))),
    }
}
