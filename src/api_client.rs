// src/api_client.rs
// TennisLens analysis API client
// Supports: video upload, analysis start, job status

use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::{multipart, Body, Client, Response};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::ReaderStream;

use crate::config::ClientConfig;
use crate::probe::video_mime_type;
use crate::types::{AnalyzeResponse, JobStatus, UploadResponse, VideoFile};

/// A status request may take this many poll intervals before it is abandoned
const STATUS_TIMEOUT_POLL_INTERVALS: u32 = 5;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Server rejected the request: {0}")]
    Rejected(String),
    #[error("Failed to read video file: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Connection problems, timeouts and 429/5xx gateway-style statuses
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(e) => e.is_connect() || e.is_timeout(),
            ApiError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }
}

/// The three endpoints the analysis session talks to
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// POST /api/upload (multipart field `file`)
    async fn upload(&self, file: &VideoFile) -> Result<UploadResponse, ApiError>;

    /// POST /api/analyze (multipart fields `file_id`, `start_time`, `end_time`)
    async fn start_analysis(
        &self,
        file_id: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<AnalyzeResponse, ApiError>;

    /// GET /api/job/{job_id}
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError>;
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
    retry_max_elapsed: Option<Duration>,
    status_timeout: Duration,
}

impl HttpAnalysisClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            retry_max_elapsed: config.retry_max_elapsed,
            status_timeout: config
                .poll_interval
                .saturating_mul(STATUS_TIMEOUT_POLL_INTERVALS)
                .min(config.request_timeout),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request timeout of the status GET
    pub fn status_timeout(&self) -> Duration {
        self.status_timeout
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Run `operation` once, or under exponential backoff when a retry budget is configured
    async fn send_with_retry<T, F, Fut>(&self, what: &'static str, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let Some(budget) = self.retry_max_elapsed else {
            return operation().await;
        };

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_elapsed_time: Some(budget),
            ..Default::default()
        };

        retry(policy, || {
            let attempt = operation();
            async move {
                attempt.await.map_err(|e| {
                    if e.is_transient() {
                        tracing::warn!("{} failed (retrying): {}", what, e);
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn upload(&self, file: &VideoFile) -> Result<UploadResponse, ApiError> {
        let url = format!("{}/api/upload", self.base_url);
        let mime = video_mime_type(&file.path).unwrap_or("application/octet-stream");

        tracing::info!("Uploading {} ({} bytes) to {}", file.name, file.size_bytes, url);

        let upload: UploadResponse = self
            .send_with_retry("upload", || {
                let url = url.as_str();
                async move {
                    // reopened per attempt so a retry streams from the first byte
                    let video = tokio::fs::File::open(&file.path).await?;
                    let size = video.metadata().await?.len();
                    let body = Body::wrap_stream(ReaderStream::new(video));
                    let part = multipart::Part::stream_with_length(body, size)
                        .file_name(file.name.clone())
                        .mime_str(mime)?;

                    let response = self
                        .client
                        .post(url)
                        .multipart(multipart::Form::new().part("file", part))
                        .send()
                        .await?;
                    Self::read_json(response).await
                }
            })
            .await?;

        if !upload.success {
            return Err(ApiError::Rejected(format!("upload of {} was not accepted", file.name)));
        }

        tracing::info!("Upload complete: file_id={}", upload.file_id);
        Ok(upload)
    }

    async fn start_analysis(
        &self,
        file_id: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<AnalyzeResponse, ApiError> {
        let url = format!("{}/api/analyze", self.base_url);

        tracing::info!("Starting analysis of {} from {} to {}", file_id, start_time, end_time);

        let analysis: AnalyzeResponse = self
            .send_with_retry("analyze", || {
                let form = multipart::Form::new()
                    .text("file_id", file_id.to_string())
                    .text("start_time", start_time.to_string())
                    .text("end_time", end_time.to_string());
                let request = self.client.post(&url).multipart(form);
                async move { Self::read_json(request.send().await?).await }
            })
            .await?;

        tracing::info!("Analysis job created: job_id={}", analysis.job_id);
        Ok(analysis)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let url = format!("{}/api/job/{}", self.base_url, urlencoding::encode(job_id));
        let response = self.client.get(&url).timeout(self.status_timeout).send().await?;
        Self::read_json(response).await
    }
}
