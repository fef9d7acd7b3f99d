// src/session/mod.rs
//! Analysis session controller.
//!
//! Drives one analysis attempt: upload the file, start the job over the trim
//! range, poll the job until it completes or fails, and publish state changes,
//! progress and alerts to subscribers.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

pub mod poller;
pub mod progress;

use crate::api_client::{AnalysisApi, ApiError};
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::trim::CommittedRange;
use crate::types::{JobState, JobStatus, VideoFile, VideoMeta};
use poller::{PollHandle, PollOutcome};
use progress::{step_from_phase, LogEntry, ProcessingLog};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("An analysis is already in progress")]
    Busy,
    #[error("Upload failed: {0}")]
    Upload(#[source] ApiError),
    #[error("Analysis failed to start: {0}")]
    AnalysisStart(#[source] ApiError),
    #[error("Submission was cancelled by a reset")]
    Cancelled,
}

/// Client-side phase, with exactly the data each phase needs
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Idle,
    Processing {
        video: VideoMeta,
        job: Option<JobStatus>,
        log: ProcessingLog,
    },
    Complete {
        video: VideoMeta,
        output_file: Option<String>,
    },
}

impl AppState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            AppState::Idle => SessionPhase::Idle,
            AppState::Processing { .. } => SessionPhase::Processing,
            AppState::Complete { .. } => SessionPhase::Complete,
        }
    }

    pub fn video(&self) -> Option<&VideoMeta> {
        match self {
            AppState::Idle => None,
            AppState::Processing { video, .. } | AppState::Complete { video, .. } => Some(video),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Processing,
    Complete,
}

/// Notifications for whatever front-end is attached to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged(SessionPhase),
    Progress {
        progress: f64,
        phase: String,
        step: usize,
    },
    Log(LogEntry),
    /// User-facing, blocking message
    Alert(String),
}

struct Shared {
    generation: u64,
    state: AppState,
}

pub(crate) struct Inner {
    api: Arc<dyn AnalysisApi>,
    poll_interval: Duration,
    shared: RwLock<Shared>,
    poller: Mutex<Option<PollHandle>>,
    subscribers: RwLock<Vec<mpsc::UnboundedSender<SessionEvent>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.cancel();
        }
    }
}

#[derive(Clone)]
pub struct AnalysisSession {
    inner: Arc<Inner>,
}

impl AnalysisSession {
    pub fn new(api: Arc<dyn AnalysisApi>) -> Self {
        Self::with_poll_interval(api, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }

    /// A zero interval falls back to the default one.
    pub fn with_poll_interval(api: Arc<dyn AnalysisApi>, poll_interval: Duration) -> Self {
        let poll_interval = if poll_interval.is_zero() {
            tracing::warn!(
                "Poll interval must be greater than zero, using {} ms",
                DEFAULT_POLL_INTERVAL_MS
            );
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
        } else {
            poll_interval
        };

        Self {
            inner: Arc::new(Inner {
                api,
                poll_interval,
                shared: RwLock::new(Shared {
                    generation: 0,
                    state: AppState::Idle,
                }),
                poller: Mutex::new(None),
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Receive every event published from now on
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.write().await.push(tx);
        rx
    }

    pub async fn state(&self) -> AppState {
        self.inner.shared.read().await.state.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.shared.read().await.state.phase()
    }

    pub async fn video_meta(&self) -> Option<VideoMeta> {
        self.inner.shared.read().await.state.video().cloned()
    }

    /// Latest status of the running job, if any has been received
    pub async fn job_status(&self) -> Option<JobStatus> {
        match &self.inner.shared.read().await.state {
            AppState::Processing { job, .. } => job.clone(),
            _ => None,
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .await
            .as_ref()
            .map(PollHandle::is_active)
            .unwrap_or(false)
    }

    /// Upload `file`, start analysis over `range` and begin polling the job.
    ///
    /// On failure the session is back in `Idle` and an alert has been published.
    pub async fn submit(
        &self,
        file: VideoFile,
        range: CommittedRange,
        duration_seconds: f64,
    ) -> Result<(), SessionError> {
        let attempt = Uuid::new_v4();
        let generation = {
            let mut shared = self.inner.shared.write().await;
            if shared.state != AppState::Idle {
                return Err(SessionError::Busy);
            }
            shared.generation += 1;
            shared.state = AppState::Processing {
                video: VideoMeta::new(&file, &range, duration_seconds),
                job: None,
                log: ProcessingLog::new(),
            };
            shared.generation
        };

        tracing::info!(
            attempt = %attempt,
            file = %file.name,
            start = %range.start,
            end = %range.end,
            "🎾 Submitting video for analysis"
        );
        self.emit(SessionEvent::StateChanged(SessionPhase::Processing)).await;

        let upload = match self.inner.api.upload(&file).await {
            Ok(upload) => upload,
            Err(e) => return Err(self.abort_start(generation, SessionError::Upload(e)).await),
        };

        if !self.is_current(generation).await {
            tracing::info!(attempt = %attempt, "Submission abandoned after upload");
            return Err(SessionError::Cancelled);
        }

        let analysis = match self
            .inner
            .api
            .start_analysis(&upload.file_id, &range.start, &range.end)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => return Err(self.abort_start(generation, SessionError::AnalysisStart(e)).await),
        };

        let mut shared = self.inner.shared.write().await;
        if shared.generation != generation {
            tracing::info!(attempt = %attempt, "Submission abandoned after analysis start");
            return Err(SessionError::Cancelled);
        }
        if let AppState::Processing { video, .. } = &mut shared.state {
            video.file_id = Some(upload.file_id.clone());
            video.job_id = Some(analysis.job_id.clone());
        }

        let handle = poller::spawn(
            Arc::downgrade(&self.inner),
            self.inner.api.clone(),
            analysis.job_id.clone(),
            generation,
            self.inner.poll_interval,
        );
        if let Some(previous) = self.inner.poller.lock().await.replace(handle) {
            tracing::debug!("Replacing poll loop for job {}", previous.job_id());
            previous.cancel();
        }
        drop(shared);

        tracing::info!(
            attempt = %attempt,
            file_id = %upload.file_id,
            job_id = %analysis.job_id,
            "Analysis job started"
        );
        Ok(())
    }

    /// Cancel polling and drop everything about the current attempt. Safe from any state.
    pub async fn reset(&self) {
        let (previous, handle) = {
            let mut shared = self.inner.shared.write().await;
            shared.generation += 1;
            let previous = std::mem::replace(&mut shared.state, AppState::Idle).phase();
            let handle = self.inner.poller.lock().await.take();
            (previous, handle)
        };

        if let Some(handle) = handle {
            handle.cancel();
        }

        tracing::info!("Session reset (was {:?})", previous);
        if previous != SessionPhase::Idle {
            self.emit(SessionEvent::StateChanged(SessionPhase::Idle)).await;
        }
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.shared.read().await.generation == generation
    }

    /// Return to Idle after a failed upload/analyze and alert the user
    async fn abort_start(&self, generation: u64, error: SessionError) -> SessionError {
        {
            let mut shared = self.inner.shared.write().await;
            if shared.generation != generation {
                tracing::info!("Ignoring failure of an abandoned submission: {}", error);
                return SessionError::Cancelled;
            }
            shared.state = AppState::Idle;
        }

        tracing::error!("❌ {}", error);
        self.emit(SessionEvent::StateChanged(SessionPhase::Idle)).await;
        self.emit(SessionEvent::Alert(format!("Error starting analysis: {}", error)))
            .await;
        error
    }

    /// Apply one poll response. Responses from an older generation are dropped.
    async fn apply_status(&self, generation: u64, status: JobStatus) -> PollOutcome {
        let mut events = Vec::new();
        let outcome = {
            let mut shared = self.inner.shared.write().await;
            if shared.generation != generation {
                tracing::debug!("Discarding stale status for job {}", status.job_id);
                return PollOutcome::Stop;
            }

            let AppState::Processing { job, log, .. } = &mut shared.state else {
                return PollOutcome::Stop;
            };

            events.push(SessionEvent::Progress {
                progress: status.progress,
                phase: status.current_phase.clone(),
                step: step_from_phase(&status.current_phase),
            });
            if let Some(entry) = log.push(&status.message) {
                events.push(SessionEvent::Log(entry.clone()));
            }
            *job = Some(status.clone());

            match status.status {
                JobState::Pending | JobState::Processing => PollOutcome::Continue,
                JobState::Completed => {
                    let previous = std::mem::replace(&mut shared.state, AppState::Idle);
                    if let AppState::Processing { video, .. } = previous {
                        shared.state = AppState::Complete {
                            video,
                            output_file: status.output_file.clone(),
                        };
                    }
                    self.stop_poller().await;
                    tracing::info!("✅ Job {} completed", status.job_id);
                    events.push(SessionEvent::StateChanged(SessionPhase::Complete));
                    PollOutcome::Stop
                }
                JobState::Failed => {
                    shared.state = AppState::Idle;
                    self.stop_poller().await;
                    let reason = status.error.as_deref().unwrap_or("unknown error");
                    tracing::error!("❌ Job {} failed: {}", status.job_id, reason);
                    events.push(SessionEvent::StateChanged(SessionPhase::Idle));
                    events.push(SessionEvent::Alert(format!("Analysis failed: {}", reason)));
                    PollOutcome::Stop
                }
            }
        };

        for event in events {
            self.emit(event).await;
        }
        outcome
    }

    async fn stop_poller(&self) {
        if let Some(handle) = self.inner.poller.lock().await.take() {
            handle.cancel();
        }
    }

    async fn emit(&self, event: SessionEvent) {
        let mut subscribers = self.inner.subscribers.write().await;
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
