// src/session/poller.rs
//! Fixed-interval job status polling.
//!
//! One loop per job. The loop owns a cancellation token and the generation it
//! was started for; every response is handed back to the session together
//! with that generation, and the session decides whether it still applies.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{AnalysisSession, Inner};
use crate::api_client::AnalysisApi;

/// What the loop should do after a response has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    Continue,
    Stop,
}

pub(crate) struct PollHandle {
    job_id: String,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn job_id(&self) -> &str {
        &self.job_id
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }

    /// Stop ticking. A request already in flight is left to finish and its
    /// result is discarded by the generation check.
    pub(crate) fn cancel(self) {
        self.token.cancel();
        tracing::debug!("Cancelled status polling for job {}", self.job_id);
    }
}

pub(crate) fn spawn(
    session: Weak<Inner>,
    api: Arc<dyn AnalysisApi>,
    job_id: String,
    generation: u64,
    period: Duration,
) -> PollHandle {
    let token = CancellationToken::new();
    let task = tokio::spawn(run(session, api, job_id.clone(), generation, period, token.clone()));

    tracing::info!("Polling job {} every {:?}", job_id, period);
    PollHandle { job_id, token, task }
}

async fn run(
    session: Weak<Inner>,
    api: Arc<dyn AnalysisApi>,
    job_id: String,
    generation: u64,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tick += 1;

        let status = match api.job_status(&job_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Polling error for job {} (tick {}): {}", job_id, tick, e);
                continue;
            }
        };

        tracing::debug!(
            "📊 Job {} tick {}: {:?} {:.0}% ({})",
            job_id,
            tick,
            status.status,
            status.progress,
            status.current_phase
        );

        let Some(inner) = session.upgrade() else {
            break;
        };
        let outcome = AnalysisSession::from_inner(inner)
            .apply_status(generation, status)
            .await;
        if outcome == PollOutcome::Stop {
            break;
        }
    }

    tracing::debug!("Status polling loop for job {} finished after {} ticks", job_id, tick);
}
