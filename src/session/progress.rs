// src/session/progress.rs
//! Display heuristics for a running job: phase steps, segmented bar, log stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STEP_TITLES: [&str; 5] = ["Initialize", "Tracking", "Physics", "Actions", "Report"];
pub const PROGRESS_SEGMENTS: usize = 20;

/// Ordered phase keywords; the first matching row wins
const PHASE_KEYWORDS: &[(&[&str], usize)] = &[
    (&["loading", "initializ"], 0),
    (&["track"], 1),
    (&["interpol", "smooth"], 2),
    (&["render"], 3),
    (&["encod", "complete"], 4),
];

/// Map the server's free-text phase label onto one of the five display steps
pub fn step_from_phase(phase: &str) -> usize {
    let phase = phase.to_lowercase();
    PHASE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| phase.contains(k)))
        .map(|(_, step)| *step)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    Done,
    Active,
    Pending,
}

pub fn step_states(current_step: usize, progress: f64) -> [StepState; 5] {
    let mut states = [StepState::Pending; 5];
    for (id, state) in states.iter_mut().enumerate() {
        *state = if id < current_step || progress >= 100.0 {
            StepState::Done
        } else if id == current_step {
            StepState::Active
        } else {
            StepState::Pending
        };
    }
    states
}

/// Number of lit segments in the 20-segment progress bar
pub fn filled_segments(progress: f64) -> usize {
    (0..PROGRESS_SEGMENTS)
        .filter(|i| (*i as f64 / PROGRESS_SEGMENTS as f64) * 100.0 < progress)
        .count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Append-only job log. A message is dropped only when it repeats the previous one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingLog {
    entries: Vec<LogEntry>,
    last_message: String,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: &str) -> Option<&LogEntry> {
        if message.is_empty() || message == self.last_message {
            return None;
        }

        self.last_message = message.to_string();
        self.entries.push(LogEntry {
            id: self.entries.len() as u64,
            timestamp: Utc::now(),
            message: message.to_string(),
        });
        self.entries.last()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
