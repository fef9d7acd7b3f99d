// src/trim.rs
//! Trim range selection over a local video.
//!
//! Keeps the proportional (handle / pixel offset) and textual (`M:SS`)
//! representations of the selected range in sync and hands every committed
//! change to the owner through an observer callback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timecode::{format_time, parse_time};

/// Default upper bound of the initial selection
pub const DEFAULT_SELECTION_SECONDS: f64 = 30.0;
/// Minimum distance between the two handles
pub const MIN_SELECTION_SECONDS: f64 = 1.0;
/// Selections longer than this get a "may take more time" hint
pub const LONG_SELECTION_SECONDS: f64 = 60.0;

#[derive(Error, Debug, PartialEq)]
pub enum TrimError {
    #[error("Video duration must be a positive number of seconds, got {0}")]
    InvalidDuration(f64),
}

/// Formatted range handed to the session controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRange {
    pub start: String,
    pub end: String,
}

impl Default for CommittedRange {
    fn default() -> Self {
        Self {
            start: "0:00".to_string(),
            end: format_time(DEFAULT_SELECTION_SECONDS),
        }
    }
}

/// Which handle a drag gesture moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Start,
    End,
}

type RangeObserver = Box<dyn FnMut(&CommittedRange) + Send>;

pub struct TrimSelector {
    duration: f64,
    start: f64,
    end: f64,
    current: f64,
    playing: bool,
    dragging_start: bool,
    dragging_end: bool,
    observer: Option<RangeObserver>,
}

impl std::fmt::Debug for TrimSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrimSelector")
            .field("duration", &self.duration)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("current", &self.current)
            .field("playing", &self.playing)
            .field("dragging_start", &self.dragging_start)
            .field("dragging_end", &self.dragging_end)
            .finish()
    }
}

impl TrimSelector {
    pub fn new(duration: f64) -> Result<Self, TrimError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TrimError::InvalidDuration(duration));
        }

        Ok(Self {
            duration,
            start: 0.0,
            end: duration.min(DEFAULT_SELECTION_SECONDS),
            current: 0.0,
            playing: false,
            dragging_start: false,
            dragging_end: false,
            observer: None,
        })
    }

    /// Register the owner's callback. The current range is delivered right away.
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&CommittedRange) + Send + 'static,
    {
        self.set_observer(observer);
        self
    }

    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&CommittedRange) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self.notify();
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn current_time(&self) -> f64 {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn dragging(&self) -> Option<Handle> {
        if self.dragging_start {
            Some(Handle::Start)
        } else if self.dragging_end {
            Some(Handle::End)
        } else {
            None
        }
    }

    pub fn committed(&self) -> CommittedRange {
        CommittedRange {
            start: format_time(self.start),
            end: format_time(self.end),
        }
    }

    pub fn selection_duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_long_selection(&self) -> bool {
        self.selection_duration() > LONG_SELECTION_SECONDS
    }

    /// Percentage along the timeline for a point in time
    pub fn position_percent(&self, time: f64) -> f64 {
        time / self.duration * 100.0
    }

    /// Tick labels at 0, 1/4, 1/2, 3/4 and the full duration
    pub fn time_markers(&self) -> [String; 5] {
        let d = self.duration;
        [
            format_time(0.0),
            format_time(d / 4.0),
            format_time(d / 2.0),
            format_time(d * 3.0 / 4.0),
            format_time(d),
        ]
    }

    /// Map a horizontal offset inside a timeline of `width` pixels to a time
    pub fn time_at(&self, offset: f64, width: f64) -> f64 {
        if width.is_nan() || width <= 0.0 || !offset.is_finite() {
            return 0.0;
        }
        let fraction = (offset / width).max(0.0).min(1.0);
        fraction * self.duration
    }

    /// Click on the timeline body: seek playback, kept inside the selection
    pub fn seek_to_position(&mut self, offset: f64, width: f64) {
        let time = self.time_at(offset, width);
        self.current = time.min(self.end).max(self.start);
    }

    pub fn begin_drag(&mut self, handle: Handle) {
        match handle {
            Handle::Start => self.dragging_start = true,
            Handle::End => self.dragging_end = true,
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging_start = false;
        self.dragging_end = false;
    }

    /// Pointer move while a handle is held
    pub fn drag_to(&mut self, offset: f64, width: f64) {
        let time = self.time_at(offset, width);

        if self.dragging_start {
            self.move_start(time);
        }
        if self.dragging_end {
            self.move_end(time);
        }
    }

    /// Move the start handle, clamped to `[0, end - 1]`
    pub fn move_start(&mut self, candidate: f64) {
        // not f64::clamp: the bounds cross on sub-second clips
        let new_start = candidate.min(self.end - MIN_SELECTION_SECONDS).max(0.0);
        if self.current < new_start {
            self.current = new_start;
        }
        self.commit(new_start, self.end);
    }

    /// Move the end handle, clamped to `[start + 1, duration]`
    pub fn move_end(&mut self, candidate: f64) {
        let new_end = candidate.max(self.start + MIN_SELECTION_SECONDS).min(self.duration);
        if self.current > new_end {
            self.current = new_end;
        }
        self.commit(self.start, new_end);
    }

    /// Typed start value. Returns whether it was applied.
    pub fn set_start_text(&mut self, input: &str) -> bool {
        let Some(seconds) = parse_time(input) else {
            return false;
        };
        let value = seconds as f64;

        if value < self.end && value < self.duration && self.end - value >= MIN_SELECTION_SECONDS {
            self.current = value;
            self.commit(value, self.end);
            true
        } else {
            tracing::debug!("Ignoring start time {:?}: outside the valid range", input);
            false
        }
    }

    /// Typed end value. Returns whether it was applied.
    pub fn set_end_text(&mut self, input: &str) -> bool {
        let Some(seconds) = parse_time(input) else {
            return false;
        };
        let value = seconds as f64;

        if value > self.start && value <= self.duration && value - self.start >= MIN_SELECTION_SECONDS {
            self.commit(self.start, value);
            true
        } else {
            tracing::debug!("Ignoring end time {:?}: outside the valid range", input);
            false
        }
    }

    /// Play/pause. Starting outside the selection rewinds to its start.
    pub fn toggle_play(&mut self) {
        if !self.playing && (self.current < self.start || self.current >= self.end) {
            self.current = self.start;
        }
        self.playing = !self.playing;
    }

    /// Playback clock tick. Loops inside the selection while playing.
    pub fn on_time_update(&mut self, time: f64) {
        self.current = time;
        if self.playing && self.current >= self.end {
            self.current = self.start;
        }
    }

    fn commit(&mut self, start: f64, end: f64) {
        if start == self.start && end == self.end {
            return;
        }
        self.start = start;
        self.end = end;
        self.notify();
    }

    fn notify(&mut self) {
        let range = self.committed();
        if let Some(observer) = self.observer.as_mut() {
            observer(&range);
        }
    }
}
