// Download progress state and its transitions

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use super::models::DEFAULT_SIZE_ESTIMATE;
use super::traits::ProgressEmitter;

/// Progress value meaning "working, but no percentage available"
pub const INDETERMINATE: i32 = -1;

/// Highest value reported while bytes are still arriving
const IN_FLIGHT_CEILING: i32 = 99;

/// State shared with the UI layer.
///
/// `progress_percent` is 0 when idle, 1 right after a transfer starts,
/// at most 99 while bytes arrive and 100 once the stream is drained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadState {
    pub progress_percent: i32,
    pub error_message: Option<String>,
}

impl DownloadState {
    /// A download is running; new downloads must not start
    pub fn is_active(&self) -> bool {
        self.progress_percent > 0
    }

    pub fn is_indeterminate(&self) -> bool {
        self.progress_percent == INDETERMINATE
    }
}

/// Percentage of `estimate` covered by `received`, capped below 100
pub fn estimate_percent(received: u64, estimate: u64) -> i32 {
    let estimate = if estimate == 0 {
        DEFAULT_SIZE_ESTIMATE
    } else {
        estimate
    };
    let percent = (received as f64 / estimate as f64 * 100.0).round();
    percent.min(IN_FLIGHT_CEILING as f64) as i32
}

/// Owner of the [`DownloadState`].
///
/// Readers subscribe to a watch channel; emitters see every transition.
pub struct ProgressTracker {
    tx: watch::Sender<DownloadState>,
    emitters: Vec<Arc<dyn ProgressEmitter>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DownloadState::default());
        Self {
            tx,
            emitters: Vec::new(),
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn ProgressEmitter>) -> Self {
        self.emitters.push(emitter);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> DownloadState {
        self.tx.borrow().clone()
    }

    pub fn progress(&self) -> i32 {
        self.tx.borrow().progress_percent
    }

    /// Marks the transfer as started. Dropping the guard resets progress to 0.
    pub fn begin(&self) -> ProgressGuard<'_> {
        self.transition(|state| {
            state.progress_percent = 1;
            state.error_message = None;
            true
        });
        ProgressGuard { tracker: self }
    }

    /// Raises the in-flight value; lower values are ignored
    pub fn advance(&self, percent: i32) {
        let percent = percent.min(IN_FLIGHT_CEILING);
        self.transition(|state| {
            if percent > state.progress_percent {
                state.progress_percent = percent;
                true
            } else {
                false
            }
        });
    }

    pub fn complete(&self) {
        self.transition(|state| {
            let changed = state.progress_percent != 100;
            state.progress_percent = 100;
            changed
        });
    }

    pub fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.transition(|state| {
            state.progress_percent = 0;
            state.error_message = Some(message);
            true
        });
    }

    pub fn reset(&self) {
        self.transition(|state| {
            let changed = state.progress_percent != 0;
            state.progress_percent = 0;
            changed
        });
    }

    fn transition(&self, modify: impl FnOnce(&mut DownloadState) -> bool) {
        if !self.tx.send_if_modified(modify) {
            return;
        }
        if self.emitters.is_empty() {
            return;
        }
        let snapshot = self.current();
        for emitter in &self.emitters {
            emitter.emit(&snapshot);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the tracker to idle on every exit path
pub struct ProgressGuard<'a> {
    tracker: &'a ProgressTracker,
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.tracker.reset();
    }
}

/// Text progress bar, e.g. `[#####.....]  50%`
pub fn render_progress_bar(value: i32, width: usize) -> String {
    if value == INDETERMINATE {
        return format!("[{}]  ...", "~".repeat(width));
    }
    let percent = value.clamp(0, 100) as usize;
    let filled = width * percent / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}
