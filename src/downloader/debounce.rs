// Cancellable timers and debouncing

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a scheduled action. Cancelling also stops an action that has
/// already started but not finished.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Run `action` after `delay` on the current tokio runtime
pub fn schedule<F>(delay: Duration, action: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        action.await;
    });
    TimerHandle { task }
}

/// Runs only the most recent action, once input has been quiet for `quiet`
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Replace whatever is pending with `action`
    pub fn call<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(schedule(self.quiet, action));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
