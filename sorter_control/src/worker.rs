//! Cancellable background workers.
//!
//! A state that needs to block (feeder pulse loop, camera capture, drop
//! sequence) runs that work on a named thread and polls for completion from
//! the tick thread. Dropping the handle cancels the worker, so leaving a
//! state cleans up its worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::SorterError;

/// Granularity of cancellable sleeps.
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Cooperative cancellation flag shared with a worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `false` if the token was cancelled before the full duration
    /// elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

/// Handle to one running worker and its single-result completion channel.
pub struct BackgroundTask<T> {
    name: String,
    cancel: CancelToken,
    rx: Receiver<T>,
    finished: bool,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Start `work` on a new thread named `name`.
    ///
    /// # Errors
    /// `SorterError::Spawn` if the OS refuses the thread.
    pub fn spawn<F>(name: &str, work: F) -> Result<Self, SorterError>
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::sync_channel(1);
        let token = cancel.clone();
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = work(&token);
                // Receiver gone means the owning state was left; nothing to do.
                let _ = tx.send(result);
            })
            .map_err(|source| SorterError::Spawn {
                name: name.to_string(),
                source,
            })?;
        debug!("worker '{}' started", name);
        Ok(Self {
            name: name.to_string(),
            cancel,
            rx,
            finished: false,
        })
    }
}

impl<T> BackgroundTask<T> {
    /// Non-blocking check for the worker's result.
    ///
    /// Returns the result exactly once.
    pub fn poll(&mut self) -> Option<T> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                warn!("worker '{}' exited without a result", self.name);
                self.finished = true;
                None
            }
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("worker '{}' cancelled", self.name);
        }
        self.cancel.cancel();
    }
}

/// Start-once slot for a state's worker.
///
/// `ensure_started` may be called every tick; the worker is spawned only
/// the first time (or again after a failed spawn).
pub struct WorkerSlot<T> {
    task: Option<BackgroundTask<T>>,
}

impl<T: Send + 'static> WorkerSlot<T> {
    pub const fn new() -> Self {
        Self { task: None }
    }

    /// Spawn the worker unless it is already running.
    ///
    /// A spawn failure is logged and retried on the next call.
    pub fn ensure_started<F>(&mut self, name: &str, work: F) -> bool
    where
        F: FnOnce(&CancelToken) -> T + Send + 'static,
    {
        if self.task.is_some() {
            return true;
        }
        match BackgroundTask::spawn(name, work) {
            Ok(task) => {
                self.task = Some(task);
                true
            }
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// The worker delivered its result or exited without one.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_some_and(BackgroundTask::is_finished)
    }

    pub fn poll(&mut self) -> Option<T> {
        self.task.as_mut().and_then(BackgroundTask::poll)
    }

    /// Cancel the worker, if any. The slot stays started.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.cancel();
        }
    }
}

impl<T: Send + 'static> Default for WorkerSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
