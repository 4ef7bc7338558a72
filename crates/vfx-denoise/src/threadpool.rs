//! Worker pool for provider switches.
//!
//! Thin layer over a rayon pool that adds per-task handles: a queued task
//! can be cancelled with [`ThreadPool::pop`], a running one always runs to
//! completion, and callers can wait for a task to settle.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tracing::error;

use crate::{DenoiseError, DenoiseResult};

/// Lifecycle of a pooled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Finished,
    Cancelled,
}

impl TaskState {
    /// Finished or cancelled.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

struct TaskSlot {
    state: Mutex<TaskState>,
    settled: Condvar,
}

impl TaskSlot {
    fn set(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
        if state.is_settled() {
            self.settled.notify_all();
        }
    }
}

/// Handle to a task pushed onto a [`ThreadPool`].
#[derive(Clone)]
pub struct TaskHandle {
    slot: Arc<TaskSlot>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            slot: Arc::new(TaskSlot {
                state: Mutex::new(TaskState::Queued),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> TaskState {
        *self.slot.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// Block until the task settles or `timeout` elapses. Returns `true` if settled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .slot
            .settled
            .wait_timeout_while(guard, timeout, |state| !state.is_settled())
            .unwrap_or_else(PoisonError::into_inner);
        guard.is_settled()
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").field("state", &self.state()).finish()
    }
}

/// Marks the task finished even if its body panics.
struct FinishOnDrop(Arc<TaskSlot>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.set(TaskState::Finished);
    }
}

/// Pool of worker threads.
pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    pub fn new(threads: usize) -> DenoiseResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("vfx-denoise-worker-{i}"))
            .build()
            .map_err(|e| DenoiseError::ThreadPool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queue `task`.
    pub fn push<F>(&self, task: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = TaskHandle::new();
        let slot = Arc::clone(&handle.slot);

        self.pool.spawn(move || {
            {
                let mut state = slot.state.lock().unwrap_or_else(PoisonError::into_inner);
                if *state != TaskState::Queued {
                    return;
                }
                *state = TaskState::Running;
            }

            let _finish = FinishOnDrop(Arc::clone(&slot));
            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("worker task panicked");
            }
        });

        handle
    }

    /// Cancel a task that has not started. Returns `false` if it is running or done.
    pub fn pop(&self, handle: &TaskHandle) -> bool {
        let mut state = handle.slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != TaskState::Queued {
            return false;
        }
        *state = TaskState::Cancelled;
        handle.slot.settled.notify_all();
        true
    }
}
