//! FILENAME: core/engine/src/pool.rs
//! PURPOSE: Fixed-size worker pool used to execute a batch of calculations.
//! CONTEXT: Thin wrapper over a dedicated rayon thread pool that hands back a
//! joinable handle per submitted task. A task that panics is contained: its
//! handle reports the panic and the worker thread keeps serving the pool.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};

use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use crate::error::EngineError;

/// Reported by `TaskHandle::join` when the task did not produce a value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("task panicked: {0}")]
pub struct TaskPanicked(pub String);

/// Handle to one submitted task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    outcome: Receiver<std::thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run and returns its value.
    pub fn join(self) -> Result<T, TaskPanicked> {
        match self.outcome.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(TaskPanicked(panic_message(payload.as_ref()))),
            Err(_) => Err(TaskPanicked("task was dropped before it ran".to_string())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub struct WorkerPool {
    pool: ThreadPool,
    size: usize,
}

impl WorkerPool {
    /// Starts `size` worker threads named `<prefix>-<index>`.
    pub fn new(size: usize, thread_name_prefix: &str) -> Result<Self, EngineError> {
        if size == 0 {
            return Err(EngineError::Pool("worker pool needs at least one thread".to_string()));
        }

        let prefix = thread_name_prefix.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| EngineError::Pool(e.to_string()))?;

        Ok(WorkerPool { pool, size })
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues `task` on the pool and returns a handle to await its value.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            // The caller may have stopped waiting
            let _ = tx.send(outcome);
        });
        TaskHandle { outcome: rx }
    }

    /// Waits for every handle, in submission order.
    pub fn await_all<T>(handles: Vec<TaskHandle<T>>) -> Vec<Result<T, TaskPanicked>> {
        handles.into_iter().map(TaskHandle::join).collect()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("size", &self.size).finish()
    }
}
