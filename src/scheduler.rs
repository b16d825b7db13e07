//! Execution contexts for loads and reloads.
//!
//! The loader never spawns threads of its own. Every load runs as a [`Job`] on
//! an injected [`Scheduler`]:
//!
//! - [`Inline`] runs the job on the calling thread (useful in tests)
//! - [`WorkerThread`] runs jobs in order on one dedicated thread
//! - [`TokioBlocking`] hands jobs to tokio's blocking pool
//!
//! Reload serialization is enforced by the engine itself, so any of these is
//! safe to use, including schedulers that run jobs concurrently.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs somewhere.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, job: Job);
}

impl<S: Scheduler + ?Sized> Scheduler for std::sync::Arc<S> {
    fn schedule(&self, job: Job) {
        (**self).schedule(job)
    }
}

/// Runs each job immediately on the caller's thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl Scheduler for Inline {
    fn schedule(&self, job: Job) {
        job();
    }
}

/// A single dedicated worker thread draining a FIFO job queue.
pub struct WorkerThread {
    sender: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawn the worker.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })?;
        crate::debug_event!("scheduler", "worker started", "{name}");
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

impl Scheduler for WorkerThread {
    fn schedule(&self, job: Job) {
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                tracing::warn!("[scheduler] worker is gone, job dropped");
            }
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop once queued jobs ran.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            // The last reference may be dropped by a job on the worker itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Runs jobs on tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct TokioBlocking {
    runtime: tokio::runtime::Handle,
}

impl TokioBlocking {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Bind to the runtime the caller is running in.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioBlocking {
    fn schedule(&self, job: Job) {
        drop(self.runtime.spawn_blocking(job));
    }
}
