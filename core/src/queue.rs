//! Single-worker task queue.
//!
//! All work submitted to a [`SerialQueue`] runs on one dedicated thread, one job at a time, in
//! submission order. The worker owns the state it operates on, so jobs get `&mut S` and need no
//! further locking.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::QueueClosed;

type Job<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

pub struct SerialQueue<S> {
    sender: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for SerialQueue<S> {
    fn clone(&self) -> Self { Self { sender: self.sender.clone() } }
}

impl<S: Send + 'static> SerialQueue<S> {
    /// Spawn the worker thread. It exits once every handle to the queue has been dropped.
    pub fn spawn(name: impl Into<String>, mut state: S) -> std::io::Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job<S>>();
        let name = name.into();
        thread::Builder::new().name(name.clone()).spawn(move || {
            debug!("{} worker started", name);
            while let Some(job) = receiver.blocking_recv() {
                job(&mut state);
            }
            debug!("{} worker stopped", name);
        })?;
        Ok(Self { sender })
    }

    /// Queue `f` and wait for its result.
    ///
    /// If `f` panics, the panic is resumed here in the caller once the job has finished; the
    /// worker itself keeps serving later jobs.
    pub async fn run<T, F>(&self, f: F) -> Result<T, QueueClosed>
    where
        F: FnOnce(&mut S) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job<S> = Box::new(move |state: &mut S| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(state)));
            let _ = tx.send(outcome);
        });
        self.sender.send(job).map_err(|_| QueueClosed)?;
        match rx.await.map_err(|_| QueueClosed)? {
            Ok(value) => Ok(value),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
