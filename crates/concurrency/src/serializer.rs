//! Write serializer
//!
//! Totally orders one process's asynchronous store writes. Each enqueued job
//! is a future that runs only after every job enqueued before it has finished,
//! so writes complete in enqueue order whatever their individual latency.
//!
//! ## Design
//!
//! An explicit task queue: jobs go into an unbounded channel and a single
//! worker task awaits them one at a time. Enqueueing never blocks and never
//! fails at the call site.
//!
//! A job's error is not returned to whoever enqueued it. The worker keeps the
//! first failure and hands it to the next [`WriteSerializer::drain`], which
//! also waits for every job enqueued before it. A reported failure is cleared,
//! so a later drain starts clean.

use leaselog_core::{Error, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A queued unit of work
pub type WriteJob = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

enum Command {
    Run(WriteJob),
    Drain(oneshot::Sender<Option<Error>>),
}

/// In-process FIFO of asynchronous writes
#[derive(Debug)]
pub struct WriteSerializer {
    tx: mpsc::UnboundedSender<Command>,
    pending: Arc<AtomicUsize>,
    label: String,
}

impl WriteSerializer {
    /// Start a serializer whose worker runs on the current tokio runtime
    ///
    /// # Errors
    /// `Runtime` if called outside a tokio runtime.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::Runtime(format!("write serializer needs a tokio runtime: {}", e))
        })?;
        let label = label.into();
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        handle.spawn(run_queue(label.clone(), rx, pending.clone()));
        Ok(WriteSerializer { tx, pending, label })
    }

    /// Append a job to the queue
    pub fn enqueue<F>(&self, job: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Command::Run(Box::pin(job))).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(queue = %self.label, "write queue worker stopped, write dropped");
        }
    }

    /// Wait for every job enqueued so far
    ///
    /// Returns the first failure captured since the previous drain.
    pub async fn drain(&self) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(Command::Drain(reply))
            .map_err(|_| Error::Runtime(format!("write queue '{}' stopped", self.label)))?;
        match outcome.await {
            Ok(None) => Ok(()),
            Ok(Some(err)) => Err(err),
            Err(_) => Err(Error::Runtime(format!(
                "write queue '{}' stopped while draining",
                self.label
            ))),
        }
    }

    /// Jobs enqueued but not yet finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

async fn run_queue(
    label: String,
    mut rx: mpsc::UnboundedReceiver<Command>,
    pending: Arc<AtomicUsize>,
) {
    let mut first_error: Option<Error> = None;
    while let Some(command) = rx.recv().await {
        match command {
            Command::Run(job) => {
                if let Err(e) = job.await {
                    warn!(queue = %label, error = %e, "queued write failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            Command::Drain(reply) => {
                // Receiver gone means the drainer was cancelled; keep the error
                if let Err(unsent) = reply.send(first_error.take()) {
                    first_error = unsent;
                }
            }
        }
    }
    debug!(queue = %label, "write queue closed");
}
