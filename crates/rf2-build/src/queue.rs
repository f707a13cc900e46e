//! Background build workers.
//!
//! Builds are submitted to a bounded set of worker threads. Each submission
//! returns a [`BuildHandle`] carrying its own cancel flag and the channel the
//! outcome arrives on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, RecvError, Sender, unbounded};
use tracing::{debug, warn};

use crate::context::BuildContext;
use crate::orchestrator::{BuildOrchestrator, BuildOutcome};

struct Job {
    ctx: BuildContext,
    cancel: Arc<AtomicBool>,
    reply: Sender<BuildOutcome>,
}

/// A submitted build.
pub struct BuildHandle {
    pub build_id: String,
    cancel: Arc<AtomicBool>,
    outcome: Receiver<BuildOutcome>,
}

impl BuildHandle {
    /// Ask the build to stop. Takes effect before the next table.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Block until the build reaches a terminal status.
    pub fn wait(self) -> Result<BuildOutcome, RecvError> {
        self.outcome.recv()
    }

    pub fn try_outcome(&self) -> Option<BuildOutcome> {
        self.outcome.try_recv().ok()
    }
}

pub struct BuildQueue {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl BuildQueue {
    /// Start `workers` threads sharing one orchestrator.
    pub fn new(orchestrator: BuildOrchestrator, workers: usize) -> Result<Self> {
        let orchestrator = Arc::new(orchestrator);
        let (sender, receiver) = unbounded::<Job>();
        let workers = (0..workers.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                let orchestrator = Arc::clone(&orchestrator);
                thread::Builder::new()
                    .name(format!("rf2-build-{index}"))
                    .spawn(move || {
                        for job in receiver {
                            debug!(worker = index, build_id = %job.ctx.build_id, "build picked up");
                            let outcome = orchestrator.run(&job.ctx, &job.cancel);
                            if job.reply.send(outcome).is_err() {
                                warn!(build_id = %job.ctx.build_id, "build outcome dropped, nobody is waiting");
                            }
                        }
                    })
                    .context("spawn build worker")
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn submit(&self, ctx: BuildContext) -> Result<BuildHandle> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| anyhow!("build queue is shut down"))?;
        let (reply, outcome) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let build_id = ctx.build_id.clone();
        sender
            .send(Job {
                ctx,
                cancel: Arc::clone(&cancel),
                reply,
            })
            .map_err(|_| anyhow!("build queue is shut down"))?;
        Ok(BuildHandle {
            build_id,
            cancel,
            outcome,
        })
    }

    /// Stop accepting builds, finish the queued ones and join the workers.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("build worker panicked");
            }
        }
    }
}

impl Drop for BuildQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
