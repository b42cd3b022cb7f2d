//! Coordinator-side phase scheduling.
//!
//! One scheduling loop per phase hands every task of that phase to some
//! worker, retries tasks whose invocation failed, and returns once every
//! task index has been completed successfully by someone. Each dispatch runs
//! as its own tokio task that reports back over a completion channel, so the
//! loop never blocks on a single worker's round trip; its only
//! synchronization duty is draining that channel and the worker feed.

use crate::{Job, Phase};
use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A task assignment handed to one worker.
#[derive(Clone, Debug)]
pub struct TaskAssignment {
    pub job_name: String,
    /// Input file for map tasks; empty for reduce tasks.
    pub input: String,
    pub phase: Phase,
    /// 0-based, unique within the phase.
    pub task_index: usize,
    /// Number of reduce partitions for map tasks, number of map tasks for
    /// reduce tasks.
    pub num_other: usize,
    /// Name of the registered workload to run.
    pub workload: String,
}

/// Remote invocation of one task on one worker.
///
/// Implementations own connection management, serialization, and timeout
/// detection; the scheduler consumes nothing but the success verdict. An
/// unresponsive worker must eventually be reported as a failure rather than
/// blocking forever.
#[tonic::async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn invoke(&self, worker: &str, task: TaskAssignment) -> bool;
}

/// Feed of workers available for task assignment.
///
/// The registration service pushes newly announced worker addresses in; the
/// scheduler receives them, and returns each worker to the feed after a
/// successful task so it can take another. A worker whose invocation failed
/// is never pushed back. The pool outlives any one phase, so workers that
/// finish the map phase are still around for the reduce phase.
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl WorkerPool {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Sender half of the feed, for announcing new workers.
    pub fn registration(&self) -> mpsc::UnboundedSender<String> {
        self.tx.clone()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

/// What a finished dispatch reports back to the scheduling loop.
struct TaskDone {
    task_index: usize,
    worker: String,
    success: bool,
}

/// Assigns every task of one phase to workers and waits for full completion.
pub struct PhaseScheduler<R: TaskRunner> {
    runner: Arc<R>,
    /// Maximum attempts per task; `None` retries without bound.
    retry_limit: Option<u32>,
}

impl<R: TaskRunner> PhaseScheduler<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            retry_limit: None,
        }
    }

    /// Caps the number of attempts per task. Unlimited by default.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.retry_limit = Some(limit);
        self
    }

    /// Runs every task of `phase`, returning only once each of them has
    /// completed successfully at least once.
    ///
    /// Workers are drawn from `pool` in no particular order; any idle worker
    /// may take any pending task, and one worker may complete several tasks
    /// over the phase. A failed invocation puts the task back in the pending
    /// set and abandons the worker for good.
    pub async fn run_phase(&self, job: &Job, phase: Phase, pool: &mut WorkerPool) -> Result<()> {
        let (ntasks, num_other) = match phase {
            Phase::Map => (job.files.len(), job.n_reduce),
            Phase::Reduce => (job.n_reduce, job.files.len()),
        };
        info!(%phase, ntasks, num_other, "scheduling phase");

        let WorkerPool { tx, rx } = pool;
        let mut pending: VecDeque<usize> = (0..ntasks).collect();
        let mut attempts = vec![0u32; ntasks];
        let mut idle: Vec<String> = Vec::new();
        let mut completed = 0usize;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<TaskDone>();

        while completed < ntasks {
            // Pair up parked workers with pending tasks; each dispatch runs
            // independently and reports back through `done_tx`.
            while let Some(worker) = idle.pop() {
                let Some(task_index) = pending.pop_front() else {
                    idle.push(worker);
                    break;
                };
                attempts[task_index] += 1;
                let task = TaskAssignment {
                    job_name: job.name.clone(),
                    input: match phase {
                        Phase::Map => job.files[task_index].clone(),
                        Phase::Reduce => String::new(),
                    },
                    phase,
                    task_index,
                    num_other,
                    workload: job.workload.clone(),
                };
                let runner = Arc::clone(&self.runner);
                let done = done_tx.clone();
                debug!(task_index, %worker, "dispatching task");
                tokio::spawn(async move {
                    let success = runner.invoke(&worker, task).await;
                    // The receiver only goes away once the phase is over.
                    let _ = done.send(TaskDone {
                        task_index,
                        worker,
                        success,
                    });
                });
            }

            tokio::select! {
                Some(worker) = rx.recv() => {
                    debug!(%worker, "worker available");
                    idle.push(worker);
                }
                Some(event) = done_rx.recv() => {
                    if event.success {
                        completed += 1;
                        // Back into the feed alongside newly registering
                        // workers, ready for another task.
                        let _ = tx.send(event.worker);
                    } else {
                        warn!(
                            task_index = event.task_index,
                            worker = %event.worker,
                            "invocation failed, requeueing task"
                        );
                        if let Some(limit) = self.retry_limit {
                            if attempts[event.task_index] >= limit {
                                bail!(
                                    "task {} of {phase} phase failed {limit} times",
                                    event.task_index
                                );
                            }
                        }
                        pending.push_back(event.task_index);
                    }
                }
            }
        }

        // Workers parked with nothing left to do carry over to the next phase.
        for worker in idle {
            let _ = tx.send(worker);
        }
        info!(%phase, "phase done");
        Ok(())
    }
}
