//! Sequential in-process execution of a whole job.
//!
//! Runs every map task, then every reduce task, then the final merge, with
//! no scheduler or RPC involved. The task-level semantics are exactly those
//! of the distributed engine, since both call into [`crate::executor`].

use crate::executor::{perform_map, perform_reduce};
use crate::{codec, workload, Job};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Runs `job` to completion in this process and returns the path of the
/// merged result file.
pub fn run_job(dir: &Path, job: &Job) -> Result<PathBuf> {
    let engine = workload::named(&job.workload)?;
    for (task_index, input) in job.files.iter().enumerate() {
        perform_map(dir, &job.name, task_index, input, job.n_reduce, engine.map_fn)?;
    }
    for task_index in 0..job.n_reduce {
        perform_reduce(dir, &job.name, task_index, job.files.len(), engine.reduce_fn)?;
    }
    codec::merge_outputs(dir, &job.name, job.n_reduce)
}
