//! Runs a whole job sequentially in this process, no cluster required.

use anyhow::{bail, Result};
use clap::Parser;
use mapred::standalone::{self, Args};
use mapred::Job;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let files: Vec<String> = glob::glob(&args.input)?
        .flatten()
        .map(|p| p.display().to_string())
        .collect();
    if files.is_empty() {
        bail!("no input files match `{}`", args.input);
    }

    let job = Job {
        name: args.name,
        workload: args.workload,
        files,
        n_reduce: args.n_reduce,
    };
    let merged = standalone::run_job(Path::new(&args.work_dir), &job)?;
    println!("{}", merged.display());
    Ok(())
}
