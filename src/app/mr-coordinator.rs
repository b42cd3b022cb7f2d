//! The coordinator: serves worker registrations for the lifetime of one job,
//! drives the map phase and then the reduce phase through the scheduler, and
//! merges the partition outputs into the final result file.

use anyhow::{bail, Result};
use clap::Parser;
use mapred::cmd::coordinator::Args;
use mapred::schedule::{PhaseScheduler, TaskAssignment, TaskRunner, WorkerPool};
use mapred::{codec, workload, Job, Phase};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod mapreduce {
    tonic::include_proto!("mapreduce");
}

use mapreduce::coordinator_server::{Coordinator, CoordinatorServer};
use mapreduce::worker_client::WorkerClient;
use mapreduce::{DoTaskArgs, WorkerRegistration, WorkerResponse};

/// Feeds registering workers into the scheduler's pool.
struct CoordinatorService {
    registration: mpsc::UnboundedSender<String>,
}

#[tonic::async_trait]
impl Coordinator for CoordinatorService {
    async fn register_worker(
        &self,
        request: Request<WorkerRegistration>,
    ) -> Result<Response<WorkerResponse>, Status> {
        let address = request.into_inner().address;
        info!(%address, "worker registered");
        self.registration
            .send(address)
            .map_err(|_| Status::unavailable("job is no longer running"))?;
        Ok(Response::new(WorkerResponse {
            success: true,
            message: "worker registered".into(),
        }))
    }
}

/// Invokes tasks over gRPC, one connection per invocation.
///
/// Any connection or call error, and any call that outlives the deadline,
/// counts as a failed invocation; the scheduler handles the rest.
struct GrpcRunner {
    call_timeout: Duration,
}

#[tonic::async_trait]
impl TaskRunner for GrpcRunner {
    async fn invoke(&self, worker: &str, task: TaskAssignment) -> bool {
        let args = DoTaskArgs {
            job_name: task.job_name,
            file: task.input,
            phase: task.phase.as_str().into(),
            task_number: task.task_index as u32,
            num_other_phase: task.num_other as u32,
            workload: task.workload,
        };
        let call = async {
            let mut client = WorkerClient::connect(format!("http://{worker}")).await?;
            client.do_task(Request::new(args)).await?;
            Ok::<_, anyhow::Error>(())
        };
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(%worker, "task invocation failed: {err:#}");
                false
            }
            Err(_) => {
                warn!(%worker, "task invocation timed out");
                false
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    // Fail fast on a bad job configuration, before any worker gets involved.
    workload::named(&args.workload)?;
    let files: Vec<String> = glob::glob(&args.input)?
        .flatten()
        .map(|p| p.display().to_string())
        .collect();
    if files.is_empty() {
        bail!("no input files match `{}`", args.input);
    }

    let job = Job {
        name: args
            .name
            .unwrap_or_else(|| format!("job-{}", Uuid::new_v4().simple())),
        workload: args.workload,
        files,
        n_reduce: args.n_reduce,
    };
    info!(
        name = %job.name,
        workload = %job.workload,
        n_map = job.files.len(),
        n_reduce = job.n_reduce,
        "starting job"
    );

    let mut pool = WorkerPool::new();
    let service = CoordinatorService {
        registration: pool.registration(),
    };
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    info!(%addr, "coordinator listening");
    tokio::spawn(async move {
        if let Err(err) = Server::builder()
            .add_service(CoordinatorServer::new(service))
            .serve(addr)
            .await
        {
            warn!("registration server stopped: {err}");
        }
    });

    let runner = Arc::new(GrpcRunner {
        call_timeout: Duration::from_secs(args.timeout),
    });
    let mut scheduler = PhaseScheduler::new(runner);
    if let Some(limit) = args.retry_limit {
        scheduler = scheduler.with_retry_limit(limit);
    }

    scheduler.run_phase(&job, Phase::Map, &mut pool).await?;
    scheduler.run_phase(&job, Phase::Reduce, &mut pool).await?;

    let merged = codec::merge_outputs(Path::new(&args.work_dir), &job.name, job.n_reduce)?;
    info!(path = %merged.display(), "job complete");
    Ok(())
}
