//! A worker: serves the task execution service and announces itself to the
//! coordinator. Stateless between tasks; a failed task attempt is reported
//! to the caller and the worker keeps serving.

use anyhow::Result;
use clap::Parser;
use mapred::cmd::worker::Args;
use mapred::executor::{perform_map, perform_reduce};
use mapred::{workload, Phase};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod mapreduce {
    tonic::include_proto!("mapreduce");
}

use mapreduce::coordinator_client::CoordinatorClient;
use mapreduce::worker_server::{Worker, WorkerServer};
use mapreduce::{DoTaskArgs, Empty, WorkerRegistration};

struct WorkerService {
    work_dir: PathBuf,
}

#[tonic::async_trait]
impl Worker for WorkerService {
    async fn do_task(&self, request: Request<DoTaskArgs>) -> Result<Response<Empty>, Status> {
        let args = request.into_inner();
        info!(phase = %args.phase, task = args.task_number, "task received");

        let phase: Phase = args
            .phase
            .parse()
            .map_err(|err: anyhow::Error| Status::invalid_argument(err.to_string()))?;
        let engine = workload::named(&args.workload)
            .map_err(|err| Status::invalid_argument(err.to_string()))?;

        let result = match phase {
            Phase::Map => perform_map(
                &self.work_dir,
                &args.job_name,
                args.task_number as usize,
                &args.file,
                args.num_other_phase as usize,
                engine.map_fn,
            ),
            Phase::Reduce => perform_reduce(
                &self.work_dir,
                &args.job_name,
                args.task_number as usize,
                args.num_other_phase as usize,
                engine.reduce_fn,
            ),
        };

        match result {
            Ok(()) => {
                info!(phase = %args.phase, task = args.task_number, "task done");
                Ok(Response::new(Empty {}))
            }
            Err(err) => {
                warn!(phase = %args.phase, task = args.task_number, "task attempt failed: {err:#}");
                Err(Status::internal(format!("{err:#}")))
            }
        }
    }
}

async fn register(coordinator: &str, advertise: &str) -> Result<()> {
    let mut client = CoordinatorClient::connect(format!("http://{coordinator}")).await?;
    client
        .register_worker(Request::new(WorkerRegistration {
            address: advertise.to_string(),
        }))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let advertise = args
        .advertise
        .unwrap_or_else(|| format!("127.0.0.1:{}", args.port));
    let addr: std::net::SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;

    let coordinator = args.join.clone();
    let announced = advertise.clone();
    tokio::spawn(async move {
        // Give the task server below a moment to come up before advertising it.
        sleep(Duration::from_millis(250)).await;
        match register(&coordinator, &announced).await {
            Ok(()) => info!(advertise = %announced, "registered with coordinator"),
            Err(err) => error!("failed to register with coordinator: {err:#}"),
        }
    });

    let service = WorkerService {
        work_dir: PathBuf::from(args.work_dir),
    };
    info!(%addr, "worker listening");
    Server::builder()
        .add_service(WorkerServer::new(service))
        .serve(addr)
        .await?;
    Ok(())
}
