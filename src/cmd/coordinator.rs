use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Port the worker registration service listens on
    #[clap(short = 'P', long, default_value_t = 50051)]
    pub port: u16,

    /// Glob spec for the input files, one map task per file
    #[clap(short, long)]
    pub input: String,

    /// Name of the workload
    #[clap(short, long)]
    pub workload: String,

    /// Number of reduce partitions
    #[clap(short = 'r', long, default_value_t = 4)]
    pub n_reduce: usize,

    /// Job name used to namespace intermediate files; generated if omitted
    #[clap(short, long)]
    pub name: Option<String>,

    /// Directory the merged result file is written to
    #[clap(short = 'd', long, default_value = ".")]
    pub work_dir: String,

    /// Seconds an invocation may run before it counts as failed (default 15s)
    #[clap(short, long, default_value_t = 15)]
    pub timeout: u64,

    /// Maximum attempts per task before the job is abandoned; unlimited if omitted
    #[clap(long)]
    pub retry_limit: Option<u32>,
}
