use clap::Parser;

pub mod engine;

pub use engine::run_job;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Glob spec for the input files, one map task per file
    #[arg(short, long)]
    pub input: String,

    /// Name of the workload
    #[arg(short, long)]
    pub workload: String,

    /// Number of reduce partitions
    #[arg(short = 'r', long, default_value_t = 4)]
    pub n_reduce: usize,

    /// Job name used to namespace intermediate files
    #[arg(short, long, default_value = "seq")]
    pub name: String,

    /// Directory intermediate and output files are written to
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: String,
}
