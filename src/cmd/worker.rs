use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Connect to a coordinator at the given IP address and port
    #[clap(short, long)]
    pub join: String,

    /// Port this worker's task service listens on
    #[clap(short = 'P', long)]
    pub port: u16,

    /// Address other processes can reach this worker at; defaults to
    /// 127.0.0.1:<port>
    #[clap(short, long)]
    pub advertise: Option<String>,

    /// Directory input, intermediate, and output files live in
    #[clap(short = 'd', long, default_value = ".")]
    pub work_dir: String,
}
