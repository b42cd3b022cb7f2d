use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = env::var("OUT_DIR")?;
    let proto_file = "proto/mapreduce.proto";
    if env::var_os("PROTOC").is_none() {
        if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
            env::set_var("PROTOC", path);
        }
    }
    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .out_dir(&out_dir)
        .compile(&[proto_file], &["proto"])?;
    Ok(())
}
