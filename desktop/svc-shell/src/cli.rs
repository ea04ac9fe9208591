use std::path::PathBuf;

use clap::Parser;

const DEFAULT_DATA_DIR: &str = ".svc-shell";

#[derive(Debug, Parser)]
#[command(name = "svc-shell")]
#[command(about = "Launches the local backend and keeps it alive for the desktop UI")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.toml, the lock file and logs
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub(crate) data_dir: PathBuf,

    /// Explicit config file (skips creating a default one)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Emit status events as JSON lines on stdout
    #[arg(long)]
    pub(crate) json: bool,

    /// Override the configured preferred port
    #[arg(long)]
    pub(crate) preferred_port: Option<u16>,
}
