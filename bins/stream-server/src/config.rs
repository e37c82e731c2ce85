use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stream-server", about = "Event stream subscription orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Subscribe to every configured topic and export events to stdout
    Run(RunArgs),
    /// Validate the configuration file and exit
    Check(CheckArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml", env = "STREAM_CONFIG")]
    pub config: String,

    /// Directory holding one `<topic>.jsonl` file per topic
    #[arg(long, default_value = "replay", env = "STREAM_REPLAY_DIR")]
    pub replay_dir: PathBuf,

    /// How often an idle topic file is re-read for appended lines
    #[arg(long, default_value_t = 200, env = "STREAM_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,
}

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml", env = "STREAM_CONFIG")]
    pub config: String,
}
