mod cmd;
mod config;
mod error;
mod exporter;
mod pipeline;
mod replay_client;

use clap::Parser;
use config::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// `LOGS=1` turns on trace output for every target; otherwise `RUST_LOG`
/// applies, defaulting to `info`.
fn env_filter() -> EnvFilter {
    if trace_forced(std::env::var("LOGS").ok().as_deref()) {
        return EnvFilter::new("trace");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

fn trace_forced(logs: Option<&str>) -> bool {
    logs.is_some_and(|v| v.trim() == "1")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(args).await,
        Commands::Check(args) => cmd::check::run(args),
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "stream-server failed");
        std::process::exit(1);
    }
}
