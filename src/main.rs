//! respkv - persistent Redis-compatible key-value server
//!
//! Parses flags, sets up logging and hands over to the lifecycle
//! controller. The exit status is 0 after SIGINT and non-zero after any
//! fatal startup or serve error.

use anyhow::Context;
use respkv::{lifecycle, Config};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_args();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!(
        version = respkv::VERSION,
        addr = %config.addr,
        dir = %config.dir.display(),
        "Starting respkv"
    );

    let termination = lifecycle::run(&config)
        .await
        .context("server failed to start")?;

    info!("Server shutdown complete");
    Ok(ExitCode::from(termination.exit_status()))
}
