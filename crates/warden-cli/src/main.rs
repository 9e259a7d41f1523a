//! Warden CLI
//!
//! Thin binary over the Warden libraries. `warden run` launches one job and
//! prints its output; `warden serve` hosts the supervised runtime until
//! interrupted. All orchestration logic lives in `warden-core`.

mod args;
mod commands;

use clap::Parser;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment-based filtering; set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            kind,
            cwd,
            env,
            command,
        } => commands::run(kind, cwd, env, command).await,
        Commands::Serve {
            shutdown_deadline,
            log_capacity,
            data_dir,
        } => commands::serve(shutdown_deadline, log_capacity, data_dir).await,
    }
}
