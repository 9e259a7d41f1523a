//! Command-line argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden", version, about = "Control plane for coding-agent processes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single job to completion and print its buffered output
    Run {
        /// Display tag for the job
        #[arg(long, default_value = "adhoc")]
        kind: String,

        /// Working directory for the child process
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Environment overlay entries; use these for credentials rather
        /// than embedding them in the command line
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Executable followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Start the hosting runtime and supervise jobs until interrupted
    Serve {
        /// Orderly-shutdown budget in seconds before forced disposal
        #[arg(long, default_value_t = 5)]
        shutdown_deadline: u64,

        /// Output lines retained per job
        #[arg(long, default_value_t = 2000)]
        log_capacity: usize,

        /// Root directory for persisted sessions (defaults to the user
        /// data directory)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}
