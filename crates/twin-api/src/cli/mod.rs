//! CLI command definitions for the `twin` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AI digital twin chat service with persistent memory.
#[derive(Parser)]
#[command(name = "twin", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the configuration file (defaults to ./twin.toml).
    #[arg(long, global = true, env = "TWIN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Port to listen on (overrides the configuration file).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (overrides the configuration file).
        #[arg(long)]
        host: Option<String>,
    },

    /// List stored chat sessions.
    #[command(alias = "ls")]
    Sessions,
}

impl Cli {
    /// Log filter directive derived from the verbosity flags.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "info",
            1 => "info,twin_api=debug,twin_core=debug,twin_infra=debug",
            _ => "trace",
        }
    }
}
