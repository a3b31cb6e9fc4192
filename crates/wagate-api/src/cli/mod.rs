//! CLI command definitions for the `wagate` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod address;
pub mod config;
pub mod inbox;
pub mod rules;
pub mod serve;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use rules::RulesCommand;

/// Multi-session messaging gateway.
#[derive(Parser)]
#[command(name = "wagate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "WAGATE_LOG_JSON")]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "WAGATE_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Host to bind to (overrides `server.host`).
        #[arg(long, env = "WAGATE_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides `server.port`).
        #[arg(short, long, env = "WAGATE_PORT")]
        port: Option<u16>,
    },

    /// Manage the auto-reply rule set.
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Show the stored inbox of a session.
    Inbox {
        /// Session id.
        session_id: String,
    },

    /// Normalize a phone number into a network address.
    Normalize {
        /// Raw number or address, e.g. "0812-3456-789".
        raw: String,
    },

    /// Show the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
