//! wagate CLI and REST API entry point.
//!
//! Binary name: `wagate`
//!
//! Parses CLI arguments, loads configuration, then dispatches to the
//! appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use wagate_infra::config::load_gateway_config;
use wagate_infra::filesystem::resolve_data_dir;
use wagate_observe::tracing_setup::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "wagate", &mut std::io::stdout());
        return Ok(());
    }

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    if cli.log_json {
        tracing_options.format = LogFormat::Json;
    }
    tracing_options.otel = cli.otel;
    init_tracing(&tracing_options)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let data_dir = resolve_data_dir();
    let config = load_gateway_config(&data_dir).await;

    let result = run(cli, data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    data_dir: std::path::PathBuf,
    config: wagate_types::config::GatewayConfig,
) -> anyhow::Result<()> {
    match cli.command {
        Commands::Normalize { raw } => cli::address::normalize(&config.numbering, &raw, cli.json),

        Commands::Config => cli::config::show_config(&data_dir, &config, cli.json),

        Commands::Serve { host, port } => {
            let state = AppState::open(data_dir, config).await?;
            cli::serve::serve(state, host, port).await
        }

        Commands::Rules { command } => {
            let state = AppState::open(data_dir, config).await?;
            cli::rules::handle_rules_command(command, &state, cli.json).await
        }

        Commands::Inbox { session_id } => {
            let state = AppState::open(data_dir, config).await?;
            cli::inbox::show_inbox(&state, &session_id, cli.json).await
        }

        Commands::Completions { .. } => Ok(()),
    }
}
