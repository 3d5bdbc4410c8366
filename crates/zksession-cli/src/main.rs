//! CLI tool for zero-knowledge session keys
//!
//! This binary provides the `zksession` command-line interface for computing
//! allow-list and claims roots, exporting circuit inputs, opening sessions
//! and sending transactions under them.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod formatters;

use cli::{Cli, Commands};
use commands::{cmd_allowlist_root, cmd_build_inputs, cmd_claims_root, cmd_open_session, cmd_send};
use config::CliConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::AllowlistRoot {
            addresses,
            depth,
            witness_for,
        } => cmd_allowlist_root(&addresses, depth, witness_for),

        Commands::ClaimsRoot {
            account,
            session_key,
            contracts,
            recipients,
        } => cmd_claims_root(&config, account, session_key, &contracts, &recipients),

        Commands::BuildInputs {
            session,
            to,
            value,
            data,
            challenge,
            format,
            output,
        } => cmd_build_inputs(
            &config,
            &session,
            to,
            &value,
            &data,
            challenge,
            format,
            output.as_deref(),
        ),

        Commands::OpenSession {
            contracts,
            recipients,
            output,
            network,
        } => cmd_open_session(config.with_network(&network), &contracts, &recipients, &output).await,

        Commands::Send {
            session,
            to,
            value,
            data,
            circuit_dir,
            network,
        } => {
            let config = config.with_network(&network).with_circuit_dir(circuit_dir);
            cmd_send(config, &session, to, &value, data).await
        }
    }
}
