//! Network commands: opening a session and sending under it

use alloy_primitives::{Address, Bytes};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use zksession_core::SessionMaterial;
use zksession_ethereum::{HttpBundler, HttpNodeClient, HttpPaymaster, SessionPipeline};
use zksession_noir::NargoBackend;

use crate::config::CliConfig;
use crate::formatters::{format_receipt, parse_ether, write_output};

type HttpPipeline = SessionPipeline<HttpNodeClient, HttpBundler, HttpPaymaster, NargoBackend>;

fn build_pipeline(config: CliConfig) -> Result<HttpPipeline> {
    let node = HttpNodeClient::new(&config.chain.rpc_url)?;
    let bundler = HttpBundler::new(config.chain.bundler_url()?)?;
    let paymaster = config
        .chain
        .paymaster_url
        .as_deref()
        .map(HttpPaymaster::new)
        .transpose()?;
    if paymaster.is_none() {
        info!("No paymaster configured; the account pays for gas");
    }
    let prover = NargoBackend::new(config.noir);
    Ok(SessionPipeline::new(node, bundler, paymaster, prover, config.chain))
}

/// Execute open-session command
pub async fn cmd_open_session(
    config: CliConfig,
    contracts: &[Address],
    recipients: &[Address],
    output: &Path,
) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let (material, receipt) = pipeline.open_session(contracts, recipients).await?;

    material
        .save(output)
        .with_context(|| format!("session opened but material could not be saved to {}", output.display()))?;
    info!(account = %material.account, session = %output.display(), "Session material saved");
    write_output(&format_receipt(&receipt)?, None)
}

/// Execute send command
pub async fn cmd_send(
    config: CliConfig,
    session: &Path,
    to: Address,
    value: &str,
    data: Bytes,
) -> Result<()> {
    let material = SessionMaterial::load(session)?;
    let value = parse_ether(value)?;
    let pipeline = build_pipeline(config)?;

    let receipt = pipeline.send(&material, to, value, data).await?;
    write_output(&format_receipt(&receipt)?, None)
}
