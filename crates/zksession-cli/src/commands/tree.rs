//! Offline commands: allow-list roots, claims roots and circuit inputs

use alloy_primitives::{Address, Bytes};
use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;
use std::path::Path;
use tracing::info;
use zksession_core::{
    AddressAllowlist, AllowlistTree, CircuitInputBuilder, FieldElement, PublicChallenge,
    SessionAllowlists, SessionClaimsCommitment, SessionMaterial, TransactionIntent, TreeConfig,
};

use crate::cli::InputFormat;
use crate::config::CliConfig;
use crate::formatters::{parse_ether, write_output};

/// Execute allowlist-root command
pub fn cmd_allowlist_root(
    addresses: &[Address],
    depth: usize,
    witness_for: Option<Address>,
) -> Result<()> {
    let allowlist = AddressAllowlist::from_addresses(TreeConfig::new(depth), addresses)?;
    info!(leaves = allowlist.len(), depth, "Built allow-list");

    let Some(address) = witness_for else {
        println!("{}", allowlist.root());
        return Ok(());
    };

    let witness = allowlist
        .witness_for(address)
        .ok_or_else(|| anyhow!("{} is not in the allow-list", address))??;
    let report = json!({
        "root": allowlist.root(),
        "witness": witness,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Execute claims-root command
pub fn cmd_claims_root(
    config: &CliConfig,
    account: Address,
    session_key: Address,
    contracts: &[Address],
    recipients: &[Address],
) -> Result<()> {
    let allowlists = SessionAllowlists::build(config.chain.allowlist_tree(), contracts, recipients)?;
    let commitment = SessionClaimsCommitment::from_session(
        account,
        session_key,
        &allowlists.contract_calls,
        &allowlists.value_transfers,
        config.chain.claims_tree(),
    )?;
    println!("{}", serde_json::to_string_pretty(&commitment)?);
    Ok(())
}

/// Execute build-inputs command
#[allow(clippy::too_many_arguments)]
pub fn cmd_build_inputs(
    config: &CliConfig,
    session: &Path,
    to: Address,
    value: &str,
    data: &Bytes,
    challenge: FieldElement,
    format: InputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let material = SessionMaterial::load(session)?;
    let allowlists = material
        .allowlists(config.chain.allowlist_tree())
        .context("cannot rebuild session allow-lists")?;
    let commitment = material.commitment(&allowlists, config.chain.claims_tree())?;
    if !commitment.matches(material.claims_root) {
        bail!(
            "session material is stale: stored claims root {} but its allow-lists commit to {}",
            material.claims_root,
            commitment.root()
        );
    }

    let intent = TransactionIntent::from_call(to, parse_ether(value)?, data);
    let mut builder =
        CircuitInputBuilder::new(&allowlists.value_transfers, &allowlists.contract_calls);
    if let Some(size) = config.chain.batch_size {
        builder = builder.with_batch_size(size);
    }
    let inputs = builder.build(
        material.account,
        material.session_key,
        PublicChallenge::from_field(challenge),
        &[intent],
    )?;

    let rendered = match format {
        InputFormat::Toml => inputs.to_prover_toml()?,
        InputFormat::Json => inputs.to_json()?,
    };
    write_output(&rendered, output)
}
