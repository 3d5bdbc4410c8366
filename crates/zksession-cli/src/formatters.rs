//! Output formatting and unit conversion helpers

use alloy_primitives::{utils, U256};
use anyhow::{Context, Result};
use std::path::Path;
use zksession_ethereum::InclusionReceipt;

/// Write to `output_path`, or stdout when none is given
pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
    if let Some(path) = output_path {
        std::fs::write(path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;
        eprintln!("Output written to {}", path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

/// Parse a decimal ether amount into wei
pub fn parse_ether(amount: &str) -> Result<U256> {
    utils::parse_ether(amount.trim()).with_context(|| format!("invalid ether amount '{}'", amount))
}

pub fn format_receipt(receipt: &InclusionReceipt) -> Result<String> {
    Ok(serde_json::to_string_pretty(receipt)?)
}
