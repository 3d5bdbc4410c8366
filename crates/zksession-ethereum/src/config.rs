//! Chain and service configuration
//!
//! Defaults target Polygon Amoy with the v0.7 EntryPoint and Pimlico as both
//! bundler and paymaster.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use zksession_core::{TreeConfig, DEFAULT_ALLOWLIST_DEPTH, DEFAULT_CLAIMS_DEPTH, DEFAULT_PROOF_LENGTH};

use crate::error::RpcError;
use crate::monitor::PollConfig;

/// EntryPoint v0.7
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Session account factory deployed on Amoy
pub const DEFAULT_FACTORY: Address = address!("7934a31391b517f85bbf3c68fecc96b86d54e7b0");

/// Verification gas needed by the proof-verifying account
pub const DEFAULT_VERIFICATION_GAS_LIMIT: u64 = 480_000;

pub const AMOY_CHAIN_ID: u64 = 80002;

/// Pimlico JSON-RPC endpoint for `chain`
pub fn pimlico_url(chain: &str, api_key: &str) -> String {
    format!("https://api.pimlico.io/v2/{}/rpc?apikey={}", chain, api_key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain name as used in Pimlico URLs
    pub chain_name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub bundler_url: Option<String>,
    /// Operations go unsponsored when unset
    pub paymaster_url: Option<String>,
    pub entry_point: Address,
    pub factory: Address,
    pub verification_gas_limit: u64,
    /// Proof length the placeholder signature is sized for
    pub proof_length: usize,
    /// Intents per operation the circuit was compiled for
    pub batch_size: Option<usize>,
    pub allowlist_depth: usize,
    pub claims_depth: usize,
    pub poll: PollConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_name: "polygon-amoy".to_string(),
            chain_id: AMOY_CHAIN_ID,
            rpc_url: "https://rpc-amoy.polygon.technology/".to_string(),
            bundler_url: None,
            paymaster_url: None,
            entry_point: ENTRY_POINT_V07,
            factory: DEFAULT_FACTORY,
            verification_gas_limit: DEFAULT_VERIFICATION_GAS_LIMIT,
            proof_length: DEFAULT_PROOF_LENGTH,
            batch_size: None,
            allowlist_depth: DEFAULT_ALLOWLIST_DEPTH,
            claims_depth: DEFAULT_CLAIMS_DEPTH,
            poll: PollConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Fill unset bundler and paymaster URLs with Pimlico endpoints
    pub fn with_pimlico_key(mut self, api_key: &str) -> Self {
        let url = pimlico_url(&self.chain_name, api_key);
        if self.bundler_url.is_none() {
            self.bundler_url = Some(url.clone());
        }
        if self.paymaster_url.is_none() {
            self.paymaster_url = Some(url);
        }
        self
    }

    pub fn bundler_url(&self) -> Result<&str, RpcError> {
        self.bundler_url
            .as_deref()
            .ok_or_else(|| RpcError::InvalidUrl("no bundler URL configured".to_string()))
    }

    pub fn allowlist_tree(&self) -> TreeConfig {
        TreeConfig::new(self.allowlist_depth)
    }

    pub fn claims_tree(&self) -> TreeConfig {
        TreeConfig::new(self.claims_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_target_amoy() {
        let config = ChainConfig::default();
        assert_eq!(config.chain_id, 80002);
        assert_eq!(config.verification_gas_limit, 480_000);
        assert_eq!(config.proof_length, 2144);
        assert_eq!(config.allowlist_tree().capacity(), 1 << 17);
        assert!(config.bundler_url().is_err());
    }

    #[test]
    fn test_pimlico_key_fills_missing_urls() {
        let config = ChainConfig {
            paymaster_url: Some("http://localhost:3000".into()),
            ..Default::default()
        }
        .with_pimlico_key("pim_test");

        assert_eq!(
            config.bundler_url().unwrap(),
            "https://api.pimlico.io/v2/polygon-amoy/rpc?apikey=pim_test"
        );
        assert_eq!(config.paymaster_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: ChainConfig = serde_json::from_str(
            r#"{"chain_id": 11155111, "chain_name": "sepolia", "poll": {"interval": 250, "max_interval": 2000, "timeout": 30000}}"#,
        )
        .unwrap();
        assert_eq!(config.chain_id, 11155111);
        assert_eq!(config.entry_point, ENTRY_POINT_V07);
        assert_eq!(config.poll.timeout, Duration::from_secs(30));
    }
}
