//! Configuration loading
//!
//! A TOML file supplies the base settings; command-line flags and environment
//! variables override individual fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use zksession_ethereum::ChainConfig;
use zksession_noir::NoirConfig;

use crate::cli::NetworkArgs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub chain: ChainConfig,
    pub noir: NoirConfig,
}

impl CliConfig {
    /// Read `path`, or use the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: CliConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply endpoint overrides
    pub fn with_network(mut self, network: &NetworkArgs) -> Self {
        if let Some(url) = &network.rpc_url {
            self.chain.rpc_url = url.clone();
        }
        if let Some(url) = &network.bundler_url {
            self.chain.bundler_url = Some(url.clone());
        }
        if let Some(url) = &network.paymaster_url {
            self.chain.paymaster_url = Some(url.clone());
        }
        if let Some(key) = &network.pimlico_api_key {
            self.chain = self.chain.with_pimlico_key(key);
        }
        if network.no_paymaster {
            self.chain.paymaster_url = None;
        }
        self
    }

    pub fn with_circuit_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.noir.circuit_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[chain]
chain_name = "base-sepolia"
chain_id = 84532
paymaster_url = "http://paymaster.local"

[noir]
circuit_name = "session_v2"
"#
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path()))
            .unwrap()
            .with_network(&NetworkArgs {
                pimlico_api_key: Some("k".into()),
                ..Default::default()
            });

        assert_eq!(config.chain.chain_id, 84532);
        assert_eq!(
            config.chain.bundler_url.as_deref(),
            Some("https://api.pimlico.io/v2/base-sepolia/rpc?apikey=k")
        );
        // explicit paymaster URL wins over the derived one
        assert_eq!(config.chain.paymaster_url.as_deref(), Some("http://paymaster.local"));
        assert_eq!(config.noir.circuit_name, "session_v2");
        assert_eq!(config.noir.nargo, "nargo");
    }

    #[test]
    fn test_no_paymaster_clears_url() {
        let config = CliConfig::default().with_network(&NetworkArgs {
            pimlico_api_key: Some("k".into()),
            no_paymaster: true,
            ..Default::default()
        });
        assert!(config.chain.bundler_url.is_some());
        assert!(config.chain.paymaster_url.is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(CliConfig::load(Some(Path::new("/nonexistent/zksession.toml"))).is_err());
    }
}
