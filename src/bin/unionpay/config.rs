//! The optional TOML configuration file. Command line flags take precedence
//! over every value read from it.

use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use web3::types::Address;

pub const DEFAULT_NODE_URL: &str = "http://localhost:8545";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON-RPC endpoint of the node.
    pub node_url: Option<String>,
    /// Address of a deployed UnionPay contract.
    pub contract: Option<Address>,
    /// Artifact to use instead of the bundled one.
    pub artifact: Option<PathBuf>,
    /// Interval between filter polls when watching events.
    pub poll_interval_ms: Option<u64>,
    /// Chain ID used for offline signing, queried from the node if unset.
    pub chain_id: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let config = Config::parse(
            r#"
            node_url = "http://10.0.0.1:8545"
            contract = "0x47f00aa355a5acbba5f5df765255e2033a4cd354"
            artifact = "contracts/UnionPay.json"
            poll_interval_ms = 500
            chain_id = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.node_url.as_deref(), Some("http://10.0.0.1:8545"));
        assert_eq!(
            config.contract,
            Some(Address::from_slice(
                &hex::decode("47f00aa355a5acbba5f5df765255e2033a4cd354").unwrap()
            ))
        );
        assert_eq!(config.poll_interval_ms, Some(500));
        assert_eq!(config.chain_id, Some(5));
    }

    #[test]
    fn empty_and_unknown_keys() {
        let config = Config::parse("").unwrap();
        assert!(config.node_url.is_none());

        assert!(Config::parse("private_key = \"0x01\"").is_err());
    }
}
