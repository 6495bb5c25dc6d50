//! Module for reading contract descriptors: the immutable pairing of a
//! contract's ABI and its deployment bytecode.

use crate::errors::DescriptorError;
use crate::{Abi, Bytecode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use web3::types::H256;

/// Represents a contract ABI and bytecode pair.
///
/// Descriptors can be parsed from artifact JSON of the form
/// `{"contractName": ..., "abi": [...], "bytecode": "0x..."}`, or from the
/// separate ABI JSON and bytecode hex strings emitted by `solc`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default = "ContractDescriptor::empty")]
pub struct ContractDescriptor {
    /// The contract name. Unnamed contracts have an empty string as their name.
    #[serde(rename = "contractName")]
    pub name: String,
    /// The contract ABI.
    pub abi: Abi,
    /// The contract deployment bytecode.
    pub bytecode: Bytecode,
}

impl ContractDescriptor {
    /// Creates an empty contract descriptor.
    pub fn empty() -> Self {
        ContractDescriptor::with_name(String::default())
    }

    /// Creates an empty contract descriptor with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        ContractDescriptor {
            name: name.into(),
            abi: Abi {
                constructor: None,
                functions: BTreeMap::new(),
                events: BTreeMap::new(),
                errors: BTreeMap::new(),
                fallback: false,
                receive: false,
            },
            bytecode: Bytecode::default(),
        }
    }

    /// Parse a contract descriptor from artifact JSON.
    pub fn from_json<S>(json: S) -> Result<Self, DescriptorError>
    where
        S: AsRef<str>,
    {
        let descriptor = serde_json::from_str(json.as_ref())?;
        Ok(descriptor)
    }

    /// Creates a contract descriptor from an ABI JSON array and hex encoded
    /// deployment bytecode.
    pub fn from_parts(
        name: impl Into<String>,
        abi: &str,
        bytecode: &str,
    ) -> Result<Self, DescriptorError> {
        Ok(ContractDescriptor {
            name: name.into(),
            abi: serde_json::from_str(abi)?,
            bytecode: Bytecode::from_hex_str(bytecode)?,
        })
    }

    /// Loads a contract descriptor from an artifact file on disk.
    pub fn load<P>(path: P) -> Result<Self, DescriptorError>
    where
        P: AsRef<Path>,
    {
        let reader = BufReader::new(File::open(path)?);
        let descriptor = serde_json::from_reader(reader)?;
        Ok(descriptor)
    }
}

/// Information about when a contract instance was deployed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeploymentInformation {
    /// The block at which the contract was deployed.
    BlockNumber(u64),
    /// The transaction hash at which the contract was deployed.
    TransactionHash(H256),
}

impl From<u64> for DeploymentInformation {
    fn from(block: u64) -> Self {
        DeploymentInformation::BlockNumber(block)
    }
}

impl From<H256> for DeploymentInformation {
    fn from(hash: H256) -> Self {
        DeploymentInformation::TransactionHash(hash)
    }
}
