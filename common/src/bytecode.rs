//! This module implements contract deployment bytecode parsing.

use crate::errors::BytecodeError;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use web3::types::Bytes;

/// The deployment bytecode of a contract, stored as a validated hex string
/// without the `0x` prefix.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bytecode(String);

impl Bytecode {
    /// Reads hex bytecode representation from a string slice. The `0x` prefix
    /// is optional.
    pub fn from_hex_str(s: &str) -> Result<Self, BytecodeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        if s.len() % 2 != 0 {
            return Err(BytecodeError::InvalidLength);
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(BytecodeError::InvalidHexDigit(c));
        }

        Ok(Bytecode(s.to_lowercase()))
    }

    /// Convert the bytecode into raw bytes.
    pub fn to_bytes(&self) -> Bytes {
        // NOTE: The hex string was validated on construction.
        Bytes(hex::decode(&self.0).unwrap_or_default())
    }

    /// Returns true if the bytecode is empty. Contracts without bytecode are
    /// abstract or interfaces and cannot be deployed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Bytecode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Bytecode::from_hex_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Bytecode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", self.0))
    }
}
