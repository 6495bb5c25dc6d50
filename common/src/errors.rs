//! Module with common error types.

use serde_json::Error as JsonError;
use std::io::Error as IoError;
use thiserror::Error;

/// An error in loading or parsing a contract descriptor. This is a
/// configuration time fault: a descriptor that fails to parse can never be
/// used to bind or deploy a contract.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// An IO error occurred when loading a contract artifact from disk.
    #[error("failed to open contract artifact file: {0}")]
    Io(#[from] IoError),

    /// A JSON error occurred while parsing the contract ABI or artifact.
    #[error("failed to parse contract ABI JSON: {0}")]
    Json(#[from] JsonError),

    /// The deployment bytecode is not valid hex.
    #[error("invalid contract bytecode: {0}")]
    Bytecode(#[from] BytecodeError),
}

/// An error reading bytecode string representation.
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Bytecode string is not an even length.
    #[error("invalid bytecode length")]
    InvalidLength,

    /// Invalid hex digit. Unlinked library placeholders such as `__Lib____`
    /// also end up here since linking is not supported.
    #[error("invalid hex digit '{0}'")]
    InvalidHexDigit(char),
}
