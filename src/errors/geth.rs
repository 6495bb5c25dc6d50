//! This module implements Geth specific error decoding in order to try and
//! provide more accurate errors from Geth nodes.

use crate::errors::{revert, ExecutionError};
use jsonrpc_core::Error as JsonrpcError;

const REVERTED: &str = "execution reverted";
const INVALID_OPCODE: &str = "invalid opcode";

/// Tries to get a more accurate error from a generic Geth JSON RPC error.
/// Returns `None` when a more accurate error cannot be determined.
pub fn get_encoded_error(err: &JsonrpcError) -> Option<ExecutionError> {
    if let Some(str) = err.message.strip_prefix(REVERTED) {
        let reason = str
            .strip_prefix(": ")
            .map(ToString::to_string)
            .or_else(|| reason_from_data(err));
        Some(ExecutionError::Revert(reason))
    } else if err.message.strip_prefix(INVALID_OPCODE).is_some() {
        Some(ExecutionError::InvalidOpcode)
    } else {
        None
    }
}

/// Newer Geth versions include the ABI encoded revert data as a hex string in
/// the error `data` field.
fn reason_from_data(err: &JsonrpcError) -> Option<String> {
    let data = err.data.as_ref()?.as_str()?;
    let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok()?;
    revert::decode_reason(&bytes)
}
