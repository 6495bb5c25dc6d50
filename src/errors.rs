//! Module with common error types.

mod geth;
mod revert;

use crate::tokens::Error as TokenizationError;
use secp256k1::Error as Secp256k1Error;
use thiserror::Error;
use unionpay_common::abi::{Error as AbiError, Event, Function};
use unionpay_common::abiext::{EventExt, FunctionExt};
use web3::error::Error as Web3Error;
use web3::types::{Log, TransactionReceipt, H256};

pub use self::revert::decode_reason;
pub use unionpay_common::errors::*;

/// The broad class of an error, independent of which operation produced it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Arguments did not match the declared ABI types or arity. Nothing was
    /// sent to the node.
    Encoding,
    /// Bytes returned by the node did not match the declared ABI shape.
    Decoding,
    /// The node or the transport failed, including node side execution
    /// failures such as reverted calls.
    Backend,
    /// A transaction was processed but its outcome was not the expected one.
    Transaction,
}

/// Error that can occur while deploying a contract.
#[derive(Debug, Error)]
pub enum DeployError {
    /// An error occured encoding deployment parameters with the contract ABI.
    #[error("error ABI encoding deployment parameters: {0}")]
    Encoding(#[from] AbiError),

    /// Attempted to deploy a contract when empty bytecode. This can happen
    /// when attempting to deploy a contract that is actually an interface.
    #[error("can not deploy contract with empty bytecode")]
    EmptyBytecode,

    /// Error executing contract deployment transaction.
    #[error("error executing contract deployment transaction: {0}")]
    Tx(#[from] ExecutionError),
}

impl DeployError {
    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeployError::Encoding(_) | DeployError::EmptyBytecode => ErrorKind::Encoding,
            DeployError::Tx(err) => err.kind(),
        }
    }
}

/// Error that can occur while executing a contract call or transaction.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// An error occured while performing a web3 call.
    #[error("web3 error: {0}")]
    Web3(Web3Error),

    /// An error occured while ABI encoding call or filter parameters.
    #[error("abi encode error: {0}")]
    Encoding(AbiError),

    /// An error occured while ABI decoding the result of a contract method
    /// call or an event log.
    #[error("abi decode error: {0}")]
    AbiDecode(#[from] AbiError),

    /// An error occured while converting decoded tokens into Rust types.
    #[error("tokenization error: {0}")]
    Tokenization(#[from] TokenizationError),

    /// The node reported a transaction hash that is different from the one
    /// that was computed locally for a signed transaction.
    #[error("unexpected transaction hash")]
    UnexpectedTransactionHash,

    /// No account was specified and the node has no local accounts.
    #[error("no local accounts")]
    NoLocalAccounts,

    /// A contract call reverted, with an optional reason.
    #[error("contract call reverted with message: {0:?}")]
    Revert(Option<String>),

    /// A contract call executed an invalid opcode.
    #[error("contract call executed an invalid opcode")]
    InvalidOpcode,

    /// A mined transaction reported a non-success status, or a deployment
    /// receipt is missing the created contract address.
    #[error("transaction failed: {:?}", .0.transaction_hash)]
    Failure(Box<TransactionReceipt>),

    /// A log that was expected to be final was removed by a re-org.
    #[error("log was removed")]
    RemovedLog(Box<Log>),

    /// The node does not know about the transaction.
    #[error("missing transaction {0:?}")]
    MissingTransaction(H256),

    /// The transaction is not mined yet.
    #[error("pending transaction {0:?}")]
    PendingTransaction(H256),

    /// The transaction was not confirmed within the block timeout.
    #[error("transaction confirmation timed out")]
    ConfirmTimeout(H256),

    /// A live subscription ended because its channel was closed.
    #[error("log stream closed")]
    StreamClosed,
}

impl ExecutionError {
    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Encoding(_) => ErrorKind::Encoding,
            ExecutionError::AbiDecode(_) | ExecutionError::Tokenization(_) => ErrorKind::Decoding,
            ExecutionError::Web3(_)
            | ExecutionError::UnexpectedTransactionHash
            | ExecutionError::NoLocalAccounts
            | ExecutionError::Revert(_)
            | ExecutionError::InvalidOpcode
            | ExecutionError::StreamClosed => ErrorKind::Backend,
            ExecutionError::Failure(_)
            | ExecutionError::RemovedLog(_)
            | ExecutionError::MissingTransaction(_)
            | ExecutionError::PendingTransaction(_)
            | ExecutionError::ConfirmTimeout(_) => ErrorKind::Transaction,
        }
    }
}

impl From<Web3Error> for ExecutionError {
    fn from(err: Web3Error) -> Self {
        if let Web3Error::Rpc(jsonrpc_err) = &err {
            if let Some(err) = geth::get_encoded_error(jsonrpc_err) {
                return err;
            }
        }

        ExecutionError::Web3(err)
    }
}

/// Error that can occur while executing a contract method.
#[derive(Debug, Error)]
#[error("method '{signature}' failure: {inner}")]
pub struct MethodError {
    /// The signature of the failed method.
    pub signature: String,

    /// The underlying execution error.
    #[source]
    pub inner: ExecutionError,
}

impl MethodError {
    /// Create a new `MethodError` from an ABI function and an
    /// inner `ExecutionError`.
    pub fn new<I: Into<ExecutionError>>(function: &Function, inner: I) -> Self {
        MethodError::from_parts(function.abi_signature(), inner.into())
    }

    /// Create a `MethodError` from its signature and inner `ExecutionError`.
    pub fn from_parts(signature: String, inner: ExecutionError) -> Self {
        MethodError { signature, inner }
    }

    /// Create a `MethodError` for arguments that could not be encoded.
    pub fn encoding(signature: String, err: AbiError) -> Self {
        MethodError::from_parts(signature, ExecutionError::Encoding(err))
    }

    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind()
    }
}

/// Error that can occur while streaming contract events.
#[derive(Debug, Error)]
#[error("event '{signature}' failure: {inner}")]
pub struct EventError {
    /// The signature of the failed event.
    pub signature: String,

    /// The underlying execution error.
    #[source]
    pub inner: ExecutionError,
}

impl EventError {
    /// Create a new `EventError` from an ABI event and an inner
    /// `ExecutionError`.
    pub fn new<I: Into<ExecutionError>>(event: &Event, inner: I) -> Self {
        EventError::from_parts(event.abi_signature(), inner.into())
    }

    /// Create an `EventError` from its signature and inner `ExecutionError`.
    pub fn from_parts(signature: String, inner: ExecutionError) -> Self {
        EventError { signature, inner }
    }

    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind()
    }
}

/// Invalid private key.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("invalid private key")]
pub struct InvalidPrivateKey;

impl From<Secp256k1Error> for InvalidPrivateKey {
    fn from(_: Secp256k1Error) -> Self {
        InvalidPrivateKey
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpc_core::Error as JsonrpcError;

    #[test]
    fn from_web3_decodes_geth_revert() {
        let err = ExecutionError::from(Web3Error::Rpc(JsonrpcError {
            code: 3.into(),
            message: "execution reverted: not the owner".to_string(),
            data: None,
        }));

        assert!(
            matches!(&err, ExecutionError::Revert(Some(reason)) if reason == "not the owner"),
            "expected revert error but got {:?}",
            err
        );
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    #[test]
    fn from_web3_keeps_other_errors() {
        let err = ExecutionError::from(Web3Error::Unreachable);
        assert!(matches!(err, ExecutionError::Web3(Web3Error::Unreachable)));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            ExecutionError::Encoding(AbiError::InvalidData).kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            ExecutionError::AbiDecode(AbiError::InvalidData).kind(),
            ErrorKind::Decoding
        );
        assert_eq!(
            ExecutionError::Tokenization(TokenizationError::TypeMismatch).kind(),
            ErrorKind::Decoding
        );
        assert_eq!(DeployError::EmptyBytecode.kind(), ErrorKind::Encoding);
        assert_eq!(
            ExecutionError::MissingTransaction(H256::zero()).kind(),
            ErrorKind::Transaction
        );
    }
}
