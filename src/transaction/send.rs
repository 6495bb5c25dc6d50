//! Sending a built transaction and optionally waiting for it to be confirmed.

use crate::errors::ExecutionError;
use crate::transaction::confirm;
use crate::transaction::{ResolveCondition, Transaction, TransactionBuilder};
use tracing::debug;
use web3::types::{TransactionReceipt, H256, U64};
use web3::Transport;

impl<T: Transport> TransactionBuilder<T> {
    /// Sign (if required) and send the transaction.
    ///
    /// With the default `ResolveCondition::Pending` this returns as soon as
    /// the node accepted the transaction. With `ResolveCondition::Confirmed`
    /// it waits for the receipt and fails if the receipt reports a zero status.
    pub async fn send(mut self) -> Result<TransactionHandle, ExecutionError> {
        let web3 = self.web3.clone();
        let resolve = self.resolve.take().unwrap_or_default();

        let tx = self.build().await?;
        let tx_hash = match tx {
            Transaction::Request(tx) => web3.eth().send_transaction(tx).await?,
            Transaction::Raw { bytes, hash } => {
                let node_hash = web3.eth().send_raw_transaction(bytes).await?;
                if node_hash != hash {
                    return Err(ExecutionError::UnexpectedTransactionHash);
                }
                hash
            }
        };
        debug!(?tx_hash, "submitted transaction");

        let tx_receipt = match resolve {
            ResolveCondition::Pending => return Ok(TransactionHandle::Hash(tx_hash)),
            ResolveCondition::Confirmed(params) => {
                confirm::wait_for_confirmation(&web3, tx_hash, params).await
            }
        }?;

        // receipts mined before Byzantium carry no status
        match tx_receipt.status {
            Some(status) if status == U64::zero() => {
                Err(ExecutionError::Failure(Box::new(tx_receipt)))
            }
            _ => Ok(TransactionHandle::Receipt(tx_receipt)),
        }
    }
}

/// A handle to a submitted transaction: only its hash when inclusion was not
/// awaited, or its receipt once it was mined.
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum TransactionHandle {
    /// The node accepted the transaction, it may not be mined yet.
    Hash(H256),
    /// The transaction was mined successfully.
    Receipt(TransactionReceipt),
}

impl TransactionHandle {
    /// Returns true if only the hash is known.
    pub fn is_hash(&self) -> bool {
        matches!(self, TransactionHandle::Hash(_))
    }

    /// Get the transaction hash.
    pub fn hash(&self) -> H256 {
        match self {
            TransactionHandle::Hash(hash) => *hash,
            TransactionHandle::Receipt(tx) => tx.transaction_hash,
        }
    }

    /// Returns true if the transaction receipt is available.
    pub fn is_receipt(&self) -> bool {
        self.as_receipt().is_some()
    }

    /// The transaction receipt, if the transaction was awaited.
    pub fn as_receipt(&self) -> Option<&TransactionReceipt> {
        match self {
            TransactionHandle::Receipt(ref tx) => Some(tx),
            _ => None,
        }
    }
}
