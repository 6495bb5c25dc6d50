//! Helpers for inspecting and re-submitting transactions and for querying
//! accounts on a node.

use crate::errors::ExecutionError;
use crate::transaction::{Account, GasPrice, TransactionBuilder, TransactionHandle};
use tracing::debug;
use web3::api::Web3;
use web3::types::{Address, BlockNumber, Transaction, TransactionId, H256, U256, U64};
use web3::Transport;

/// The outcome of a transaction as far as the node knows it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionStatus {
    /// The transaction is known but not mined yet.
    Pending,
    /// The transaction was mined and executed successfully.
    Success,
    /// The transaction was mined but its execution failed.
    Reverted,
    /// The transaction was mined but its receipt carries no status, which is
    /// the case for blocks before the Byzantium fork.
    Unknown,
}

/// Returns true if there is code deployed at `address` in the latest block.
pub async fn is_contract<T: Transport>(
    web3: &Web3<T>,
    address: Address,
) -> Result<bool, ExecutionError> {
    let code = web3
        .eth()
        .code(address, Some(BlockNumber::Latest))
        .await?;
    Ok(!code.0.is_empty())
}

/// Fetches a transaction by hash. Unknown hashes are an error.
pub async fn transaction<T: Transport>(
    web3: &Web3<T>,
    hash: H256,
) -> Result<Transaction, ExecutionError> {
    web3.eth()
        .transaction(TransactionId::Hash(hash))
        .await?
        .ok_or(ExecutionError::MissingTransaction(hash))
}

/// Returns the account that sent a transaction.
pub async fn transaction_sender<T: Transport>(
    web3: &Web3<T>,
    hash: H256,
) -> Result<Address, ExecutionError> {
    let tx = transaction(web3, hash).await?;
    tx.from.ok_or_else(|| {
        web3::Error::Decoder(format!("transaction {:?} has no sender", hash)).into()
    })
}

/// Reports whether a transaction is pending, succeeded or reverted.
pub async fn transaction_status<T: Transport>(
    web3: &Web3<T>,
    hash: H256,
) -> Result<TransactionStatus, ExecutionError> {
    let receipt = web3.eth().transaction_receipt(hash).await?;
    match receipt {
        Some(receipt) if receipt.block_number.is_some() => Ok(match receipt.status {
            Some(U64([1])) => TransactionStatus::Success,
            Some(_) => TransactionStatus::Reverted,
            None => TransactionStatus::Unknown,
        }),
        _ => {
            transaction(web3, hash).await?;
            Ok(TransactionStatus::Pending)
        }
    }
}

/// Signs `tx` again with `account` and submits it, keeping its recipient,
/// value, input and gas limit.
///
/// The nonce and gas price of the original are reused unless replacements
/// are given; replacing a pending transaction requires the same nonce and a
/// higher gas price. The returned handle resolves as soon as the node
/// accepted the new transaction.
pub async fn resend_transaction<T: Transport>(
    web3: &Web3<T>,
    tx: &Transaction,
    account: Account,
    nonce: Option<U256>,
    gas_price: Option<GasPrice>,
) -> Result<TransactionHandle, ExecutionError> {
    let nonce = nonce.unwrap_or(tx.nonce);
    let gas_price = gas_price.or_else(|| GasPrice::of_transaction(tx));

    let mut builder = TransactionBuilder::new(web3.clone())
        .from(account)
        .gas(tx.gas)
        .value(tx.value)
        .data(tx.input.clone())
        .nonce(nonce);
    if let Some(to) = tx.to {
        builder = builder.to(to);
    }
    if let Some(gas_price) = gas_price {
        builder = builder.gas_price(gas_price);
    }

    debug!(original = ?tx.hash, %nonce, "resending transaction");
    builder.send().await
}
