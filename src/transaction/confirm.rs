//! Waiting for a transaction to be mined and confirmed by extra blocks.
//!
//! The node is polled for the latest block number with exponential backoff
//! and the receipt is re-checked once the target block was reached. Waiting
//! for 0 confirmations means waiting until the transaction is mined.

use crate::errors::ExecutionError;
use futures_timer::Delay;
use std::cmp::min;
use std::time::Duration;
use web3::api::Web3;
use web3::types::{TransactionReceipt, H256, U64};
use web3::Transport;

/// Confirmation parameters.
#[derive(Clone, Debug)]
#[must_use = "confirm parameters do nothing unless waited for"]
pub struct ConfirmParams {
    /// Number of blocks mined on top of the block including the transaction.
    pub confirmations: usize,
    /// Minimal delay between consecutive `eth_blockNumber` calls.
    pub poll_interval_min: Duration,
    /// Maximal delay between consecutive `eth_blockNumber` calls.
    pub poll_interval_max: Duration,
    /// Factor by which the delay grows after each poll.
    pub poll_interval_factor: f32,
    /// The maximum number of blocks to wait for a transaction to get confirmed.
    pub block_timeout: Option<usize>,
}

#[cfg(not(test))]
const DEFAULT_POLL_INTERVAL_MIN: Duration = Duration::from_millis(250);
#[cfg(test)]
const DEFAULT_POLL_INTERVAL_MIN: Duration = Duration::from_millis(0);

#[cfg(not(test))]
const DEFAULT_POLL_INTERVAL_MAX: Duration = Duration::from_millis(7000);
#[cfg(test)]
const DEFAULT_POLL_INTERVAL_MAX: Duration = Duration::from_millis(0);

#[cfg(not(test))]
const DEFAULT_POLL_INTERVAL_FACTOR: f32 = 1.7;
#[cfg(test)]
const DEFAULT_POLL_INTERVAL_FACTOR: f32 = 0.0;

/// The default block timeout to use for confirming transactions.
pub const DEFAULT_BLOCK_TIMEOUT: Option<usize> = Some(25);

impl ConfirmParams {
    /// Wait until the transaction is mined, without extra blocks.
    pub fn mined() -> Self {
        ConfirmParams::with_confirmations(0)
    }

    /// Wait for `count` extra blocks with the default poll interval.
    pub fn with_confirmations(count: usize) -> Self {
        ConfirmParams {
            confirmations: count,
            poll_interval_min: DEFAULT_POLL_INTERVAL_MIN,
            poll_interval_max: DEFAULT_POLL_INTERVAL_MAX,
            poll_interval_factor: DEFAULT_POLL_INTERVAL_FACTOR,
            block_timeout: DEFAULT_BLOCK_TIMEOUT,
        }
    }

    /// Set the number of confirmations.
    #[inline]
    pub fn confirmations(mut self, confirmations: usize) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Set the exponential backoff settings.
    #[inline]
    pub fn poll_interval(mut self, min: Duration, max: Duration, factor: f32) -> Self {
        self.poll_interval_min = min;
        self.poll_interval_max = max;
        self.poll_interval_factor = factor;
        self
    }

    /// Set the block timeout, `None` waits forever.
    #[inline]
    pub fn block_timeout(mut self, block_timeout: Option<usize>) -> Self {
        self.block_timeout = block_timeout;
        self
    }
}

impl Default for ConfirmParams {
    fn default() -> Self {
        ConfirmParams::mined()
    }
}

/// Waits for a transaction to be mined and returns its receipt.
pub async fn wait_for_receipt<T: Transport>(
    web3: &Web3<T>,
    tx: H256,
) -> Result<TransactionReceipt, ExecutionError> {
    wait_for_confirmation(web3, tx, ConfirmParams::mined()).await
}

/// Waits for a transaction to be confirmed.
pub async fn wait_for_confirmation<T: Transport>(
    web3: &Web3<T>,
    tx: H256,
    params: ConfirmParams,
) -> Result<TransactionReceipt, ExecutionError> {
    let mut latest_block = None;
    let mut starting_block = None;

    loop {
        let latest = match latest_block {
            Some(value) => value,
            None => web3.eth().block_number().await?,
        };
        let receipt = web3.eth().transaction_receipt(tx).await?;

        let target_block = match receipt.and_then(|receipt| Some((receipt.block_number?, receipt))) {
            Some((tx_block, receipt)) => {
                let target_block = tx_block + params.confirmations;
                if latest >= target_block || params.confirmations == 0 {
                    return Ok(receipt);
                }
                target_block
            }
            // Not mined as of `latest`, so at least one more block is needed.
            None => latest + params.confirmations + 1,
        };

        if let Some(block_timeout) = params.block_timeout {
            let starting_block = *starting_block.get_or_insert(latest);
            if target_block.saturating_sub(starting_block) > U64::from(block_timeout) {
                return Err(ExecutionError::ConfirmTimeout(tx));
            }
        }

        latest_block = Some(wait_for_block(web3, target_block, &params).await?);
    }
}

/// Polls the latest block number until `target_block` is reached and returns
/// the latest block number.
async fn wait_for_block<T: Transport>(
    web3: &Web3<T>,
    target_block: U64,
    params: &ConfirmParams,
) -> Result<U64, ExecutionError> {
    let mut cur_delay = params.poll_interval_min;

    loop {
        delay(cur_delay).await;

        let latest_block = web3.eth().block_number().await?;
        if target_block <= latest_block {
            break Ok(latest_block);
        }

        cur_delay = min(
            cur_delay.mul_f32(params.poll_interval_factor),
            params.poll_interval_max,
        );
    }
}

/// A delay that resolves right away for a zero duration, so unit tests do
/// not need a timer.
async fn delay(duration: Duration) {
    if !duration.is_zero() {
        Delay::new(duration).await;
    }
}
