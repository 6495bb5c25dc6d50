//! Prelude module with common types used for unit tests.

pub use crate::test::transport::TestTransport;
use futures::future::FutureExt;
pub use serde_json::json;
use serde_json::Value;
use std::future::Future;
pub use web3::api::Web3;
use web3::types::{Address, H2048, H256};

/// Drives futures to completion from synchronous tests.
pub trait FutureTestExt: Future {
    /// Block thread on a future completing.
    fn wait(self) -> Self::Output;
    /// Assert that future is ready immediately and return the output.
    fn immediate(self) -> Self::Output;
}

impl<F: Future + Sized> FutureTestExt for F {
    fn wait(self) -> Self::Output {
        futures::executor::block_on(self)
    }
    fn immediate(self) -> Self::Output {
        self.now_or_never()
            .expect("future did not resolve immediately")
    }
}

/// JSON for a `eth_getTransactionReceipt` response of a mined transaction.
/// The status field is left out unless set, like receipts mined before
/// Byzantium.
pub struct MinedReceipt {
    json: Value,
}

impl MinedReceipt {
    /// A receipt for `tx_hash` mined in `block`.
    pub fn new(tx_hash: H256, block: u64) -> Self {
        MinedReceipt {
            json: json!({
                "transactionHash": tx_hash,
                "transactionIndex": "0x0",
                "blockNumber": format!("{:#x}", block),
                "blockHash": H256::from_low_u64_be(block),
                "cumulativeGasUsed": "0x1337",
                "gasUsed": "0x1337",
                "logsBloom": H2048::zero(),
                "logs": [],
            }),
        }
    }

    /// Sets the status code, 1 for success and 0 for failure.
    pub fn status(mut self, status: u64) -> Self {
        self.json["status"] = json!(format!("{:#x}", status));
        self
    }

    /// Sets the address of a contract created by the transaction.
    pub fn contract_address(mut self, address: Address) -> Self {
        self.json["contractAddress"] = json!(address);
        self
    }

    /// The response value to queue on a `TestTransport`.
    pub fn json(self) -> Value {
        self.json
    }
}
