#![deny(missing_docs, unsafe_code)]

//! Runtime for the UnionPay payment contract and for any other contract that
//! is described by a JSON ABI.
//!
//! Contracts are driven by their ABI at runtime: a [`BoundContract`] pairs a
//! parsed ABI with an address and a `web3` provider and dispatches calls,
//! transactions and event queries by name. [`UnionPay`] is a typed facade
//! over it for the bundled UnionPay artifact. The [`node`] module has a few
//! helpers for inspecting and re-submitting transactions.
//!
//! ```ignore
//! use unionpay::prelude::*;
//!
//! let web3 = Web3::new(Http::new("http://localhost:8545")?);
//! let descriptor = UnionPay::<Http>::artifact()?;
//! let contract = UnionPay::at(web3, &descriptor, address);
//!
//! // view functions are plain async calls
//! let balance = contract.get_balance().await?;
//!
//! // transactions use the builder pattern and return as soon as the node
//! // accepted them, unless confirmations are requested
//! let tx = contract
//!     .plain_pay()?
//!     .from(Account::Offline(key, None))
//!     .value(U256::exp10(16))
//!     .confirmations(1)
//!     .send()
//!     .await?;
//!
//! // events can be queried or watched
//! let (sink, mut payments) = tokio::sync::mpsc::channel(16);
//! let subscription = contract.user_pay()?.watch(sink)?;
//! while let Some(payment) = payments.recv().await {
//!     println!("{:?}", payment.inner_data());
//! }
//! subscription.unsubscribe().await?;
//! ```

#[cfg(test)]
#[allow(missing_docs)]
#[macro_use]
#[path = "test/macros.rs"]
mod test_macros;

pub mod contract;
pub mod errors;
pub mod log;
pub mod node;
pub mod secret;
pub mod tokens;
pub mod transaction;
pub mod unionpay;

pub use crate::contract::BoundContract;
pub use crate::prelude::*;
pub use futures;
pub use serde_json as json;
pub use unionpay_common as common;
pub use unionpay_common::hash::topic_hash;
pub use unionpay_common::ContractDescriptor;
pub use web3;

pub mod prelude {
    //! A prelude module for importing commonly used types when interacting
    //! with contracts.

    pub use crate::contract::{Event, EventMetadata, EventStatus, RawLog, StreamEvent, Topic};
    pub use crate::log::watch::Subscription;
    pub use crate::node::TransactionStatus;
    pub use crate::secret::{Password, PrivateKey};
    pub use crate::transaction::{Account, GasPrice, TransactionHandle};
    pub use crate::unionpay::{BareUserPay, UnionPay, UserPay};
    pub use unionpay_common::TransactionHash;
    pub use web3::api::Web3;
    #[cfg(feature = "http")]
    pub use web3::transports::Http;
    pub use web3::types::{Address, BlockId, BlockNumber, TransactionCondition, H160, H256, U256};
}
