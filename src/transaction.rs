//! Setting up, signing, estimating gas for and sending transactions.

mod build;
pub mod confirm;
pub mod gas_price;
mod send;

pub use self::build::Transaction;
use self::confirm::ConfirmParams;
use self::gas_price::GasPriceFields;
pub use self::gas_price::GasPrice;
pub use self::send::TransactionHandle;
use crate::errors::ExecutionError;
use crate::secret::{Password, PrivateKey};
use web3::api::Web3;
use web3::types::{Address, Bytes, CallRequest, TransactionCondition, U256};
use web3::Transport;

/// The account used for signing a transaction.
#[derive(Clone, Debug)]
pub enum Account {
    /// Let the node sign the transaction with an unlocked account.
    Local(Address, Option<TransactionCondition>),
    /// Let the node sign the transaction with a locked account and its
    /// password.
    Locked(Address, Password, Option<TransactionCondition>),
    /// Sign offline with a private key, optionally for a specific chain ID.
    /// Without a chain ID the node is asked for it.
    Offline(PrivateKey, Option<u64>),
}

impl Account {
    /// Returns the public address of an account.
    pub fn address(&self) -> Address {
        match self {
            Account::Local(address, _) => *address,
            Account::Locked(address, _, _) => *address,
            Account::Offline(key, _) => key.public_address(),
        }
    }
}

/// When sending a transaction is considered done.
#[derive(Clone, Debug, Default)]
pub enum ResolveCondition {
    /// Done as soon as the node accepted the transaction into its pool. No
    /// guarantee is made that it ever gets mined.
    #[default]
    Pending,
    /// Wait until the transaction is mined and confirmed by the configured
    /// number of blocks. The transaction must report a successful status.
    Confirmed(ConfirmParams),
}

/// Data used for building a transaction that modifies the blockchain. These
/// transactions can either be signed by the node or offline.
#[derive(Clone, Debug)]
#[must_use = "transactions do nothing unless you `.build()` or `.send()` them"]
pub struct TransactionBuilder<T: Transport> {
    web3: Web3<T>,
    /// The sender of the transaction with the signing strategy to use. Defaults
    /// to signing on the node with its first account.
    pub from: Option<Account>,
    /// The receiver of the transaction. `None` creates a contract.
    pub to: Option<Address>,
    /// Optional gas amount to use for transaction. Defaults to estimated gas.
    pub gas: Option<U256>,
    /// Optional gas price to use for transaction. Defaults to the node's gas
    /// price.
    pub gas_price: Option<GasPrice>,
    /// The ETH value to send with the transaction. Defaults to 0.
    pub value: Option<U256>,
    /// The data for the transaction. Defaults to empty data.
    pub data: Option<Bytes>,
    /// Optional nonce to use. Defaults to the signing account's current
    /// transaction count.
    pub nonce: Option<U256>,
    /// Optional resolve condition. Defaults to `ResolveCondition::Pending`.
    pub resolve: Option<ResolveCondition>,
}

impl<T: Transport> TransactionBuilder<T> {
    /// Creates a new builder for a transaction.
    pub fn new(web3: Web3<T>) -> Self {
        TransactionBuilder {
            web3,
            from: None,
            to: None,
            gas: None,
            gas_price: None,
            value: None,
            data: None,
            nonce: None,
            resolve: None,
        }
    }

    /// Specify the signing method to use for the transaction.
    pub fn from(mut self, value: Account) -> Self {
        self.from = Some(value);
        self
    }

    /// Specify the recipient of the transaction.
    pub fn to(mut self, value: Address) -> Self {
        self.to = Some(value);
        self
    }

    /// Specify amount of gas to use, if not specified then a gas estimate will
    /// be used.
    pub fn gas(mut self, value: U256) -> Self {
        self.gas = Some(value);
        self
    }

    /// Specify the gas price to use.
    pub fn gas_price(mut self, value: GasPrice) -> Self {
        self.gas_price = Some(value);
        self
    }

    /// Specify how much ETH to transfer with the transaction.
    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    /// Specify the data to use for the transaction.
    pub fn data(mut self, value: Bytes) -> Self {
        self.data = Some(value);
        self
    }

    /// Specify the nonce for the transaction, for example to replace a
    /// pending transaction.
    pub fn nonce(mut self, value: U256) -> Self {
        self.nonce = Some(value);
        self
    }

    /// Specify the resolve condition.
    pub fn resolve(mut self, value: ResolveCondition) -> Self {
        self.resolve = Some(value);
        self
    }

    /// Wait for the transaction to be mined and confirmed by `value` extra
    /// blocks when sending it.
    pub fn confirmations(mut self, value: usize) -> Self {
        self.resolve = match self.resolve {
            Some(ResolveCondition::Confirmed(params)) => {
                Some(ResolveCondition::Confirmed(params.confirmations(value)))
            }
            _ => Some(ResolveCondition::Confirmed(
                ConfirmParams::with_confirmations(value),
            )),
        };
        self
    }

    /// Estimate the gas required for this transaction.
    pub async fn estimate_gas(self) -> Result<U256, ExecutionError> {
        let from = self.from.map(|account| account.address());
        let call = GasPriceFields::from(self.gas_price).call(CallRequest {
            from,
            to: self.to,
            value: self.value,
            data: self.data,
            ..Default::default()
        });

        self.web3
            .eth()
            .estimate_gas(call, None)
            .await
            .map_err(From::from)
    }
}
