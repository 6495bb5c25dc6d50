//! Builders for contract method calls and method transactions. These are
//! normally created through [`BoundContract::method`](super::BoundContract::method).

use crate::errors::MethodError;
use crate::tokens::Tokenize;
use crate::transaction::gas_price::GasPriceFields;
use crate::transaction::{Account, GasPrice, TransactionBuilder, TransactionHandle};
use std::marker::PhantomData;
use unionpay_common::abi::{Function, StateMutability, Token};
use web3::api::Web3;
use web3::types::{Address, BlockId, Bytes, CallRequest, U256};
use web3::Transport;

/// Default options to be applied to `MethodBuilder` or `ViewMethodBuilder`.
#[derive(Clone, Debug, Default)]
pub struct MethodDefaults {
    /// Default sender of the transaction with the signing strategy to use.
    pub from: Option<Account>,
    /// Default gas amount to use for transaction.
    pub gas: Option<U256>,
    /// Default gas price to use for transaction.
    pub gas_price: Option<GasPrice>,
}

/// Data used for building a contract method call or transaction. The method
/// builder can be demoted into a `ViewMethodBuilder` to not allow sending of
/// transactions.
#[derive(Debug, Clone)]
#[must_use = "methods do nothing unless you `.call()` or `.send()` them"]
pub struct MethodBuilder<T: Transport, R: Tokenize> {
    web3: Web3<T>,
    function: Function,
    /// transaction parameters
    pub tx: TransactionBuilder<T>,
    _result: PhantomData<R>,
}

impl<T: Transport> MethodBuilder<T, ()> {
    /// Creates a new builder for a transaction invoking the fallback method.
    pub fn fallback(web3: Web3<T>, address: Address, data: Bytes) -> Self {
        // only used for error messages
        #[allow(deprecated)]
        let function = Function {
            name: "fallback".into(),
            inputs: vec![],
            outputs: vec![],
            constant: None,
            state_mutability: StateMutability::Payable,
        };
        MethodBuilder::new(web3, function, address, data)
    }
}

impl<T: Transport, R: Tokenize> MethodBuilder<T, R> {
    /// Creates a new builder for a transaction.
    pub fn new(web3: Web3<T>, function: Function, address: Address, data: Bytes) -> Self {
        MethodBuilder {
            web3: web3.clone(),
            function,
            tx: TransactionBuilder::new(web3).to(address).data(data),
            _result: PhantomData,
        }
    }

    /// Apply method defaults to this builder.
    pub fn with_defaults(mut self, defaults: &MethodDefaults) -> Self {
        self.tx.from = self.tx.from.or_else(|| defaults.from.clone());
        self.tx.gas = self.tx.gas.or(defaults.gas);
        self.tx.gas_price = self.tx.gas_price.or(defaults.gas_price);
        self
    }

    /// The ABI function this builder invokes.
    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Specify the signing method to use for the transaction, if not specified
    /// the the transaction will be signed by the node with its first account.
    pub fn from(mut self, value: Account) -> Self {
        self.tx = self.tx.from(value);
        self
    }

    /// Specify amount of gas to use, if not specified then a gas estimate will
    /// be used.
    pub fn gas(mut self, value: U256) -> Self {
        self.tx = self.tx.gas(value);
        self
    }

    /// Specify the gas price to use, if not specified then the node's gas
    /// price will be used.
    pub fn gas_price(mut self, value: GasPrice) -> Self {
        self.tx = self.tx.gas_price(value);
        self
    }

    /// Specify how much ETH to transfer with the transaction, if not
    /// specified then no ETH will be sent.
    pub fn value(mut self, value: U256) -> Self {
        self.tx = self.tx.value(value);
        self
    }

    /// Specify the nonce for the transation, if not specified will use the
    /// current transaction count for the signing account.
    pub fn nonce(mut self, value: U256) -> Self {
        self.tx = self.tx.nonce(value);
        self
    }

    /// Wait for the transaction to be mined and then for `value` extra blocks
    /// when sending. Without this, sending returns once the node accepted
    /// the transaction.
    pub fn confirmations(mut self, value: usize) -> Self {
        self.tx = self.tx.confirmations(value);
        self
    }

    /// Extract inner `TransactionBuilder` from this `MethodBuilder`. This
    /// exposes `TransactionBuilder` only APIs such as `estimate_gas`.
    pub fn into_inner(self) -> TransactionBuilder<T> {
        self.tx
    }

    /// Sign (if required) and send the method call transaction.
    pub async fn send(self) -> Result<TransactionHandle, MethodError> {
        let Self { function, tx, .. } = self;
        tx.send()
            .await
            .map_err(|err| MethodError::new(&function, err))
    }

    /// Demotes a `MethodBuilder` into a `ViewMethodBuilder` which has a more
    /// restricted API and cannot actually send transactions.
    pub fn view(self) -> ViewMethodBuilder<T, R> {
        ViewMethodBuilder::from_method(self)
    }

    /// Call a contract method at the latest block. Contract calls do not
    /// modify the blockchain and as such do not require gas or signing.
    pub async fn call(self) -> Result<R, MethodError> {
        self.view().call().await
    }
}

/// Data used for building a contract method call. The view method builder
/// can't directly send transactions and is for read only method calls.
#[derive(Debug, Clone)]
#[must_use = "view methods do nothing unless you `.call()` them"]
pub struct ViewMethodBuilder<T: Transport, R: Tokenize> {
    /// method parameters
    pub m: MethodBuilder<T, R>,
    /// optional block number
    pub block: Option<BlockId>,
}

impl<T: Transport, R: Tokenize> ViewMethodBuilder<T, R> {
    /// Create a new `ViewMethodBuilder` by demoting a `MethodBuilder`.
    pub fn from_method(method: MethodBuilder<T, R>) -> Self {
        ViewMethodBuilder {
            m: method,
            block: None,
        }
    }

    /// Apply method defaults to this builder.
    pub fn with_defaults(mut self, defaults: &MethodDefaults) -> Self {
        self.m = self.m.with_defaults(defaults);
        self
    }

    /// Specify the account the call is being made from.
    pub fn from(mut self, value: Address) -> Self {
        self.m = self.m.from(Account::Local(value, None));
        self
    }

    /// Specify amount of gas to use.
    pub fn gas(mut self, value: U256) -> Self {
        self.m = self.m.gas(value);
        self
    }

    /// Specify the gas price to use.
    pub fn gas_price(mut self, value: GasPrice) -> Self {
        self.m = self.m.gas_price(value);
        self
    }

    /// Specify how much ETH the call pretends to transfer.
    pub fn value(mut self, value: U256) -> Self {
        self.m = self.m.value(value);
        self
    }

    /// Specify the block to evaluate the call at. Defaults to the latest
    /// block.
    pub fn block(mut self, value: BlockId) -> Self {
        self.block = Some(value);
        self
    }

    /// Call a contract method. Contract calls do not modify the blockchain and
    /// as such do not require gas or signing.
    pub async fn call(self) -> Result<R, MethodError> {
        let eth = self.m.web3.eth();
        let (function, call, block) = self.decompose();
        let bytes = eth
            .call(call, block)
            .await
            .map_err(|err| MethodError::new(&function, err))?;
        decode_output(&function, &bytes.0)
    }

    fn decompose(self) -> (Function, CallRequest, Option<BlockId>) {
        let tx = self.m.tx;
        let call = GasPriceFields::from(tx.gas_price).call(CallRequest {
            from: tx.from.map(|account| account.address()),
            to: Some(tx.to.unwrap_or_default()),
            gas: tx.gas,
            value: tx.value,
            data: tx.data,
            ..Default::default()
        });

        (self.m.function, call, self.block)
    }
}

/// Decodes call output into `R`: no outputs become an empty tuple, a single
/// output is returned as is and several outputs become a tuple.
fn decode_output<R: Tokenize>(function: &Function, bytes: &[u8]) -> Result<R, MethodError> {
    let mut tokens = function
        .decode_output(bytes)
        .map_err(|err| MethodError::new(function, err))?;
    let token = match tokens.len() {
        1 => tokens.remove(0),
        _ => Token::Tuple(tokens),
    };
    R::from_token(token).map_err(|err| MethodError::new(function, err))
}
