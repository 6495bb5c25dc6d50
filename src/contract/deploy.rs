//! Deploying new contracts and creating bound instances for them.

use crate::errors::{DeployError, ExecutionError};
use crate::tokens::Tokenize;
use crate::transaction::{Account, GasPrice, TransactionBuilder, TransactionHandle};
use std::marker::PhantomData;
use tracing::debug;
use unionpay_common::abi::{Error as AbiError, Token};
use unionpay_common::{Abi, Bytecode};
use web3::api::Web3;
use web3::types::{Address, Bytes, H256, U256};
use web3::Transport;

/// A factory trait for deployable contract instances. It provides the data
/// needed to build a deployment and creates an instance once the contract
/// is mined.
pub trait Deploy<T: Transport>: Sized {
    /// The data the instance is created from, usually a contract descriptor.
    type Context;

    /// Gets a reference to the contract bytecode.
    fn bytecode(cx: &Self::Context) -> &Bytecode;

    /// Gets a reference the contract ABI.
    fn abi(cx: &Self::Context) -> &Abi;

    /// Create a contract instance from the specified deployment.
    fn from_deployment(
        web3: Web3<T>,
        address: Address,
        transaction_hash: H256,
        cx: Self::Context,
    ) -> Self;
}

/// Builder for specifying options for deploying a contract.
#[derive(Debug, Clone)]
#[must_use = "deploy builders do nothing unless you `.deploy()` them"]
pub struct DeployBuilder<T, I>
where
    T: Transport,
    I: Deploy<T>,
{
    web3: Web3<T>,
    context: I::Context,
    tx: TransactionBuilder<T>,
    _instance: PhantomData<I>,
}

impl<T, I> DeployBuilder<T, I>
where
    T: Transport,
    I: Deploy<T>,
{
    /// Create a new deploy builder from a `web3` provider, contract data and
    /// constructor parameters. The deployment data is encoded here so
    /// argument mismatches fail before anything is sent.
    pub fn new<P>(web3: Web3<T>, context: I::Context, params: P) -> Result<Self, DeployError>
    where
        P: Tokenize,
    {
        let bytecode = I::bytecode(&context);
        if bytecode.is_empty() {
            return Err(DeployError::EmptyBytecode);
        }

        let code = bytecode.to_bytes();
        let params = match params.into_token() {
            Token::Tuple(tokens) => tokens,
            token => vec![token],
        };
        let data = match (I::abi(&context).constructor(), params.is_empty()) {
            (None, false) => return Err(AbiError::InvalidData.into()),
            (None, true) => code,
            (Some(ctor), _) => Bytes(ctor.encode_input(code.0, &params)?),
        };

        Ok(DeployBuilder {
            web3: web3.clone(),
            context,
            tx: TransactionBuilder::new(web3).data(data).confirmations(0),
            _instance: PhantomData,
        })
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

    /// Specify the number of confirmations to wait for after the deployment
    /// is mined. Defaults to none.
    pub fn confirmations(mut self, value: usize) -> Self {
        self.tx = self.tx.confirmations(value);
        self
    }

    /// Extract inner `TransactionBuilder` from this `DeployBuilder`. This
    /// exposes `TransactionBuilder` only APIs.
    pub fn into_inner(self) -> TransactionBuilder<T> {
        self.tx
    }

    /// Sign (if required) and send the deployment, then wait for it to be
    /// mined. Returns the new contract address, the mined transaction and
    /// an instance bound to the address.
    pub async fn deploy(self) -> Result<(Address, TransactionHandle, I), DeployError> {
        let handle = self.tx.send().await?;
        let receipt = match &handle {
            TransactionHandle::Receipt(receipt) => receipt,
            TransactionHandle::Hash(hash) => {
                return Err(ExecutionError::PendingTransaction(*hash).into())
            }
        };

        let transaction_hash = receipt.transaction_hash;
        let address = receipt
            .contract_address
            .ok_or_else(|| ExecutionError::Failure(Box::new(receipt.clone())))?;
        debug!(?address, ?transaction_hash, "deployed contract");

        let instance = I::from_deployment(self.web3, address, transaction_hash, self.context);
        Ok((address, handle, instance))
    }
}
