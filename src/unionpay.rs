//! Typed binding for the UnionPay payment contract.
//!
//! Payers send ETH either with `plainPay` (or a bare transfer to the
//! fallback function) or with `safePay`, which carries a receipt signed by
//! the platform account. The contract forwards the payment minus the
//! platform fee to the payee and records used receipts. The owner can move
//! the collected fees to the platform account.

use crate::contract::{BoundContract, Deploy, DeployBuilder, EventBuilder, MethodBuilder};
use crate::errors::{DeployError, DescriptorError, EventError, MethodError};
use crate::tokens::{Error as TokenizationError, Tokenize};
use unionpay_common::abi::Token;
use unionpay_common::{Abi, Bytecode, ContractDescriptor};
use web3::api::Web3;
use web3::types::{Address, H256, U256};
use web3::Transport;

const ARTIFACT: &str = include_str!("../contracts/UnionPay.json");

/// A UnionPay contract deployed at a known address.
#[derive(Debug, Clone)]
pub struct UnionPay<T: Transport> {
    contract: BoundContract<T>,
}

impl<T: Transport> UnionPay<T> {
    /// Parses the bundled UnionPay artifact.
    pub fn artifact() -> Result<ContractDescriptor, DescriptorError> {
        ContractDescriptor::from_json(ARTIFACT)
    }

    /// Binds the contract described by `descriptor` at `address`.
    pub fn at(web3: Web3<T>, descriptor: &ContractDescriptor, address: Address) -> Self {
        UnionPay {
            contract: BoundContract::at(web3, descriptor.abi.clone(), address),
        }
    }

    /// Wraps an already bound contract.
    pub fn from_contract(contract: BoundContract<T>) -> Self {
        UnionPay { contract }
    }

    /// Creates a deployment builder. The constructor takes no arguments and
    /// makes the deploying account both owner and platform.
    pub fn builder(
        web3: Web3<T>,
        descriptor: ContractDescriptor,
    ) -> Result<DeployBuilder<T, Self>, DeployError> {
        DeployBuilder::new(web3, descriptor, ())
    }

    /// The address of the contract.
    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// The underlying ABI bound contract, for calls without a typed wrapper.
    pub fn contract(&self) -> &BoundContract<T> {
        &self.contract
    }

    /// Mutable access to the underlying contract, to change its method
    /// defaults.
    pub fn contract_mut(&mut self) -> &mut BoundContract<T> {
        &mut self.contract
    }

    /// Returns true if the receipt `trans_id` from `from` to `to` was already
    /// used for a `safePay`.
    pub async fn receipt_used(
        &self,
        from: Address,
        to: Address,
        trans_id: U256,
    ) -> Result<bool, MethodError> {
        self.contract.call("receiptUsed", (from, to, trans_id)).await
    }

    /// The ETH balance held by the contract, which is the fees not yet
    /// withdrawn.
    pub async fn get_balance(&self) -> Result<U256, MethodError> {
        self.contract.call("getBalance", ()).await
    }

    /// The platform account that signs receipts and receives fees.
    pub async fn platform(&self) -> Result<Address, MethodError> {
        self.contract.call("platform", ()).await
    }

    /// The contract owner.
    pub async fn owner(&self) -> Result<Address, MethodError> {
        self.contract.call("owner", ()).await
    }

    /// Pays `to` with a platform signed receipt. The payment is the
    /// transaction value, set with `.value(..)`; `fee_percentage` of it (0 to
    /// 100) stays with the contract.
    pub fn safe_pay(
        &self,
        trans_id: U256,
        fee_percentage: U256,
        to: Address,
        sig: Vec<u8>,
    ) -> Result<MethodBuilder<T, bool>, MethodError> {
        self.contract
            .method("safePay", (trans_id, fee_percentage, to, sig))
    }

    /// Pays the contract without a receipt. The payment is the transaction
    /// value.
    pub fn plain_pay(&self) -> Result<MethodBuilder<T, bool>, MethodError> {
        self.contract.method("plainPay", ())
    }

    /// Moves the contract balance to the platform account. Owner only.
    pub fn withdraw(&self) -> Result<MethodBuilder<T, ()>, MethodError> {
        self.contract.method("withdraw", ())
    }

    /// Replaces the platform account. Owner only.
    pub fn set_platform(&self, checker: Address) -> Result<MethodBuilder<T, ()>, MethodError> {
        self.contract.method("setPlatform", (checker,))
    }

    /// Hands the contract to a new owner. Owner only.
    pub fn transfer_ownership(
        &self,
        new_owner: Address,
    ) -> Result<MethodBuilder<T, ()>, MethodError> {
        self.contract.method("transferOwnership", (new_owner,))
    }

    /// A bare payment through the fallback function, logged as
    /// `BareUserPay` together with `data`.
    pub fn fallback<D>(&self, data: D) -> Result<MethodBuilder<T, ()>, MethodError>
    where
        D: Into<Vec<u8>>,
    {
        self.contract.fallback(data)
    }

    /// Payments made with `safePay` or `plainPay`.
    pub fn user_pay(&self) -> Result<EventBuilder<T, UserPay>, EventError> {
        self.contract.event("UserPay")
    }

    /// Payments made through the fallback function.
    pub fn bare_user_pay(&self) -> Result<EventBuilder<T, BareUserPay>, EventError> {
        self.contract.event("BareUserPay")
    }
}

impl<T: Transport> Deploy<T> for UnionPay<T> {
    type Context = ContractDescriptor;

    fn abi(cx: &Self::Context) -> &Abi {
        &cx.abi
    }

    fn bytecode(cx: &Self::Context) -> &Bytecode {
        &cx.bytecode
    }

    fn from_deployment(
        web3: Web3<T>,
        address: Address,
        transaction_hash: H256,
        cx: Self::Context,
    ) -> Self {
        UnionPay::from_contract(BoundContract::from_deployment(
            web3,
            address,
            transaction_hash,
            cx,
        ))
    }
}

/// A `UserPay` event.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserPay {
    /// The payer.
    pub from: Address,
    /// The payee.
    pub to: Address,
    /// The value sent by the payer.
    pub amount: U256,
    /// The value forwarded to the payee after the fee.
    pub amount_indeed: U256,
    /// The receipt identifier, zero for plain payments.
    pub trans_id: U256,
}

impl Tokenize for UserPay {
    fn from_token(token: Token) -> Result<Self, TokenizationError> {
        let (from, to, amount, amount_indeed, trans_id) = Tokenize::from_token(token)?;
        Ok(UserPay {
            from,
            to,
            amount,
            amount_indeed,
            trans_id,
        })
    }

    fn into_token(self) -> Token {
        (
            self.from,
            self.to,
            self.amount,
            self.amount_indeed,
            self.trans_id,
        )
            .into_token()
    }
}

/// A `BareUserPay` event.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BareUserPay {
    /// The payer.
    pub from: Address,
    /// The value sent.
    pub amount: U256,
    /// The call data of the transfer.
    pub data: Vec<u8>,
}

impl Tokenize for BareUserPay {
    fn from_token(token: Token) -> Result<Self, TokenizationError> {
        let (from, amount, data) = Tokenize::from_token(token)?;
        Ok(BareUserPay { from, amount, data })
    }

    fn into_token(self) -> Token {
        (self.from, self.amount, self.data).into_token()
    }
}
