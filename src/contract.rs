//! ABI driven proxy for a deployed contract. Calls, transactions and event
//! queries are dispatched by name from the parsed ABI, so any contract can be
//! used without generated code.

mod deploy;
mod event;
mod method;

use crate::errors::{DeployError, EventError, ExecutionError, MethodError};
use crate::tokens::Tokenize;
use std::collections::BTreeMap;
use unionpay_common::abi::{Error as AbiError, Event as AbiEvent, Function, Token};
use unionpay_common::abiext::{EventExt, FunctionExt};
use unionpay_common::{Abi, ContractDescriptor, DeploymentInformation};
use web3::api::Web3;
use web3::types::{Address, Bytes, H256};
use web3::Transport;

pub use self::deploy::{Deploy, DeployBuilder};
pub use self::event::{
    Event, EventBuilder, EventMetadata, EventStatus, RawLog, StreamEvent, Topic,
};
pub use self::method::{MethodBuilder, MethodDefaults, ViewMethodBuilder};

/// A contract ABI bound to an address and a node.
///
/// Binding is purely local: nothing checks that the code at the address
/// matches the ABI, mismatches surface as decoding errors.
#[derive(Debug, Clone)]
pub struct BoundContract<T: Transport> {
    web3: Web3<T>,
    abi: Abi,
    address: Address,
    deployment_information: Option<DeploymentInformation>,
    /// Default method parameters to use when sending method transactions or
    /// querying method calls.
    pub defaults: MethodDefaults,
}

impl<T: Transport> BoundContract<T> {
    /// Binds `abi` to the contract at `address`.
    pub fn at(web3: Web3<T>, abi: Abi, address: Address) -> Self {
        BoundContract::with_deployment_info(web3, abi, address, None)
    }

    /// Binds `abi` to the contract at `address` and records when it was
    /// deployed, which lets paginated event queries skip earlier blocks.
    pub fn with_deployment_info(
        web3: Web3<T>,
        abi: Abi,
        address: Address,
        deployment_information: Option<DeploymentInformation>,
    ) -> Self {
        BoundContract {
            web3,
            abi,
            address,
            deployment_information,
            defaults: MethodDefaults::default(),
        }
    }

    /// Creates a deployment builder for the contract described by
    /// `descriptor`, with the constructor arguments `params`.
    pub fn builder<P>(
        web3: Web3<T>,
        descriptor: ContractDescriptor,
        params: P,
    ) -> Result<DeployBuilder<T, Self>, DeployError>
    where
        P: Tokenize,
    {
        DeployBuilder::new(web3, descriptor, params)
    }

    /// Retrieve the underlying web3 provider used by this contract.
    pub fn web3(&self) -> Web3<T> {
        self.web3.clone()
    }

    /// Retrieves the contract ABI.
    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Returns the contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns when the contract was deployed, if known.
    pub fn deployment_information(&self) -> Option<DeploymentInformation> {
        self.deployment_information
    }

    /// Looks up a function by plain name or by full signature such as
    /// `transfer(address,uint256)`. Overloaded names are disambiguated by
    /// `arg_count`.
    pub fn function(&self, name: &str, arg_count: Option<usize>) -> Result<&Function, AbiError> {
        resolve(
            &self.abi.functions,
            name,
            arg_count,
            FunctionExt::abi_signature,
            |function| function.inputs.len(),
        )
        .ok_or_else(|| AbiError::InvalidName(name.to_owned()))
    }

    /// Looks up an event by plain name or by full signature.
    pub fn abi_event(&self, name: &str) -> Result<&AbiEvent, AbiError> {
        resolve(
            &self.abi.events,
            name,
            None,
            EventExt::abi_signature,
            |event| event.inputs.len(),
        )
        .ok_or_else(|| AbiError::InvalidName(name.to_owned()))
    }

    /// Returns a method builder for a call or transaction to the named
    /// method. The arguments are checked against the ABI and encoded here,
    /// so a mismatch fails before anything is sent to the node.
    pub fn method<P, R>(&self, name: &str, params: P) -> Result<MethodBuilder<T, R>, MethodError>
    where
        P: Tokenize,
        R: Tokenize,
    {
        let tokens = into_tokens(params);
        let function = self
            .function(name, Some(tokens.len()))
            .map_err(|err| MethodError::encoding(name.to_owned(), err))?;
        let data = function
            .encode_input(&tokens)
            .map_err(|err| MethodError::encoding(function.abi_signature(), err))?;

        Ok(
            MethodBuilder::new(self.web3(), function.clone(), self.address, Bytes(data))
                .with_defaults(&self.defaults),
        )
    }

    /// Returns a builder for a read only call to the named method.
    pub fn view_method<P, R>(
        &self,
        name: &str,
        params: P,
    ) -> Result<ViewMethodBuilder<T, R>, MethodError>
    where
        P: Tokenize,
        R: Tokenize,
    {
        Ok(self.method(name, params)?.view())
    }

    /// Calls the named method at the latest block and decodes its output.
    pub async fn call<P, R>(&self, name: &str, params: P) -> Result<R, MethodError>
    where
        P: Tokenize,
        R: Tokenize,
    {
        self.view_method(name, params)?.call().await
    }

    /// Returns a method builder for a transaction to the fallback function.
    /// Fails if the ABI does not declare one.
    pub fn fallback<D>(&self, data: D) -> Result<MethodBuilder<T, ()>, MethodError>
    where
        D: Into<Vec<u8>>,
    {
        if !self.abi.fallback {
            return Err(MethodError::encoding(
                "fallback()".to_owned(),
                AbiError::InvalidName("fallback".into()),
            ));
        }

        Ok(
            MethodBuilder::fallback(self.web3(), self.address, Bytes(data.into()))
                .with_defaults(&self.defaults),
        )
    }

    /// Returns a builder for querying or watching the named event.
    pub fn event<E>(&self, name: &str) -> Result<EventBuilder<T, E>, EventError>
    where
        E: Tokenize,
    {
        let event = self.abi_event(name).map_err(|err| {
            EventError::from_parts(name.to_owned(), ExecutionError::Encoding(err))
        })?;

        Ok(EventBuilder::new(self.web3(), event.clone(), self.address())
            .with_deployment_info(self.deployment_information))
    }
}

impl<T: Transport> Deploy<T> for BoundContract<T> {
    type Context = ContractDescriptor;

    fn abi(cx: &Self::Context) -> &Abi {
        &cx.abi
    }

    fn bytecode(cx: &Self::Context) -> &unionpay_common::Bytecode {
        &cx.bytecode
    }

    fn from_deployment(
        web3: Web3<T>,
        address: Address,
        transaction_hash: H256,
        cx: Self::Context,
    ) -> Self {
        BoundContract::with_deployment_info(
            web3,
            cx.abi,
            address,
            Some(DeploymentInformation::TransactionHash(transaction_hash)),
        )
    }
}

/// Splits tokenized arguments into one token per ABI parameter.
fn into_tokens<P: Tokenize>(params: P) -> Vec<Token> {
    match params.into_token() {
        Token::Tuple(tokens) => tokens,
        token => vec![token],
    }
}

/// Finds an ABI item by full signature, or by name when it is unique or
/// when exactly one overload takes `arg_count` parameters.
fn resolve<'a, I, S, A>(
    items: &'a BTreeMap<String, Vec<I>>,
    name: &str,
    arg_count: Option<usize>,
    signature: S,
    arity: A,
) -> Option<&'a I>
where
    S: Fn(&I) -> String,
    A: Fn(&I) -> usize,
{
    if name.contains('(') {
        let wanted = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>();
        return items.values().flatten().find(|item| signature(item) == wanted);
    }

    match items.get(name)?.as_slice() {
        [single] => Some(single),
        overloads => {
            let mut candidates = overloads
                .iter()
                .filter(|item| Some(arity(item)) == arg_count);
            match (candidates.next(), candidates.next()) {
                (Some(item), None) => Some(item),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test::prelude::*;
    use web3::types::U256;

    const ABI: &str = r#"[
        {"type":"function","name":"balanceOf","stateMutability":"view","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}]},
        {"type":"function","name":"pair","stateMutability":"view","inputs":[],"outputs":[{"name":"","type":"bool"},{"name":"","type":"string"}]},
        {"type":"function","name":"poke","stateMutability":"nonpayable","inputs":[],"outputs":[]},
        {"type":"function","name":"pay","stateMutability":"payable","inputs":[{"name":"to","type":"address"}],"outputs":[]},
        {"type":"function","name":"pay","stateMutability":"payable","inputs":[{"name":"to","type":"address"},{"name":"memo","type":"bytes"}],"outputs":[]},
        {"type":"event","name":"Paid","anonymous":false,"inputs":[{"name":"to","type":"address","indexed":true},{"name":"amount","type":"uint256","indexed":false}]},
        {"type":"fallback","stateMutability":"payable"}
    ]"#;

    const ADDRESS: &str = "0x47F00aA355a5ACbBA5f5DF765255e2033A4CD354";

    fn contract(transport: &TestTransport) -> BoundContract<TestTransport> {
        let abi = serde_json::from_str(ABI).unwrap();
        BoundContract::at(
            Web3::new(transport.clone()),
            abi,
            addr!("0x0123456789012345678901234567890123456789"),
        )
    }

    #[test]
    fn resolves_functions_by_name_and_signature() {
        let contract = contract(&TestTransport::new());

        assert_eq!(contract.function("balanceOf", None).unwrap().inputs.len(), 1);
        assert_eq!(contract.function("pay", Some(1)).unwrap().inputs.len(), 1);
        assert_eq!(contract.function("pay", Some(2)).unwrap().inputs.len(), 2);
        assert_eq!(
            contract
                .function("pay(address, bytes)", None)
                .unwrap()
                .inputs
                .len(),
            2
        );
        assert!(contract.function("pay", None).is_err());
        assert!(contract.function("pay", Some(3)).is_err());
        assert!(contract.function("missing", None).is_err());
        assert!(contract.abi_event("Paid(address,uint256)").is_ok());
        assert!(contract.abi_event("Paid(uint256)").is_err());
    }

    #[test]
    fn call_left_pads_address_argument() {
        let mut transport = TestTransport::new();
        let contract = contract(&transport);

        transport.add_response(json!(
            "0x000000000000000000000000000000000000000000000000000000000000002a"
        ));
        let balance: U256 = contract
            .call("balanceOf", (addr!(ADDRESS),))
            .immediate()
            .expect("call failed");

        assert_eq!(balance, 42.into());
        transport.assert_request(
            "eth_call",
            &[
                json!({
                    "to": contract.address(),
                    "data": "0x70a08231\
                             00000000000000000000000047f00aa355a5acbba5f5df765255e2033a4cd354",
                }),
                json!("latest"),
            ],
        );
        transport.assert_no_more_requests();
    }

    #[test]
    fn call_with_untyped_tokens() {
        let mut transport = TestTransport::new();
        let contract = contract(&transport);

        transport.add_response(json!(
            "0x000000000000000000000000000000000000000000000000000000000000002a"
        ));
        let balance: Token = contract
            .call("balanceOf", Token::Address(addr!(ADDRESS)))
            .immediate()
            .expect("call failed");

        assert_eq!(balance, Token::Uint(42.into()));
        transport.assert_request_method("eth_call");
        transport.assert_no_more_requests();
    }

    #[test]
    fn output_shapes() {
        let mut transport = TestTransport::new();
        let contract = contract(&transport);

        transport.add_response(json!(format!(
            "0x{}{}{}{}",
            "0000000000000000000000000000000000000000000000000000000000000001",
            "0000000000000000000000000000000000000000000000000000000000000040",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "6869000000000000000000000000000000000000000000000000000000000000",
        )));
        let pair: (bool, String) = contract.call("pair", ()).immediate().unwrap();
        assert_eq!(pair, (true, "hi".to_owned()));

        transport.add_response(json!("0x"));
        let () = contract.call("poke", ()).immediate().unwrap();
    }

    #[test]
    fn arity_mismatch_is_an_encoding_error_without_requests() {
        let transport = TestTransport::new();
        let contract = contract(&transport);

        let err = contract
            .method::<_, U256>("balanceOf", (addr!(ADDRESS), U256::one()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert_eq!(err.signature, "balanceOf(address)");

        let err = contract
            .method::<_, U256>("balanceOf", (U256::one(),))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let err = contract
            .call::<_, U256>("missing", ())
            .immediate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        transport.assert_no_more_requests();
    }

    #[test]
    fn output_mismatch_is_a_decoding_error() {
        let mut transport = TestTransport::new();
        let contract = contract(&transport);

        transport.add_response(json!("0x0102"));
        let err = contract
            .call::<_, U256>("balanceOf", (addr!(ADDRESS),))
            .immediate()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[test]
    fn send_uses_resolved_overload() {
        let mut transport = TestTransport::new();
        let contract = contract(&transport);
        let from = addr!("0x9876543210987654321098765432109876543210");
        let hash = H256::repeat_byte(0x42);

        transport.add_response(json!(hash));
        let tx = contract
            .method::<_, ()>("pay", (addr!(ADDRESS), vec![0xcau8, 0xfe]))
            .unwrap()
            .from(crate::transaction::Account::Local(from, None))
            .value(7.into())
            .gas(50_000.into())
            .send()
            .immediate()
            .expect("send failed");

        assert_eq!(tx.hash(), hash);
        let data = contract
            .function("pay", Some(2))
            .unwrap()
            .encode_input(&[Token::Address(addr!(ADDRESS)), Token::Bytes(vec![0xca, 0xfe])])
            .unwrap();
        transport.assert_request(
            "eth_sendTransaction",
            &[json!({
                "from": from,
                "to": contract.address(),
                "gas": "0xc350",
                "value": "0x7",
                "data": Bytes(data),
            })],
        );
        transport.assert_no_more_requests();
    }

    #[test]
    fn fallback_requires_abi_entry() {
        let transport = TestTransport::new();
        let contract = contract(&transport);
        assert!(contract.fallback(vec![1u8, 2, 3]).is_ok());

        let mut abi = contract.abi().clone();
        abi.fallback = false;
        let contract = BoundContract::at(contract.web3(), abi, contract.address());
        assert_eq!(
            contract.fallback(Vec::new()).unwrap_err().kind(),
            ErrorKind::Encoding
        );
    }

    #[test]
    fn unknown_event_is_an_error() {
        let contract = contract(&TestTransport::new());
        let err = contract.event::<Token>("Missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
