//! This module implements extensions to the `ethabi` API.

use crate::hash::{self, H32};
use ethabi::{Event, Function, ParamType};
use web3::types::H256;

/// Extension trait for `ethabi::Function`.
pub trait FunctionExt {
    /// Compute the method signature in the standard ABI format. This does not
    /// include the output types.
    fn abi_signature(&self) -> String;

    /// Compute the Keccak256 function selector used by contract ABIs.
    fn selector(&self) -> H32;
}

impl FunctionExt for Function {
    fn abi_signature(&self) -> String {
        format_signature(&self.name, self.inputs.iter().map(|input| &input.kind))
    }

    fn selector(&self) -> H32 {
        hash::function_selector(self.abi_signature())
    }
}

/// Extension trait for `ethabi::Event`.
pub trait EventExt {
    /// Compute the event signature in human-readable format. The `keccak256`
    /// hash of this value is the actual event signature that is used as topic0
    /// for non-anonymous events.
    fn abi_signature(&self) -> String;

    /// Compute the topic hash of the event.
    fn topic(&self) -> H256;
}

impl EventExt for Event {
    fn abi_signature(&self) -> String {
        format_signature(&self.name, self.inputs.iter().map(|input| &input.kind))
    }

    fn topic(&self) -> H256 {
        hash::topic_hash(self.abi_signature())
    }
}

fn format_signature<'a>(name: &str, kinds: impl Iterator<Item = &'a ParamType>) -> String {
    format!(
        "{}({})",
        name,
        kinds
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_function_signature() {
        for (f, expected) in &[
            (
                r#"{"name":"foo","inputs":[],"outputs":[],"stateMutability":"view"}"#,
                "foo()",
            ),
            (
                r#"{"name":"bar","inputs":[{"name":"a","type":"uint256"},{"name":"b","type":"bool"}],"outputs":[],"stateMutability":"nonpayable"}"#,
                "bar(uint256,bool)",
            ),
        ] {
            let function: Function = serde_json::from_str(f).expect("invalid function JSON");
            let signature = function.abi_signature();
            assert_eq!(signature, *expected);
        }
    }

    #[test]
    fn event_signature_matches_ethabi_topic() {
        let event: Event = serde_json::from_str(
            r#"{
                "name": "BareUserPay",
                "anonymous": false,
                "inputs": [
                    {"indexed": false, "name": "from", "type": "address"},
                    {"indexed": false, "name": "amount", "type": "uint256"},
                    {"indexed": false, "name": "data", "type": "bytes"}
                ]
            }"#,
        )
        .expect("invalid event JSON");

        assert_eq!(event.abi_signature(), "BareUserPay(address,uint256,bytes)");
        assert_eq!(event.topic(), event.signature());
    }
}
