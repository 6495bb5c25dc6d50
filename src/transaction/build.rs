//! Finalizing a `TransactionBuilder` into either a request for the node to
//! sign or a raw signed transaction. Parameters that were left out are
//! queried from the node before signing offline.

use crate::errors::ExecutionError;
use crate::secret::{Password, PrivateKey};
use crate::transaction::gas_price::GasPriceFields;
use crate::transaction::{Account, TransactionBuilder};
use unionpay_common::hash;
use web3::api::Web3;
use web3::types::{
    Address, Bytes, CallRequest, TransactionCondition, TransactionParameters, TransactionRequest,
    H256, U256,
};
use web3::Transport;

impl<T: Transport> TransactionBuilder<T> {
    /// Build a prepared transaction that is ready to send.
    ///
    /// Resolves into a `TransactionRequest` for node signed transactions or
    /// into raw signed bytes for locked and offline accounts.
    pub async fn build(self) -> Result<Transaction, ExecutionError> {
        let options = TransactionOptions {
            to: self.to,
            gas: self.gas,
            gas_price: GasPriceFields::from(self.gas_price),
            value: self.value,
            data: self.data,
            nonce: self.nonce,
        };

        let tx = match self.from {
            None => Transaction::Request(
                build_transaction_request_for_local_signing(self.web3, None, options, None)
                    .await?,
            ),
            Some(Account::Local(from, condition)) => Transaction::Request(
                build_transaction_request_for_local_signing(
                    self.web3,
                    Some(from),
                    options,
                    condition,
                )
                .await?,
            ),
            Some(Account::Locked(from, password, condition)) => {
                build_transaction_signed_with_locked_account(
                    self.web3, from, password, options, condition,
                )
                .await?
            }
            Some(Account::Offline(key, chain_id)) => {
                build_offline_signed_transaction(self.web3, key, chain_id, options).await?
            }
        };

        Ok(tx)
    }
}

/// A prepared and optionally signed transaction that is ready for sending.
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Transaction {
    /// A structured transaction request to be signed by the node.
    Request(TransactionRequest),
    /// A signed raw transaction together with its hash.
    Raw {
        /// The signed RLP encoded transaction.
        bytes: Bytes,
        /// The transaction hash, known before the transaction is sent.
        hash: H256,
    },
}

impl Transaction {
    /// Unwraps the transaction into a transaction request, returning None if the
    /// transaction is a raw transaction.
    pub fn request(self) -> Option<TransactionRequest> {
        match self {
            Transaction::Request(tx) => Some(tx),
            _ => None,
        }
    }

    /// Unwraps the transaction into its raw bytes, returning None if it is a
    /// transaction request.
    pub fn raw(self) -> Option<Bytes> {
        match self {
            Transaction::Raw { bytes, .. } => Some(bytes),
            _ => None,
        }
    }
}

/// Transaction parameters shared by every signing strategy.
#[derive(Clone, Debug, Default)]
struct TransactionOptions {
    to: Option<Address>,
    gas: Option<U256>,
    gas_price: GasPriceFields,
    value: Option<U256>,
    data: Option<Bytes>,
    nonce: Option<U256>,
}

impl TransactionOptions {
    /// Builds a node signed `TransactionRequest`.
    fn into_request(
        self,
        from: Address,
        condition: Option<TransactionCondition>,
    ) -> TransactionRequest {
        self.gas_price.request(TransactionRequest {
            from,
            to: self.to,
            gas: self.gas,
            value: self.value,
            data: self.data,
            nonce: self.nonce,
            condition,
            ..Default::default()
        })
    }
}

/// Build a transaction request to be signed by the node before sending.
async fn build_transaction_request_for_local_signing<T: Transport>(
    web3: Web3<T>,
    from: Option<Address>,
    options: TransactionOptions,
    condition: Option<TransactionCondition>,
) -> Result<TransactionRequest, ExecutionError> {
    let from = match from {
        Some(address) => address,
        None => *web3
            .eth()
            .accounts()
            .await?
            .first()
            .ok_or(ExecutionError::NoLocalAccounts)?,
    };

    Ok(options.into_request(from, condition))
}

/// Build a transaction signed by the node with a locked account.
async fn build_transaction_signed_with_locked_account<T: Transport>(
    web3: Web3<T>,
    from: Address,
    password: Password,
    options: TransactionOptions,
    condition: Option<TransactionCondition>,
) -> Result<Transaction, ExecutionError> {
    let request = options.into_request(from, condition);
    let signed = web3.personal().sign_transaction(request, &password).await?;
    let hash = H256(hash::keccak256(&signed.raw.0));

    Ok(Transaction::Raw {
        bytes: signed.raw,
        hash,
    })
}

/// Build an offline signed transaction.
///
/// All parameters must be final before signing, so a missing gas limit is
/// estimated here and missing nonce, gas price and chain ID are queried from
/// the node while signing.
async fn build_offline_signed_transaction<T: Transport>(
    web3: Web3<T>,
    key: PrivateKey,
    chain_id: Option<u64>,
    options: TransactionOptions,
) -> Result<Transaction, ExecutionError> {
    let gas = match options.gas {
        Some(value) => value,
        None => {
            web3.eth()
                .estimate_gas(
                    options.gas_price.call(CallRequest {
                        from: Some(key.public_address()),
                        to: options.to,
                        value: options.value,
                        data: options.data.clone(),
                        ..Default::default()
                    }),
                    None,
                )
                .await?
        }
    };

    let signed = web3
        .accounts()
        .sign_transaction(
            options.gas_price.parameters(TransactionParameters {
                nonce: options.nonce,
                gas,
                to: options.to,
                value: options.value.unwrap_or_default(),
                data: options.data.unwrap_or_default(),
                chain_id,
                ..Default::default()
            }),
            &key,
        )
        .await?;

    Ok(Transaction::Raw {
        bytes: signed.raw_transaction,
        hash: signed.transaction_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::prelude::*;
    use crate::transaction::GasPrice;

    #[test]
    fn tx_build_local() {
        let transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        let from = addr!("0x9876543210987654321098765432109876543210");

        let tx = build_transaction_request_for_local_signing(
            web3,
            Some(from),
            TransactionOptions::default(),
            None,
        )
        .immediate()
        .expect("failed to build local transaction");

        transport.assert_no_more_requests();
        assert_eq!(tx.from, from);
        assert_eq!(tx.gas_price, None);
    }

    #[test]
    fn tx_build_local_default_account() {
        let mut transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        let accounts = [
            addr!("0x9876543210987654321098765432109876543210"),
            addr!("0x1111111111111111111111111111111111111111"),
        ];

        transport.add_response(json!(accounts)); // get accounts
        let tx = build_transaction_request_for_local_signing(
            web3,
            None,
            TransactionOptions::default(),
            None,
        )
        .immediate()
        .expect("failed to build local transaction");

        transport.assert_request("eth_accounts", &[]);
        transport.assert_no_more_requests();

        assert_eq!(tx.from, accounts[0]);
    }

    #[test]
    fn tx_build_local_eip1559_gas_price() {
        let transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        let from = addr!("0xffffffffffffffffffffffffffffffffffffffff");
        let tx = TransactionBuilder::new(web3)
            .from(Account::Local(from, None))
            .gas_price(GasPrice::Eip1559 {
                max_fee_per_gas: 100.into(),
                max_priority_fee_per_gas: 2.into(),
            })
            .build()
            .immediate()
            .expect("failed to build local transaction")
            .request()
            .expect("local transactions build into requests");

        transport.assert_no_more_requests();
        assert_eq!(tx.gas_price, None);
        assert_eq!(tx.max_fee_per_gas, Some(100.into()));
        assert_eq!(tx.max_priority_fee_per_gas, Some(2.into()));
        assert_eq!(tx.transaction_type, Some(2.into()));
    }

    #[test]
    fn tx_build_local_no_local_accounts() {
        let mut transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        transport.add_response(json!([])); // get accounts
        let err = build_transaction_request_for_local_signing(
            web3,
            None,
            TransactionOptions::default(),
            None,
        )
        .immediate()
        .expect_err("unexpected success building transaction");

        transport.assert_request("eth_accounts", &[]);
        transport.assert_no_more_requests();

        assert!(
            matches!(err, ExecutionError::NoLocalAccounts),
            "expected no local accounts error but got '{:?}'",
            err
        );
    }

    #[test]
    fn tx_build_locked() {
        let mut transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        let from = addr!("0x9876543210987654321098765432109876543210");
        let pw = "foobar";
        let to = addr!("0x0000000000000000000000000000000000000000");
        let signed = bytes!("0x0123456789"); // doesn't have to be valid, we don't check

        transport.add_response(json!({
            "raw": signed,
            "tx": {
                "hash": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "nonce": "0x0",
                "from": from,
                "value": "0x0",
                "gas": "0x0",
                "gasPrice": "0x0",
                "input": "0x",
            }
        })); // sign transaction
        let tx = TransactionBuilder::new(web3)
            .from(Account::Locked(from, pw.into(), None))
            .to(to)
            .build()
            .immediate()
            .expect("failed to build locked transaction");

        transport.assert_request(
            "personal_signTransaction",
            &[
                json!({
                    "from": from,
                    "to": to,
                }),
                json!(pw),
            ],
        );
        transport.assert_no_more_requests();

        assert_eq!(
            tx,
            Transaction::Raw {
                hash: H256(hash::keccak256(&signed.0)),
                bytes: signed,
            }
        );
    }

    #[test]
    fn tx_build_offline() {
        let mut transport = TestTransport::new();
        let web3 = Web3::new(transport.clone());

        let key = key!("0x0102030405060708091011121314151617181920212223242526272829303132");
        let from = key.public_address();
        let to = addr!("0x0000000000000000000000000000000000000000");

        let gas = U256::from(0x9a5);
        let gas_price = U256::from(0x1ce);
        let nonce = U256::from(0x42);
        let chain_id = 77777;

        transport.add_response(json!(gas));
        transport.add_response(json!(nonce));
        transport.add_response(json!(gas_price));
        transport.add_response(json!(format!("{:#x}", chain_id)));

        let tx1 = TransactionBuilder::new(web3.clone())
            .from(Account::Offline(key.clone(), None))
            .to(to)
            .build()
            .immediate()
            .expect("failed to build offline transaction");

        transport.assert_request(
            "eth_estimateGas",
            &[json!({
                "from": from,
                "to": to,
            })],
        );
        transport.assert_request("eth_getTransactionCount", &[json!(from), json!("latest")]);
        transport.assert_request("eth_gasPrice", &[]);
        transport.assert_request("eth_chainId", &[]);
        transport.assert_no_more_requests();

        let tx2 = TransactionBuilder::new(web3)
            .from(Account::Offline(key, Some(chain_id)))
            .to(to)
            .gas(gas)
            .gas_price(gas_price.into())
            .nonce(nonce)
            .build()
            .immediate()
            .expect("failed to build offline transaction");

        // no more requests are sent when everything is specified
        transport.assert_no_more_requests();

        assert_eq!(tx1, tx2);
    }
}
