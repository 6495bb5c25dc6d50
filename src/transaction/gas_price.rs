//! Gas price settings and how they land in the different request shapes
//! sent to the node.

use web3::types::{
    CallRequest, Transaction, TransactionParameters, TransactionRequest, U256, U64,
};

/// The gas price setting to use.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GasPrice {
    /// Legacy transaction with a single gas price.
    Legacy(U256),

    /// EIP-1559 transaction.
    Eip1559 {
        /// Maximum gas price willing to pay for the transaction.
        max_fee_per_gas: U256,
        /// Priority fee paid to the block producer.
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    /// The gas price a mined or pending transaction was sent with. Fee
    /// market fields win over the legacy price, which nodes also fill in
    /// for EIP-1559 transactions.
    pub fn of_transaction(tx: &Transaction) -> Option<Self> {
        match (tx.max_fee_per_gas, tx.max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => Some(GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }),
            _ => tx.gas_price.map(GasPrice::Legacy),
        }
    }
}

impl From<U256> for GasPrice {
    fn from(value: U256) -> Self {
        GasPrice::Legacy(value)
    }
}

impl From<(U256, U256)> for GasPrice {
    fn from((max_fee_per_gas, max_priority_fee_per_gas): (U256, U256)) -> Self {
        GasPrice::Eip1559 {
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }
}

/// The gas price related fields shared by calls, node signed requests and
/// offline signed parameters. An unset gas price leaves all of them empty so
/// the node picks its own.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct GasPriceFields {
    gas_price: Option<U256>,
    max_fee_per_gas: Option<U256>,
    max_priority_fee_per_gas: Option<U256>,
    transaction_type: Option<U64>,
}

impl From<Option<GasPrice>> for GasPriceFields {
    fn from(gas_price: Option<GasPrice>) -> Self {
        match gas_price {
            None => GasPriceFields::default(),
            Some(GasPrice::Legacy(value)) => GasPriceFields {
                gas_price: Some(value),
                ..Default::default()
            },
            Some(GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }) => GasPriceFields {
                max_fee_per_gas: Some(max_fee_per_gas),
                max_priority_fee_per_gas: Some(max_priority_fee_per_gas),
                transaction_type: Some(2.into()),
                ..Default::default()
            },
        }
    }
}

impl GasPriceFields {
    pub(crate) fn call(self, call: CallRequest) -> CallRequest {
        CallRequest {
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            transaction_type: self.transaction_type,
            ..call
        }
    }

    pub(crate) fn request(self, request: TransactionRequest) -> TransactionRequest {
        TransactionRequest {
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            transaction_type: self.transaction_type,
            ..request
        }
    }

    pub(crate) fn parameters(self, parameters: TransactionParameters) -> TransactionParameters {
        TransactionParameters {
            gas_price: self.gas_price,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            transaction_type: self.transaction_type,
            ..parameters
        }
    }
}
