//! Decoded event data and the log metadata that comes with it.

use crate::errors::ExecutionError;
use crate::tokens::Tokenize;
use unionpay_common::abi::{Event as AbiEvent, RawLog as AbiRawLog, Token};
use web3::types::{Log, H160, H256};

/// A contract event
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event<T> {
    /// The decoded log data.
    pub data: T,
    /// The additional metadata for the event. Not available for pending
    /// logs.
    pub meta: Option<EventMetadata>,
}

/// A contract event delivered by a watcher.
///
/// The event may either be added (a new block was mined) or removed (its
/// block was dropped by a re-org).
pub type StreamEvent<T> = Event<EventStatus<T>>;

/// A contract event that was either added or removed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EventStatus<T> {
    /// A new event was received.
    Added(T),
    /// A previously mined event was removed as a result of a re-org.
    Removed(T),
}

impl<T> Event<T> {
    /// Creates an event from a past log. Removed logs are errors since a
    /// query result should only contain final logs.
    pub(crate) fn from_past_log<E, F>(log: Log, f: F) -> Result<Self, ExecutionError>
    where
        F: FnOnce(RawLog) -> Result<T, E>,
        ExecutionError: From<E>,
    {
        if log.removed == Some(true) {
            return Err(ExecutionError::RemovedLog(Box::new(log)));
        }

        let meta = EventMetadata::from_log(&log);
        let raw = RawLog::from(log);
        let data = f(raw)?;

        Ok(Event { data, meta })
    }
}

impl<T> Event<EventStatus<T>> {
    /// Creates an event from a log reported by a filter.
    pub(crate) fn from_streamed_log<E, F>(log: Log, f: F) -> Result<Self, ExecutionError>
    where
        F: FnOnce(RawLog) -> Result<T, E>,
        ExecutionError: From<E>,
    {
        let removed = log.removed == Some(true);
        let meta = EventMetadata::from_log(&log);
        let raw = RawLog::from(log);
        let inner_data = f(raw)?;

        let data = if removed {
            EventStatus::Removed(inner_data)
        } else {
            EventStatus::Added(inner_data)
        };

        Ok(Event { data, meta })
    }

    /// Get a reference the underlying event data regardless of whether the
    /// event was added or removed.
    pub fn inner_data(&self) -> &T {
        match &self.data {
            EventStatus::Added(value) => value,
            EventStatus::Removed(value) => value,
        }
    }

    /// Gets a bool representing if the event was added.
    pub fn is_added(&self) -> bool {
        matches!(&self.data, EventStatus::Added(_))
    }

    /// Gets a bool representing if the event was removed.
    pub fn is_removed(&self) -> bool {
        matches!(&self.data, EventStatus::Removed(_))
    }

    /// Get the underlying event data if the event was added, `None` otherwise.
    pub fn added(self) -> Option<T> {
        match self.data {
            EventStatus::Added(value) => Some(value),
            EventStatus::Removed(_) => None,
        }
    }

    /// Get the underlying event data if the event was removed, `None`
    /// otherwise.
    pub fn removed(self) -> Option<T> {
        match self.data {
            EventStatus::Removed(value) => Some(value),
            EventStatus::Added(_) => None,
        }
    }
}

/// Additional metadata from the log for the event.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EventMetadata {
    /// The contract that emitted the event.
    pub address: H160,
    /// The hash of the block where the log was produced.
    pub block_hash: H256,
    /// The number of the block where the log was produced.
    pub block_number: u64,
    /// The hash of the transaction this log belongs to.
    pub transaction_hash: H256,
    /// The block index of the transaction this log belongs to.
    pub transaction_index: usize,
    /// The index of the log in the block.
    pub log_index: usize,
    /// The raw log topics, starting with the event signature hash for
    /// non-anonymous events.
    pub topics: Vec<H256>,
}

impl EventMetadata {
    fn from_log(log: &Log) -> Option<Self> {
        Some(EventMetadata {
            address: log.address,
            block_hash: log.block_hash?,
            block_number: log.block_number?.as_u64(),
            transaction_hash: log.transaction_hash?,
            transaction_index: log.transaction_index?.as_usize(),
            log_index: log.log_index?.as_usize(),
            topics: log.topics.clone(),
        })
    }
}

/// Raw log topics and data for a contract event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawLog {
    /// The raw 32-byte topics.
    pub topics: Vec<H256>,
    /// The raw non-indexed data attached to an event.
    pub data: Vec<u8>,
}

impl RawLog {
    /// Decode raw log data for a matching event ABI entry. The event
    /// parameters, indexed or not, are passed to `D` as one tuple in
    /// declaration order.
    pub fn decode<D>(self, event: &AbiEvent) -> Result<D, ExecutionError>
    where
        D: Tokenize,
    {
        let event_log = event.parse_log(AbiRawLog {
            topics: self.topics,
            data: self.data,
        })?;

        let tokens = event_log
            .params
            .into_iter()
            .map(|param| param.value)
            .collect::<Vec<_>>();
        let data = D::from_token(Token::Tuple(tokens))?;

        Ok(data)
    }
}

impl From<Log> for RawLog {
    fn from(log: Log) -> Self {
        RawLog {
            topics: log.topics,
            data: log.data.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unionpay_common::abi::{EventParam, ParamType};
    use web3::types::{Address, U256};

    fn transfer() -> AbiEvent {
        AbiEvent {
            name: "Transfer".to_owned(),
            inputs: vec![
                EventParam {
                    name: "from".to_owned(),
                    kind: ParamType::Address,
                    indexed: true,
                },
                EventParam {
                    name: "amount".to_owned(),
                    kind: ParamType::Uint(256),
                    indexed: false,
                },
            ],
            anonymous: false,
        }
    }

    fn log(removed: bool) -> Log {
        serde_json::from_value(serde_json::json!({
            "address": Address::repeat_byte(1),
            "topics": [
                transfer().signature(),
                H256::from(Address::repeat_byte(0xf0)),
            ],
            "data": H256::from_low_u64_be(42),
            "blockHash": H256::repeat_byte(2),
            "blockNumber": "0x7",
            "transactionHash": H256::repeat_byte(3),
            "transactionIndex": "0x1",
            "logIndex": "0x4",
            "removed": removed,
        }))
        .unwrap()
    }

    #[test]
    fn past_log_metadata() {
        let event = Event::<(Address, U256)>::from_past_log(log(false), |raw| {
            raw.decode(&transfer())
        })
        .unwrap();

        assert_eq!(event.data, (Address::repeat_byte(0xf0), U256::from(42)));
        assert_eq!(
            event.meta,
            Some(EventMetadata {
                address: Address::repeat_byte(1),
                block_hash: H256::repeat_byte(2),
                block_number: 7,
                transaction_hash: H256::repeat_byte(3),
                transaction_index: 1,
                log_index: 4,
                topics: vec![
                    transfer().signature(),
                    H256::from(Address::repeat_byte(0xf0)),
                ],
            })
        );
    }

    #[test]
    fn streamed_typed_event_keeps_topics() {
        let event = Event::<EventStatus<(Address, U256)>>::from_streamed_log(log(false), |raw| {
            raw.decode(&transfer())
        })
        .unwrap();

        assert!(event.is_added());
        let meta = event.meta.as_ref().expect("mined log has metadata");
        assert_eq!(meta.topics[0], transfer().signature());
        assert_eq!(meta.topics[1], H256::from(Address::repeat_byte(0xf0)));
        assert_eq!(
            event.added(),
            Some((Address::repeat_byte(0xf0), U256::from(42)))
        );
    }

    #[test]
    fn pending_log_has_no_metadata() {
        let mut pending = log(false);
        pending.block_number = None;
        let event = Event::<RawLog>::from_past_log(pending, Ok::<_, ExecutionError>).unwrap();
        assert_eq!(event.meta, None);
    }

    #[test]
    fn removed_logs() {
        assert!(matches!(
            Event::<RawLog>::from_past_log(log(true), Ok::<_, ExecutionError>),
            Err(ExecutionError::RemovedLog(_))
        ));

        let event = Event::<EventStatus<RawLog>>::from_streamed_log(log(true), |raw| {
            Ok::<_, ExecutionError>(raw)
        })
        .unwrap();
        assert!(event.is_removed());
        assert_eq!(event.removed().map(|raw| raw.topics.len()), Some(2));
    }

    #[test]
    fn decode_signature_mismatch() {
        let mut other = log(false);
        other.topics[0] = H256::repeat_byte(0xff);
        let raw = RawLog::from(other);
        assert!(matches!(
            raw.decode::<(Address, U256)>(&transfer()),
            Err(ExecutionError::AbiDecode(_))
        ));
    }
}
