//! Typed queries and live subscriptions for the logs of one contract event.

mod data;

pub use self::data::{Event, EventMetadata, EventStatus, RawLog, StreamEvent};
use crate::errors::{EventError, ExecutionError};
use crate::log::watch::{self, Subscription};
use crate::log::LogFilterBuilder;
use crate::tokens::Tokenize;
use futures::stream::{self, Stream, StreamExt as _, TryStreamExt as _};
use std::cmp;
use std::marker::PhantomData;
use std::time::Duration;
use tokio::sync::mpsc;
pub use unionpay_common::abi::Topic;
use unionpay_common::abi::{Event as AbiEvent, RawTopicFilter, Token};
use unionpay_common::abiext::EventExt;
use unionpay_common::DeploymentInformation;
use web3::api::Web3;
use web3::types::{Address, BlockNumber, H256};
use web3::Transport;

/// A builder for querying or watching the logs of a single contract event,
/// decoded into `E`.
#[derive(Debug)]
#[must_use = "event builders do nothing unless you query or watch them"]
pub struct EventBuilder<T: Transport, E: Tokenize> {
    /// The event ABI data for encoding topic filters and decoding logs.
    event: AbiEvent,
    /// The log filter the event filters are applied to.
    pub filter: LogFilterBuilder<T>,
    /// The topic filters that are encoded based on the event ABI.
    pub topics: RawTopicFilter,
    /// When the contract was deployed. Paginated queries never start before
    /// the deployment block when this is set.
    pub deployment_information: Option<DeploymentInformation>,
    _event: PhantomData<E>,
}

impl<T: Transport, E: Tokenize> EventBuilder<T, E> {
    /// Creates a new event builder from a web3 provider and a contract event
    /// and address.
    pub fn new(web3: Web3<T>, event: AbiEvent, address: Address) -> Self {
        EventBuilder {
            event,
            filter: LogFilterBuilder::new(web3).address(vec![address]),
            topics: RawTopicFilter::default(),
            deployment_information: None,
            _event: PhantomData,
        }
    }

    /// Sets the deployment information of the emitting contract.
    pub fn with_deployment_info(mut self, value: Option<DeploymentInformation>) -> Self {
        self.deployment_information = value;
        self
    }

    /// The signature of the event, for example `Transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        self.event.abi_signature()
    }

    /// Sets the starting block from which to query logs.
    ///
    /// If left unset defaults to the latest block.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_block(mut self, block: BlockNumber) -> Self {
        self.filter = self.filter.from_block(block);
        self
    }

    /// Sets the last block from which to query logs.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_block(mut self, block: BlockNumber) -> Self {
        self.filter = self.filter.to_block(block);
        self
    }

    /// Adds a filter for the first indexed parameter.
    ///
    /// For named events this is `topic[1]` in the log since `topic[0]` is
    /// the event signature hash.
    pub fn topic0<P>(mut self, topic: Topic<P>) -> Self
    where
        P: Tokenize,
    {
        self.topics.topic0 = tokenize_topic(topic);
        self
    }

    /// Adds a filter for the second indexed parameter.
    pub fn topic1<P>(mut self, topic: Topic<P>) -> Self
    where
        P: Tokenize,
    {
        self.topics.topic1 = tokenize_topic(topic);
        self
    }

    /// Adds a filter for the third indexed parameter.
    pub fn topic2<P>(mut self, topic: Topic<P>) -> Self
    where
        P: Tokenize,
    {
        self.topics.topic2 = tokenize_topic(topic);
        self
    }

    /// The page size in blocks to use when doing a paginated query.
    pub fn block_page_size(mut self, value: u64) -> Self {
        self.filter = self.filter.block_page_size(value);
        self
    }

    /// The interval between consecutive `eth_getFilterChanges` calls when
    /// watching.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.filter = self.filter.poll_interval(value);
        self
    }

    /// Encodes the topic filters and returns the event together with the
    /// resulting log filter.
    pub fn into_inner(self) -> Result<(AbiEvent, LogFilterBuilder<T>), EventError> {
        let EventBuilder {
            event,
            mut filter,
            topics,
            ..
        } = self;

        filter.topics = event
            .filter(topics)
            .map_err(|err| EventError::new(&event, ExecutionError::Encoding(err)))?;

        Ok((event, filter))
    }

    /// Queries all existing logs matching the builder parameters with a
    /// single `eth_getLogs` request. Logs keep the order the node returned
    /// them in; logs outside a numeric block range are dropped.
    pub async fn query(self) -> Result<Vec<Event<E>>, EventError> {
        let (event, filter) = self.into_inner()?;
        let range = filter.block_range();
        filter
            .past_logs()
            .await
            .map_err(|err| EventError::new(&event, err))?
            .into_iter()
            .filter(|log| range.contains(log))
            .map(|log| {
                Event::from_past_log(log, |raw| raw.decode(&event))
                    .map_err(|err| EventError::new(&event, err))
            })
            .collect()
    }

    /// Queries existing logs in pages of `block_page_size` blocks. Pages are
    /// only requested as the returned stream is polled.
    ///
    /// If the deployment of the contract is known, the query starts no
    /// earlier than its block. Symbolic or inconsistent block ranges are
    /// forwarded to the node in a single request.
    pub async fn query_paginated(
        self,
    ) -> Result<impl Stream<Item = Result<Event<E>, EventError>>, EventError> {
        let deployment_information = self.deployment_information;
        let (event, filter) = self.into_inner()?;

        let deployment_block = match deployment_information {
            Some(DeploymentInformation::BlockNumber(block)) => Some(block),
            Some(DeploymentInformation::TransactionHash(hash)) => Some(
                block_number_from_transaction_hash(filter.web3(), hash)
                    .await
                    .map_err(|err| EventError::new(&event, err))?,
            ),
            None => None,
        };
        let filter = match (filter.from_block, deployment_block) {
            (Some(BlockNumber::Earliest), Some(deployment_block)) => {
                filter.from_block(deployment_block.into())
            }
            (Some(BlockNumber::Number(from_block)), Some(deployment_block)) => {
                let from_block = cmp::max(from_block.as_u64(), deployment_block);
                filter.from_block(from_block.into())
            }
            _ => filter,
        };

        let range = filter.block_range();
        let events = filter
            .past_logs_pages()
            .map_ok(move |logs| {
                stream::iter(logs.into_iter().filter(move |log| range.contains(log)))
                    .map(Ok::<_, ExecutionError>)
            })
            .try_flatten()
            .map(move |log| {
                log.and_then(|log| Event::from_past_log(log, |raw| raw.decode(&event)))
                    .map_err(|err| EventError::new(&event, err))
            });

        Ok(events)
    }
}

impl<T, E> EventBuilder<T, E>
where
    T: Transport + Send + Sync + 'static,
    T::Out: Send,
    E: Tokenize + Send + 'static,
{
    /// Starts watching for new events, forwarding each one into `sink` in the
    /// order the node reports them. Re-org removals are delivered as
    /// `EventStatus::Removed`.
    ///
    /// The watcher runs until the subscription is cancelled or dropped, the
    /// receiver is closed, or polling or decoding fails.
    pub fn watch(self, sink: mpsc::Sender<StreamEvent<E>>) -> Result<Subscription, EventError> {
        let (event, filter) = self.into_inner()?;
        let signature = event.abi_signature();

        Ok(watch::spawn(filter, signature, sink, move |log| {
            Event::from_streamed_log(log, |raw| raw.decode(&event))
        }))
    }
}

/// Converts a tokenizable topic into a raw topic for filtering.
fn tokenize_topic<P>(topic: Topic<P>) -> Topic<Token>
where
    P: Tokenize,
{
    topic.map(|parameter| parameter.into_token())
}

/// Retrieves the block number a transaction was mined in.
async fn block_number_from_transaction_hash<T: Transport>(
    web3: Web3<T>,
    tx_hash: H256,
) -> Result<u64, ExecutionError> {
    let tx_receipt = web3
        .eth()
        .transaction_receipt(tx_hash)
        .await?
        .ok_or(ExecutionError::MissingTransaction(tx_hash))?;
    Ok(tx_receipt
        .block_number
        .ok_or(ExecutionError::PendingTransaction(tx_hash))?
        .as_u64())
}
