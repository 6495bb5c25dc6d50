//! Log filter builders for querying past logs and watching new ones.

pub mod watch;

use crate::errors::ExecutionError;
use futures::future;
use futures::stream::{self, Stream, TryStreamExt};
use std::num::NonZeroU64;
use std::time::Duration;
use unionpay_common::abi::{Topic, TopicFilter};
use web3::api::Web3;
use web3::types::{Address, BlockNumber, Filter, FilterBuilder, Log, H256};
use web3::Transport;

/// The default poll interval to use for polling logs from the block chain.
#[cfg(not(test))]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// The default poll interval to use for polling logs from the block chain.
#[cfg(test)]
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(0);

/// The default block page size used for querying past events.
pub const DEFAULT_BLOCK_PAGE_SIZE: u64 = 10_000;

/// A log filter builder for configuring either a query for past logs or a
/// watcher that polls for new ones.
#[derive(Debug)]
#[must_use = "log filter builders do nothing unless you query or watch them"]
pub struct LogFilterBuilder<T: Transport> {
    web3: Web3<T>,
    /// The first block to retrieve logs from, inclusive.
    pub from_block: Option<BlockNumber>,
    /// The last block to retrieve logs from, inclusive.
    pub to_block: Option<BlockNumber>,
    /// The contract addresses to filter logs for.
    pub address: Vec<Address>,
    /// Topic filters used for filtering logs based on indexed topics.
    pub topics: TopicFilter,
    /// The page size in blocks to use when doing a paginated query on past
    /// logs. Limits the block range of each request, not the number of logs.
    pub block_page_size: Option<NonZeroU64>,
    /// The polling interval for querying the node for more logs.
    pub poll_interval: Option<Duration>,
}

impl<T: Transport> LogFilterBuilder<T> {
    /// Creates a new log filter builder from the specified web3 provider.
    pub fn new(web3: Web3<T>) -> Self {
        LogFilterBuilder {
            web3,
            from_block: None,
            to_block: None,
            address: Vec::new(),
            topics: TopicFilter::default(),
            block_page_size: None,
            poll_interval: None,
        }
    }

    /// The web3 provider logs are retrieved with.
    pub fn web3(&self) -> Web3<T> {
        self.web3.clone()
    }

    /// Sets the first block to retrieve logs from.
    ///
    /// If left unset defaults to the latest block.
    #[allow(clippy::wrong_self_convention)]
    pub fn from_block(mut self, block: BlockNumber) -> Self {
        self.from_block = Some(block);
        self
    }

    /// Sets the last block to retrieve logs from.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_block(mut self, block: BlockNumber) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Only retrieve logs emitted by one of the given addresses.
    pub fn address(mut self, address: Vec<Address>) -> Self {
        self.address = address;
        self
    }

    /// Adds a filter for the first topic. For non-anonymous events this is
    /// the event signature hash.
    pub fn topic0(mut self, topic: Topic<H256>) -> Self {
        self.topics.topic0 = topic;
        self
    }

    /// Adds a filter for the second topic.
    pub fn topic1(mut self, topic: Topic<H256>) -> Self {
        self.topics.topic1 = topic;
        self
    }

    /// Adds a filter for the third topic.
    pub fn topic2(mut self, topic: Topic<H256>) -> Self {
        self.topics.topic2 = topic;
        self
    }

    /// Adds a filter for the fourth topic.
    pub fn topic3(mut self, topic: Topic<H256>) -> Self {
        self.topics.topic3 = topic;
        self
    }

    /// The page size in blocks to use when doing a paginated query on past
    /// events.
    ///
    /// # Panics
    ///
    /// Panics if a block page size of 0 is specified.
    pub fn block_page_size(mut self, value: u64) -> Self {
        self.block_page_size = Some(NonZeroU64::new(value).expect("block page size cannot be 0"));
        self
    }

    /// The interval between consecutive `eth_getFilterChanges` calls when
    /// watching logs.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = Some(value);
        self
    }

    /// Returns a web3 filter builder needed for querying and watching logs.
    pub fn into_filter(self) -> FilterBuilder {
        let mut filter = FilterBuilder::default();
        if let Some(from_block) = self.from_block {
            filter = filter.from_block(from_block);
        }
        if let Some(to_block) = self.to_block {
            filter = filter.to_block(to_block);
        }
        if !self.address.is_empty() {
            filter = filter.address(self.address);
        }
        if self.topics != TopicFilter::default() {
            filter = filter.topics(
                topic_to_option(self.topics.topic0),
                topic_to_option(self.topics.topic1),
                topic_to_option(self.topics.topic2),
                topic_to_option(self.topics.topic3),
            );
        }

        filter
    }

    /// The numeric block bounds of this filter.
    pub fn block_range(&self) -> BlockRange {
        BlockRange {
            from: numeric_block(self.from_block),
            to: numeric_block(self.to_block),
        }
    }

    /// Performs a single `eth_getLogs` query for past logs. For large block
    /// ranges use `past_logs_pages` instead.
    pub async fn past_logs(self) -> Result<Vec<Log>, ExecutionError> {
        let web3 = self.web3.clone();
        let filter = self.into_filter();
        let logs = web3.eth().logs(filter.build()).await?;

        Ok(logs)
    }

    /// Returns a stream of non-empty pages of past logs, each page covering
    /// at most `block_page_size` blocks. Pages are requested lazily.
    pub fn past_logs_pages(self) -> impl Stream<Item = Result<Vec<Log>, ExecutionError>> {
        stream::try_unfold(PastLogsStream::Init(self), PastLogsStream::next)
            .try_filter(|logs| future::ready(!logs.is_empty()))
    }
}

/// Inclusive numeric block bounds of a log filter. Symbolic bounds such as
/// `latest` are left open since only the node can resolve them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockRange {
    /// The first block, inclusive.
    pub from: Option<u64>,
    /// The last block, inclusive.
    pub to: Option<u64>,
}

impl BlockRange {
    /// Returns true if the log was mined within the bounds. Logs without a
    /// block number are outside any bounded range.
    pub fn contains(&self, log: &Log) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        match log.block_number {
            Some(block) => {
                let block = block.as_u64();
                self.from.map_or(true, |from| block >= from)
                    && self.to.map_or(true, |to| block <= to)
            }
            None => false,
        }
    }
}

/// Converts a `Topic` to an equivalent `Option<Vec<T>>`, suitable for `FilterBuilder::topics`
fn topic_to_option(topic: Topic<H256>) -> Option<Vec<H256>> {
    match topic {
        Topic::Any => None,
        Topic::OneOf(v) => Some(v),
        Topic::This(t) => Some(vec![t]),
    }
}

fn numeric_block(block: Option<BlockNumber>) -> Option<u64> {
    match block? {
        BlockNumber::Earliest => Some(0),
        BlockNumber::Number(value) => Some(value.as_u64()),
        _ => None,
    }
}

/// Unfold state of the `past_logs_pages` stream.
enum PastLogsStream<T: Transport> {
    Init(LogFilterBuilder<T>),
    Done,
    Paging(PastLogsPager<T>),
    Querying(Web3<T>, Filter),
}

impl<T: Transport> PastLogsStream<T> {
    async fn next(mut self) -> Result<Option<(Vec<Log>, Self)>, ExecutionError> {
        loop {
            let (logs, next) = match self {
                PastLogsStream::Init(builder) => {
                    self = PastLogsStream::init(builder).await?;
                    continue;
                }
                PastLogsStream::Done => return Ok(None),
                PastLogsStream::Paging(mut pager) => {
                    let logs = match pager.next_page().await? {
                        Some(logs) => logs,
                        None => return Ok(None),
                    };
                    (logs, PastLogsStream::Paging(pager))
                }
                PastLogsStream::Querying(web3, filter) => {
                    let logs = web3.eth().logs(filter).await?;
                    (logs, PastLogsStream::Done)
                }
            };
            return Ok(Some((logs, next)));
        }
    }

    async fn init(builder: LogFilterBuilder<T>) -> Result<Self, ExecutionError> {
        let from_block = builder.from_block.unwrap_or(BlockNumber::Latest);
        let to_block = builder.to_block.unwrap_or(BlockNumber::Latest);

        let web3 = builder.web3.clone();
        let block_page_size = builder
            .block_page_size
            .map(|size| size.get())
            .unwrap_or(DEFAULT_BLOCK_PAGE_SIZE);
        let filter = builder.into_filter();

        let start_block = numeric_block(Some(from_block));
        let end_block = match to_block {
            BlockNumber::Number(value) => Some(value.as_u64()),
            BlockNumber::Latest | BlockNumber::Pending => {
                let latest_block = web3.eth().block_number().await?;
                Some(latest_block.as_u64())
            }
            _ => None,
        };

        let next = match (start_block, end_block) {
            (Some(page_block), Some(end_block)) => PastLogsStream::Paging(PastLogsPager {
                web3,
                to_block,
                block_page_size,
                filter,
                page_block: Some(page_block),
                end_block,
            }),
            _ => PastLogsStream::Querying(web3, filter.build()),
        };

        Ok(next)
    }
}

/// Internal state for paging though past logs.
struct PastLogsPager<T: Transport> {
    web3: Web3<T>,
    /// The `to_block` of the builder, used for the last page.
    to_block: BlockNumber,
    block_page_size: u64,
    filter: FilterBuilder,
    /// The first block of the next page, `None` once the last block of the
    /// chain was paged.
    page_block: Option<u64>,
    /// The concrete last block, resolved when paging started.
    end_block: u64,
}

impl<T: Transport> PastLogsPager<T> {
    async fn next_page(&mut self) -> Result<Option<Vec<Log>>, ExecutionError> {
        while let Some(page_block) = self.page_block.filter(|block| *block <= self.end_block) {
            // block ranges are inclusive
            let page_end = page_block.saturating_add(self.block_page_size.saturating_sub(1));
            let page_to_block = if page_end < self.end_block {
                BlockNumber::Number(page_end.into())
            } else {
                // `to_block` may be `latest` which could have moved since
                // paging started.
                self.to_block
            };

            let page = self
                .web3
                .eth()
                .logs(
                    self.filter
                        .clone()
                        .from_block(page_block.into())
                        .to_block(page_to_block)
                        .build(),
                )
                .await?;

            self.page_block = page_end.checked_add(1);
            if page.is_empty() {
                continue;
            }

            return Ok(Some(page));
        }

        Ok(None)
    }
}
