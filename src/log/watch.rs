//! Watching new logs with a node side filter.
//!
//! A single task owns the filter: it installs it, polls
//! `eth_getFilterChanges` and forwards decoded logs to a channel until it is
//! told to quit, the receiving end goes away or an error occurs. Whatever
//! the reason, the filter is uninstalled once before the task ends.

use crate::errors::{EventError, ExecutionError};
use crate::log::{LogFilterBuilder, DEFAULT_POLL_INTERVAL};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use web3::api::{BaseFilter, Web3};
use web3::types::{Filter, Log};
use web3::Transport;

/// A handle to a running log watcher.
///
/// Dropping the subscription stops the watcher without waiting for it.
#[derive(Debug)]
#[must_use = "dropping a subscription stops it immediately"]
pub struct Subscription {
    signature: String,
    quit: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), ExecutionError>>,
}

impl Subscription {
    /// Stops the watcher and waits for it to uninstall its filter. Events
    /// that were not yet delivered are discarded.
    ///
    /// Returns the error that ended the watcher, if it already failed.
    pub async fn unsubscribe(mut self) -> Result<(), EventError> {
        self.signal_quit();
        self.join().await
    }

    /// Waits for the watcher to end on its own, which happens when the
    /// receiver is dropped or when polling or decoding fails.
    pub async fn closed(mut self) -> Result<(), EventError> {
        self.join().await
    }

    /// Returns true if the watcher task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn signal_quit(&mut self) {
        if let Some(quit) = self.quit.take() {
            // the task may already be gone
            let _ = quit.send(());
        }
    }

    async fn join(&mut self) -> Result<(), EventError> {
        let result = match (&mut self.handle).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(ExecutionError::StreamClosed),
        };
        result.map_err(|err| EventError::from_parts(self.signature.clone(), err))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.signal_quit();
    }
}

/// Spawns a task watching logs matching `builder` and forwarding them,
/// decoded by `decode`, into `sink`.
pub(crate) fn spawn<T, E, F>(
    builder: LogFilterBuilder<T>,
    signature: String,
    sink: mpsc::Sender<E>,
    decode: F,
) -> Subscription
where
    T: Transport + Send + Sync + 'static,
    T::Out: Send,
    E: Send + 'static,
    F: FnMut(Log) -> Result<E, ExecutionError> + Send + 'static,
{
    let web3 = builder.web3.clone();
    let poll_interval = builder.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL);
    let filter = builder.into_filter().build();
    let (quit, quit_rx) = oneshot::channel();

    let task_signature = signature.clone();
    let handle = tokio::spawn(async move {
        let result = watch(web3, filter, poll_interval, sink, decode, quit_rx).await;
        match &result {
            Ok(()) => debug!(event = %task_signature, "log watcher stopped"),
            Err(err) => warn!(event = %task_signature, %err, "log watcher failed"),
        }
        result
    });

    Subscription {
        signature,
        quit: Some(quit),
        handle,
    }
}

async fn watch<T, E, F>(
    web3: Web3<T>,
    filter: Filter,
    poll_interval: Duration,
    sink: mpsc::Sender<E>,
    mut decode: F,
    mut quit: oneshot::Receiver<()>,
) -> Result<(), ExecutionError>
where
    T: Transport,
    F: FnMut(Log) -> Result<E, ExecutionError>,
{
    let filter = web3.eth_filter().create_logs_filter(filter).await?;
    debug!("installed log filter");

    let result = forward(&filter, poll_interval, &sink, &mut decode, &mut quit).await;
    let uninstalled = filter.uninstall().await;
    debug!(?uninstalled, "uninstalled log filter");

    match (result, uninstalled) {
        (Err(err), _) => Err(err),
        (Ok(()), Err(err)) => Err(err.into()),
        (Ok(()), Ok(_)) => Ok(()),
    }
}

async fn forward<T, E, F>(
    filter: &BaseFilter<T, Log>,
    poll_interval: Duration,
    sink: &mpsc::Sender<E>,
    decode: &mut F,
    quit: &mut oneshot::Receiver<()>,
) -> Result<(), ExecutionError>
where
    T: Transport,
    F: FnMut(Log) -> Result<E, ExecutionError>,
{
    loop {
        let logs = tokio::select! {
            biased;
            _ = &mut *quit => return Ok(()),
            logs = filter.poll() => logs?.unwrap_or_default(),
        };
        for log in logs {
            let event = decode(log)?;
            tokio::select! {
                biased;
                _ = &mut *quit => return Ok(()),
                sent = sink.send(event) => {
                    if sent.is_err() {
                        return Err(ExecutionError::StreamClosed);
                    }
                }
            }
        }

        tokio::select! {
            biased;
            _ = &mut *quit => return Ok(()),
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
}
