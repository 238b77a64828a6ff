//! Fixed-interval refetching for server-owned state.
//!
//! DESIGN
//! ======
//! One spawned task per polled key, at the period set by
//! `QueryOptions::polling`; a query without one is never polled. Each tick awaits the previous fetch
//! before the next one can start, and missed ticks are skipped, so at most
//! one request per poller is ever in flight. Results go out over a bounded
//! channel; the task ends when its handle is dropped or the receiver goes
//! away.

#[cfg(test)]
#[path = "poll_test.rs"]
mod tests;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::store::{FetchMode, QueryKey, QueryOptions, QueryStore};
use crate::error::ApiError;

const POLL_CHANNEL_CAPACITY: usize = 8;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Result of one polling round.
#[derive(Clone, Debug, PartialEq)]
pub enum PollEvent {
    Updated(Value),
    Failed(String),
}

/// Owns a running poller; dropping it stops polling.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl QueryStore {
    /// Refetch `key` every `options.refetch_interval`, caching and publishing
    /// each result. Returns `None` when the options have polling disabled.
    ///
    /// The first round fires one full interval after the call; callers do
    /// their own initial fetch.
    pub fn poll<F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Option<(PollHandle, mpsc::Receiver<PollEvent>)>
    where
        F: Fn(QueryKey) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
    {
        let Some(interval) = options.refetch_interval else {
            tracing::debug!(%key, "polling disabled");
            return None;
        };
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, rx) = mpsc::channel(POLL_CHANNEL_CAPACITY);
        let store = self.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            tracing::debug!(%key, interval_ms = interval.as_millis(), "poller started");
            loop {
                ticker.tick().await;
                let event = match store.fetch(&key, &options, FetchMode::Force, &fetcher).await {
                    Ok(value) => PollEvent::Updated(value),
                    Err(e) => PollEvent::Failed(e.user_message()),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            tracing::debug!(%key, "poller stopped");
        });

        Some((PollHandle { task }, rx))
    }
}
