//! Sidebar: the short list of recent assistant queries.
//!
//! Selecting a recent query re-asks it through the assistant panel's
//! injection channel.

#[cfg(test)]
#[path = "sidebar_test.rs"]
mod tests;

use super::assistant::AssistantHandle;
use crate::error::ApiError;
use crate::net::api::RECENT_QUERIES;
use crate::net::http::ApiClient;
use crate::query::{FetchMode, QueryKey, QueryOptions, QueryStore, decode};

/// How many recent queries the sidebar shows.
pub const RECENT_QUERY_LIMIT: usize = 3;

#[derive(Clone, Debug)]
pub struct RecentQueries {
    items: Vec<String>,
    handle: AssistantHandle,
}

impl RecentQueries {
    #[must_use]
    pub fn new(handle: AssistantHandle) -> Self {
        Self { items: Vec::new(), handle }
    }

    #[must_use]
    pub fn key() -> QueryKey {
        QueryKey::new(RECENT_QUERIES)
    }

    #[must_use]
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Keep the newest [`RECENT_QUERY_LIMIT`] queries from a newest-first list.
    pub fn set_items(&mut self, mut items: Vec<String>) {
        items.truncate(RECENT_QUERY_LIMIT);
        self.items = items;
    }

    /// Recent queries refetch when the user comes back to the session.
    #[must_use]
    pub fn options() -> QueryOptions {
        QueryOptions::default().refetch_on_focus()
    }

    /// Load recent queries through the shared store.
    ///
    /// # Errors
    ///
    /// Returns the fetch or decode error; the current items are kept.
    pub async fn load(&mut self, client: &ApiClient, store: &QueryStore, mode: FetchMode) -> Result<(), ApiError> {
        let value = store
            .fetch_api(client, &Self::key(), &Self::options(), mode)
            .await?;
        self.set_items(decode(value)?.unwrap_or_default());
        Ok(())
    }

    /// Send the query at `index` to the assistant. `false` if there is no
    /// such query or the assistant is gone.
    pub fn select(&self, index: usize) -> bool {
        let Some(query) = self.items.get(index) else {
            return false;
        };
        tracing::debug!(index, "recent query selected");
        self.handle.ask(query.clone())
    }
}
