//! Response cache keyed by request path plus discriminators.
//!
//! DESIGN
//! ======
//! Entries hold raw `serde_json::Value` so one store serves every response
//! type; callers decode with [`decode`]. The map sits behind a
//! `std::sync::Mutex` that is only locked between awaits, never across one.
//!
//! TRADE-OFFS
//! ==========
//! Defaults never auto-refetch (infinite staleness, no polling, no focus
//! refetch). Views opt in per query; everything else refetches only when
//! asked to with `FetchMode::Force`. "Focus" has no event source here: the
//! owner of the session calls `refocus_api` when the user comes back.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::net::http::{ApiClient, RequestBody, decode_json, ensure_success};

/// Cache key. The first part is always the request path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(vec![path.into()])
    }

    /// Add a discriminator that splits the cache without changing the path.
    #[must_use]
    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.0[0]
    }

    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())?;
        for part in &self.0[1..] {
            write!(f, " [{part}]")?;
        }
        Ok(())
    }
}

/// What a fetch does with a 401 response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnauthorizedBehavior {
    /// Cache and return JSON `null`.
    ReturnNull,
    /// Fail like any other non-2xx status.
    #[default]
    Throw,
}

/// How long a cached entry counts as fresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Staleness {
    #[default]
    Never,
    After(Duration),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Poll period; `None` disables polling.
    pub refetch_interval: Option<Duration>,
    pub refetch_on_focus: bool,
    pub stale_time: Staleness,
    pub on_unauthorized: UnauthorizedBehavior,
}

impl QueryOptions {
    #[must_use]
    pub fn polling(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn stale_after(mut self, after: Duration) -> Self {
        self.stale_time = Staleness::After(after);
        self
    }

    #[must_use]
    pub fn refetch_on_focus(mut self) -> Self {
        self.refetch_on_focus = true;
        self
    }

    #[must_use]
    pub fn unauthorized(mut self, behavior: UnauthorizedBehavior) -> Self {
        self.on_unauthorized = behavior;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve a fresh cached value when there is one.
    Cached,
    /// Always call the fetcher.
    Force,
}

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    options: QueryOptions,
}

impl CacheEntry {
    fn is_fresh_at(&self, now: Instant) -> bool {
        match self.options.stale_time {
            Staleness::Never => true,
            Staleness::After(after) => now.saturating_duration_since(self.fetched_at) < after,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct QueryStore {
    entries: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
}

impl QueryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached value for `key`, fresh or not.
    #[must_use]
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        self.lock().get(key).map(|entry| entry.value.clone())
    }

    #[must_use]
    pub fn is_fresh_at(&self, key: &QueryKey, now: Instant) -> bool {
        self.lock().get(key).is_some_and(|entry| entry.is_fresh_at(now))
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: &QueryKey, value: Value, options: &QueryOptions) {
        self.lock().insert(
            key.clone(),
            CacheEntry { value, fetched_at: Instant::now(), options: *options },
        );
    }

    /// Drop the entry so the next `Cached` fetch goes to the network.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Keys whose options ask for a refetch when the user returns.
    #[must_use]
    pub fn keys_to_refetch_on_focus(&self) -> Vec<QueryKey> {
        self.focus_entries().into_iter().map(|(key, _)| key).collect()
    }

    fn focus_entries(&self) -> Vec<(QueryKey, QueryOptions)> {
        self.lock()
            .iter()
            .filter(|(_, entry)| entry.options.refetch_on_focus)
            .map(|(key, entry)| (key.clone(), entry.options))
            .collect()
    }

    /// Force-refetch every focus-flagged key with `fetcher`, keeping each
    /// entry's options. Returns how many refetches succeeded; failures keep
    /// the old value.
    pub async fn refocus<F, Fut>(&self, fetcher: F) -> usize
    where
        F: Fn(QueryKey) -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        let mut refreshed = 0;
        for (key, options) in self.focus_entries() {
            if self.fetch(&key, &options, FetchMode::Force, &fetcher).await.is_ok() {
                refreshed += 1;
            }
        }
        tracing::debug!(refreshed, "focus refetch");
        refreshed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Return the cached value or run `fetcher` and cache its result.
    ///
    /// A failed fetch leaves any previous entry untouched.
    ///
    /// # Errors
    ///
    /// Propagates the fetcher's error.
    pub async fn fetch<F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        mode: FetchMode,
        fetcher: F,
    ) -> Result<Value, ApiError>
    where
        F: FnOnce(QueryKey) -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        if mode == FetchMode::Cached {
            let now = Instant::now();
            let cached = self
                .lock()
                .get(key)
                .filter(|entry| entry.is_fresh_at(now))
                .map(|entry| entry.value.clone());
            if let Some(value) = cached {
                tracing::trace!(%key, "query cache hit");
                return Ok(value);
            }
        }

        match fetcher(key.clone()).await {
            Ok(value) => {
                self.set(key, value.clone(), options);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "query fetch failed");
                Err(e)
            }
        }
    }

    /// [`QueryStore::fetch`] with the default fetcher: `GET key.path()`.
    ///
    /// # Errors
    ///
    /// Returns the transport/status/decode error, except 401 under `ReturnNull`.
    pub async fn fetch_api(
        &self,
        client: &ApiClient,
        key: &QueryKey,
        options: &QueryOptions,
        mode: FetchMode,
    ) -> Result<Value, ApiError> {
        let policy = options.on_unauthorized;
        self.fetch(key, options, mode, |key| async move { fetch_from_api(client, &key, policy).await })
            .await
    }

    /// [`QueryStore::refocus`] over the API, honoring each entry's 401 policy.
    pub async fn refocus_api(&self, client: &ApiClient) -> usize {
        let mut refreshed = 0;
        for (key, options) in self.focus_entries() {
            if self.fetch_api(client, &key, &options, FetchMode::Force).await.is_ok() {
                refreshed += 1;
            }
        }
        tracing::debug!(refreshed, "focus refetch");
        refreshed
    }
}

/// Default fetcher: `GET` the key's path and parse the JSON body.
///
/// # Errors
///
/// Returns the transport/status/decode error, except 401 under `ReturnNull`.
pub async fn fetch_from_api(
    client: &ApiClient,
    key: &QueryKey,
    on_unauthorized: UnauthorizedBehavior,
) -> Result<Value, ApiError> {
    let response = client.send(Method::GET, key.path(), RequestBody::Empty).await?;
    if on_unauthorized == UnauthorizedBehavior::ReturnNull && response.status() == StatusCode::UNAUTHORIZED {
        tracing::debug!(%key, "unauthorized query resolved to null");
        return Ok(Value::Null);
    }
    let response = ensure_success(response).await?;
    decode_json(response).await
}

/// Decode a cached value; JSON `null` becomes `None`.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the value does not match `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<Option<T>, ApiError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}
