//! HTTP wrapper used by every view.
//!
//! DESIGN
//! ======
//! One `reqwest::Client` per `ApiClient`, with a cookie jar so session
//! cookies ride along like browser credentials. Each request re-reads the
//! token store, so a login becomes visible to all clones at once.
//!
//! ERROR HANDLING
//! ==============
//! `request` turns any non-2xx response into `ApiError::Status` carrying the
//! code and body text. `send` skips that check for callers (the query store)
//! that need to inspect the status first.

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;

use super::token::TokenStore;
use crate::config::ClientConfig;
use crate::error::ApiError;

/// Payload attached to a request.
#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Sent as `multipart/form-data`; no JSON content type is set.
    Multipart(reqwest::multipart::Form),
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Build a client from config, sharing `tokens` for bearer auth.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned(), tokens })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Send a request without checking the response status.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be encoded or no response arrives.
    pub async fn send(&self, method: Method, path: &str, body: RequestBody) -> Result<Response, ApiError> {
        let url = self.url(path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(token) = self.tokens.get() {
            request = request.header(AUTHORIZATION, bearer_header(&token)?);
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(json) => request.json(&json),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        tracing::debug!(method = %method, path, "api request");
        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "api request failed");
            ApiError::from(e)
        })?;
        tracing::debug!(method = %method, path, status = response.status().as_u16(), "api response");
        Ok(response)
    }

    /// Send a request and fail on any non-2xx status.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` for non-2xx responses, or the transport error.
    pub async fn request(&self, method: Method, path: &str, body: RequestBody) -> Result<Response, ApiError> {
        let response = self.send(method, path, body).await?;
        ensure_success(response).await
    }

    /// `GET path` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on non-2xx status or an undecodable body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, RequestBody::Empty).await?;
        decode_json(response).await
    }

    /// `POST path` with a JSON body and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns an error on non-2xx status or an undecodable body.
    pub async fn post_json<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T, ApiError> {
        let response = self.request(Method::POST, path, RequestBody::Json(body)).await?;
        decode_json(response).await
    }
}

/// Pass 2xx responses through; convert anything else into `ApiError::Status`.
///
/// # Errors
///
/// Returns `ApiError::Status` when the status is outside 200-299.
pub async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), body: status_body(&text, status.canonical_reason()) })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Error body text, falling back to the reason phrase when the body is empty.
pub(crate) fn status_body(text: &str, reason: Option<&str>) -> String {
    if text.is_empty() {
        reason.unwrap_or_default().to_owned()
    } else {
        text.to_owned()
    }
}

pub(crate) fn bearer_header(token: &str) -> Result<HeaderValue, ApiError> {
    Ok(HeaderValue::from_str(&format!("Bearer {token}"))?)
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
