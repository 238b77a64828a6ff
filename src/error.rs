//! Error types shared by the network and state layers.
//!
//! ERROR HANDLING
//! ==============
//! Every failing HTTP exchange collapses into `ApiError`. Views never let one
//! escape to the user directly: they turn it into a `Notice` via
//! [`ApiError::user_message`].

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use serde::Deserialize;

/// Errors produced by API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered outside the 2xx range.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The bearer token could not be encoded as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Reading or writing local state (token file, upload source) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[derive(Deserialize)]
struct ServerMessage {
    message: Option<String>,
}

/// Extract the `message` field from a JSON error body, if there is one.
#[must_use]
pub fn server_message(body: &str) -> Option<String> {
    serde_json::from_str::<ServerMessage>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.trim().is_empty())
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Text suitable for a notice description.
    ///
    /// Prefers the server's `message` field over the raw `status: body` form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { body, .. } => server_message(body).unwrap_or_else(|| self.to_string()),
            other => other.to_string(),
        }
    }
}
