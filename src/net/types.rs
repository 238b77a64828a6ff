//! Wire types exchanged with the document service.
//!
//! All payloads use camelCase field names, matching the server's JSON.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Server-assigned lifecycle stage of an uploaded document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ProcessingStatus {
    /// Also the fallback for any status string this client does not know.
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<String> for ProcessingStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl ProcessingStatus {
    /// Badge text shown next to a document.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Completed => "Processed",
            Self::Processing => "Processing",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
        }
    }

    /// Only fully processed documents can answer assistant queries.
    #[must_use]
    pub fn can_query(self) -> bool {
        self == Self::Completed
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub original_name: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Per-facet document counts from `/api/documents/stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStats {
    pub total: u64,
    pub pdf: u64,
    pub powerpoint: u64,
    pub spreadsheet: u64,
    pub document: u64,
}

/// Body of `POST /api/chat/query`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub message: String,
    /// Serialized as `null` until the server assigns a session.
    pub session_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub session_id: Option<i64>,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// A document passage the assistant cited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub document_id: i64,
    pub document_name: String,
    #[serde(default)]
    pub relevant_text: String,
}

/// Body of the login and signup requests.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Reply from login/signup: a token on success, a message on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
