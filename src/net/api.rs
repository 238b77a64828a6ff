//! REST endpoint bindings for the document service.
//!
//! SYSTEM CONTEXT
//! ==============
//! Views depend on the narrow `DocumentUploader` and `QueryBackend` traits
//! rather than on `ApiClient` itself, so their state machines can be driven
//! by test doubles.

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

use reqwest::Method;
use reqwest::multipart::{Form, Part};

use super::http::{ApiClient, RequestBody};
use super::types::{AuthResponse, Credentials, Document, DocumentStats, QueryRequest, QueryResponse};
use crate::error::ApiError;
use crate::state::upload::UploadSource;

pub const DOCUMENTS: &str = "/api/documents";
pub const DOCUMENT_STATS: &str = "/api/documents/stats";
pub const DOCUMENT_UPLOAD: &str = "/api/documents/upload";
pub const RECENT_QUERIES: &str = "/api/chat/recent-queries";
pub const CHAT_QUERY: &str = "/api/chat/query";
pub const LOGIN: &str = "/api/auth/login";
pub const SIGNUP: &str = "/api/auth/signup";
pub const LOGOUT: &str = "/api/logout";

/// Multipart field name the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";

fn document_endpoint(id: i64) -> String {
    format!("{DOCUMENTS}/{id}")
}

/// Sends one file to the upload endpoint.
#[async_trait::async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn upload(&self, file: &UploadSource) -> Result<(), ApiError>;
}

/// Answers assistant queries.
#[async_trait::async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError>;
}

impl ApiClient {
    /// Fetch every document visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn list_documents(&self) -> Result<Vec<Document>, ApiError> {
        self.get_json(DOCUMENTS).await
    }

    /// Fetch aggregate counts per document type.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn document_stats(&self) -> Result<DocumentStats, ApiError> {
        self.get_json(DOCUMENT_STATS).await
    }

    /// Fetch recently asked assistant queries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn recent_queries(&self) -> Result<Vec<String>, ApiError> {
        self.get_json(RECENT_QUERIES).await
    }

    /// Upload one file as `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the MIME type is malformed or the request fails.
    pub async fn upload_document(&self, file: &UploadSource) -> Result<(), ApiError> {
        let part = Part::bytes(file.data.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        self.request(Method::POST, DOCUMENT_UPLOAD, RequestBody::Multipart(form))
            .await?;
        tracing::info!(name = %file.name, size = file.size(), "document uploaded");
        Ok(())
    }

    /// Delete a document by id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-2xx status.
    pub async fn delete_document(&self, id: i64) -> Result<(), ApiError> {
        self.request(Method::DELETE, &document_endpoint(id), RequestBody::Empty)
            .await?;
        tracing::info!(id, "document deleted");
        Ok(())
    }

    /// Ask the retrieval assistant a question.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or bad JSON.
    pub async fn chat_query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        self.post_json(CHAT_QUERY, serde_json::to_value(request)?).await
    }

    /// `POST /api/auth/login`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the server body when credentials are rejected.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post_json(LOGIN, serde_json::to_value(credentials)?).await
    }

    /// `POST /api/auth/signup`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the server body when signup is rejected.
    pub async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.post_json(SIGNUP, serde_json::to_value(credentials)?).await
    }

    /// Tell the server to end the session. Failures are logged and ignored.
    pub async fn logout(&self) {
        if let Err(e) = self.request(Method::GET, LOGOUT, RequestBody::Empty).await {
            tracing::warn!(error = %e, "logout request failed");
        }
    }
}

#[async_trait::async_trait]
impl DocumentUploader for ApiClient {
    async fn upload(&self, file: &UploadSource) -> Result<(), ApiError> {
        self.upload_document(file).await
    }
}

#[async_trait::async_trait]
impl QueryBackend for ApiClient {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        self.chat_query(request).await
    }
}
