//! Document list view state: facet filter, sort order, stats, delete.
//!
//! SYSTEM CONTEXT
//! ==============
//! The list is server-owned. `DocumentLibrary` reads it through the shared
//! `QueryStore` under the key `["/api/documents", <facet>]` and keeps it
//! current with a poller; `DocumentListState` is the plain view model the
//! surface renders from.
//!
//! DESIGN
//! ======
//! Filtering and sorting are pure functions over a slice so they can be
//! tested without a server. The facet is part of the cache key but the
//! server always returns every document; narrowing happens client side.

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;

use std::cmp::Ordering;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::net::api::{DOCUMENT_STATS, DOCUMENTS};
use crate::net::http::ApiClient;
use crate::net::types::{Document, DocumentStats};
use crate::notice::Notice;
use crate::query::{FetchMode, PollEvent, PollHandle, QueryKey, QueryOptions, QueryStore, decode, fetch_from_api};
use crate::util::files::{
    MIME_CSV, MIME_DOC, MIME_DOCX, MIME_PDF, MIME_PPT, MIME_PPTX, MIME_TXT, MIME_XLS, MIME_XLSX,
};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this document?";
const DELETE_FAILED: &str = "Failed to delete document. Please try again.";

/// A string that names no known facet or sort order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

/// Document type filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TypeFacet {
    #[default]
    All,
    Pdf,
    PowerPoint,
    Spreadsheet,
    Document,
}

impl TypeFacet {
    pub const ALL: [Self; 5] = [Self::All, Self::Pdf, Self::PowerPoint, Self::Spreadsheet, Self::Document];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pdf => "pdf",
            Self::PowerPoint => "powerpoint",
            Self::Spreadsheet => "spreadsheet",
            Self::Document => "document",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Types",
            Self::Pdf => "PDF",
            Self::PowerPoint => "PowerPoint",
            Self::Spreadsheet => "Spreadsheets",
            Self::Document => "Documents",
        }
    }

    /// MIME types in this facet. Empty for `All`, which matches everything.
    #[must_use]
    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            Self::All => &[],
            Self::Pdf => &[MIME_PDF],
            Self::PowerPoint => &[MIME_PPT, MIME_PPTX],
            Self::Spreadsheet => &[MIME_CSV, MIME_XLS, MIME_XLSX],
            Self::Document => &[MIME_DOC, MIME_DOCX, MIME_TXT],
        }
    }

    #[must_use]
    pub fn matches(self, mime_type: &str) -> bool {
        self == Self::All || self.mime_types().contains(&mime_type)
    }
}

impl FromStr for TypeFacet {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|facet| facet.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOption { kind: "type", value: s.to_owned() })
    }
}

impl std::fmt::Display for TypeFacet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Newest upload first.
    #[default]
    Recent,
    /// A-Z, case-insensitive.
    Name,
    /// Largest first.
    Size,
    /// Most recently updated first.
    Modified,
}

impl SortKey {
    pub const ALL: [Self; 4] = [Self::Recent, Self::Name, Self::Size, Self::Modified];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Name => "name",
            Self::Size => "size",
            Self::Modified => "modified",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Recent => "Recently Added",
            Self::Name => "Name A-Z",
            Self::Size => "Size",
            Self::Modified => "Last Modified",
        }
    }

    fn compare(self, a: &Document, b: &Document) -> Ordering {
        match self {
            Self::Recent => b.created_at.cmp(&a.created_at),
            Self::Name => a
                .original_name
                .to_lowercase()
                .cmp(&b.original_name.to_lowercase())
                .then_with(|| a.original_name.cmp(&b.original_name)),
            Self::Size => b.file_size.cmp(&a.file_size),
            Self::Modified => b.updated_at.cmp(&a.updated_at),
        }
    }
}

impl FromStr for SortKey {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownOption { kind: "sort", value: s.to_owned() })
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn filter_documents(documents: &[Document], facet: TypeFacet) -> Vec<Document> {
    documents.iter().filter(|doc| facet.matches(&doc.file_type)).cloned().collect()
}

/// Stable sort: documents that compare equal keep their relative order.
pub fn sort_documents(documents: &mut [Document], key: SortKey) {
    documents.sort_by(|a, b| key.compare(a, b));
}

impl DocumentStats {
    /// Recount stats from a document list without asking the server.
    #[must_use]
    pub fn tally(documents: &[Document]) -> Self {
        let count = |facet: TypeFacet| documents.iter().filter(|doc| facet.matches(&doc.file_type)).count() as u64;
        Self {
            total: documents.len() as u64,
            pdf: count(TypeFacet::Pdf),
            powerpoint: count(TypeFacet::PowerPoint),
            spreadsheet: count(TypeFacet::Spreadsheet),
            document: count(TypeFacet::Document),
        }
    }
}

/// Asks the user to approve a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentListState {
    pub documents: Vec<Document>,
    pub stats: DocumentStats,
    pub facet: TypeFacet,
    pub sort: SortKey,
    pub loading: bool,
    /// Last load failure, cleared by the next success.
    pub error: Option<String>,
}

impl DocumentListState {
    #[must_use]
    pub fn new(facet: TypeFacet, sort: SortKey) -> Self {
        Self { facet, sort, ..Self::default() }
    }

    /// Documents as the list shows them: filtered by facet, then sorted.
    #[must_use]
    pub fn visible(&self) -> Vec<Document> {
        let mut documents = filter_documents(&self.documents, self.facet);
        sort_documents(&mut documents, self.sort);
        documents
    }

    /// Fold one poll result into the state. A failed round keeps the last list.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if the polled value is not a document list.
    pub fn apply_poll(&mut self, event: PollEvent) -> Result<(), ApiError> {
        match event {
            PollEvent::Updated(value) => {
                self.documents = decode(value)?.unwrap_or_default();
                self.error = None;
            }
            PollEvent::Failed(message) => self.error = Some(message),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; nothing was sent.
    Cancelled,
    Deleted(Notice),
    Failed(Notice),
}

/// Reads and mutates the document list through the shared query store.
#[derive(Clone, Debug)]
pub struct DocumentLibrary {
    client: ApiClient,
    store: QueryStore,
    poll_interval: Duration,
}

impl DocumentLibrary {
    #[must_use]
    pub fn new(client: ApiClient, store: QueryStore, poll_interval: Duration) -> Self {
        Self { client, store, poll_interval }
    }

    #[must_use]
    pub fn documents_key(facet: TypeFacet) -> QueryKey {
        QueryKey::new(DOCUMENTS).with_part(facet.as_str())
    }

    #[must_use]
    pub fn stats_key() -> QueryKey {
        QueryKey::new(DOCUMENT_STATS)
    }

    fn list_options(&self) -> QueryOptions {
        let options = QueryOptions::default().refetch_on_focus();
        if self.poll_interval.is_zero() { options } else { options.polling(self.poll_interval) }
    }

    /// Load documents and stats into `state`.
    ///
    /// # Errors
    ///
    /// Returns the first fetch or decode error; `state.error` carries its
    /// user-facing text and the previous list is kept.
    pub async fn load(&self, state: &mut DocumentListState, mode: FetchMode) -> Result<(), ApiError> {
        state.loading = true;
        let result = self.fetch_into(state, mode).await;
        state.loading = false;
        match &result {
            Ok(()) => state.error = None,
            Err(e) => state.error = Some(e.user_message()),
        }
        result
    }

    async fn fetch_into(&self, state: &mut DocumentListState, mode: FetchMode) -> Result<(), ApiError> {
        let list = self
            .store
            .fetch_api(&self.client, &Self::documents_key(state.facet), &self.list_options(), mode)
            .await?;
        let stats = self
            .store
            .fetch_api(&self.client, &Self::stats_key(), &QueryOptions::default(), mode)
            .await?;

        state.documents = decode(list)?.unwrap_or_default();
        state.stats = decode(stats)?.unwrap_or_default();
        tracing::debug!(count = state.documents.len(), facet = %state.facet, "documents loaded");
        Ok(())
    }

    /// Bypass the cache and reload.
    ///
    /// # Errors
    ///
    /// See [`DocumentLibrary::load`].
    pub async fn refresh(&self, state: &mut DocumentListState) -> Result<(), ApiError> {
        self.load(state, FetchMode::Force).await
    }

    /// Confirm, delete, then refetch the list.
    pub async fn delete(&self, state: &mut DocumentListState, id: i64, confirm: &dyn Confirm) -> DeleteOutcome {
        if !confirm.confirm(DELETE_PROMPT) {
            tracing::debug!(id, "delete cancelled");
            return DeleteOutcome::Cancelled;
        }

        if let Err(e) = self.client.delete_document(id).await {
            tracing::warn!(id, error = %e, "delete failed");
            return DeleteOutcome::Failed(Notice::error("Error", DELETE_FAILED));
        }

        for facet in TypeFacet::ALL {
            self.store.invalidate(&Self::documents_key(facet));
        }
        self.store.invalidate(&Self::stats_key());
        if let Err(e) = self.refresh(state).await {
            tracing::warn!(id, error = %e, "refetch after delete failed");
            state.documents.retain(|doc| doc.id != id);
            state.stats = DocumentStats::tally(&state.documents);
        }

        DeleteOutcome::Deleted(
            Notice::info("Document deleted").with_description("The document has been successfully deleted."),
        )
    }

    /// Poll the list for `facet` every `poll_interval` until the handle drops.
    /// `None` if the library was built with a zero interval.
    #[must_use]
    pub fn watch(&self, facet: TypeFacet) -> Option<(PollHandle, mpsc::Receiver<PollEvent>)> {
        let client = self.client.clone();
        let options = self.list_options();
        let policy = options.on_unauthorized;
        self.store.poll(Self::documents_key(facet), options, move |key| {
            let client = client.clone();
            async move { fetch_from_api(&client, &key, policy).await }
        })
    }
}
