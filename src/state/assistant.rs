//! Retrieval assistant panel: transcript, input, and query submission.
//!
//! SYSTEM CONTEXT
//! ==============
//! Queries reach the panel two ways: typed input (including quick actions
//! that prefill it) and queries injected from elsewhere, such as a click on
//! a recent query in the sidebar. Injection goes over an `AssistantHandle`
//! created alongside the panel's `AssistantInbox`.
//!
//! DESIGN
//! ======
//! Both entry points end in [`AssistantPanel::submit_text`]. A submission is
//! split into `begin` (validate, append the user turn, build the request)
//! and `finish` (append the answer or produce a notice) so the state
//! transitions are testable without a backend.

#[cfg(test)]
#[path = "assistant_test.rs"]
mod tests;

use time::OffsetDateTime;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::net::api::QueryBackend;
use crate::net::types::{QueryRequest, QueryResponse, Source};
use crate::notice::Notice;

pub const GREETING_ID: &str = "welcome";
pub const GREETING: &str = "Hi! I'm your AI assistant. I can help you find information from your uploaded documents. \
     Try asking me something like \"What were the key findings in the Q3 report?\"";
pub const QUERY_FAILED: &str = "Failed to process your query. Please try again.";
/// Canned prompts offered under the input box.
pub const QUICK_ACTIONS: [&str; 3] = ["Summarize documents", "Find key metrics", "Compare data"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub sources: Vec<Source>,
    pub timestamp: OffsetDateTime,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            sources,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    fn greeting() -> Self {
        Self { id: GREETING_ID.to_owned(), ..Self::new(Role::Assistant, GREETING, Vec::new()) }
    }
}

/// Append-only conversation log, opened by the assistant's greeting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self { messages: vec![Message::greeting()] }
    }
}

impl Transcript {
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// What one submission did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank text or a request already in flight; nothing was appended or sent.
    Ignored,
    Answered,
    Failed(Notice),
}

#[derive(Clone, Debug, Default)]
pub struct AssistantPanel {
    transcript: Transcript,
    input: String,
    loading: bool,
    session_id: Option<i64>,
}

impl AssistantPanel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    /// Prefill the input with a quick action's prompt. Does not submit.
    pub fn quick_action(&mut self, action: &str) {
        self.set_input(action);
    }

    /// Start a submission. `None` means the text was blank or a request is
    /// already in flight, and nothing changed.
    pub fn begin(&mut self, text: &str) -> Option<QueryRequest> {
        if text.trim().is_empty() || self.loading {
            return None;
        }
        self.transcript.push(Message::new(Role::User, text, Vec::new()));
        self.input.clear();
        self.loading = true;
        Some(QueryRequest { message: text.to_owned(), session_id: self.session_id })
    }

    /// Finish the submission started by [`AssistantPanel::begin`].
    ///
    /// Returns a notice on failure; no assistant message is appended then.
    pub fn finish(&mut self, result: Result<QueryResponse, ApiError>) -> Option<Notice> {
        self.loading = false;
        match result {
            Ok(response) => {
                if self.session_id.is_none() {
                    self.session_id = response.session_id;
                }
                self.transcript
                    .push(Message::new(Role::Assistant, response.answer, response.sources));
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "assistant query failed");
                let message = e.user_message();
                let description = if message.trim().is_empty() { QUERY_FAILED.to_owned() } else { message };
                Some(Notice::error("Error", description))
            }
        }
    }

    /// The single submit path shared by typed input and injected queries.
    pub async fn submit_text<B>(&mut self, backend: &B, text: &str) -> SubmitOutcome
    where
        B: QueryBackend + ?Sized,
    {
        let Some(request) = self.begin(text) else {
            return SubmitOutcome::Ignored;
        };
        tracing::debug!(session_id = ?request.session_id, "assistant query");
        let result = backend.query(&request).await;
        match self.finish(result) {
            Some(notice) => SubmitOutcome::Failed(notice),
            None => SubmitOutcome::Answered,
        }
    }

    /// Submit whatever is in the input box.
    pub async fn submit_input<B>(&mut self, backend: &B) -> SubmitOutcome
    where
        B: QueryBackend + ?Sized,
    {
        let text = self.input.clone();
        self.submit_text(backend, &text).await
    }

    /// An injected query fills the input and submits immediately.
    pub async fn handle_injected<B>(&mut self, backend: &B, query: String) -> SubmitOutcome
    where
        B: QueryBackend + ?Sized,
    {
        self.set_input(query);
        self.submit_input(backend).await
    }

    /// Submit every query currently waiting in `inbox`, in arrival order.
    pub async fn drain<B>(&mut self, inbox: &mut AssistantInbox, backend: &B) -> Vec<SubmitOutcome>
    where
        B: QueryBackend + ?Sized,
    {
        let mut outcomes = Vec::new();
        while let Some(query) = inbox.try_recv() {
            outcomes.push(self.handle_injected(backend, query).await);
        }
        outcomes
    }
}

/// Sends queries into an assistant panel from other views.
#[derive(Clone, Debug)]
pub struct AssistantHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl AssistantHandle {
    /// Queue `query` for the panel. Returns `false` if the panel is gone.
    pub fn ask(&self, query: impl Into<String>) -> bool {
        self.tx.send(query.into()).is_ok()
    }
}

/// Receiving side owned by whoever drives the panel.
#[derive(Debug)]
pub struct AssistantInbox {
    rx: mpsc::UnboundedReceiver<String>,
}

impl AssistantInbox {
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Wire a panel inbox to a handle other views can clone.
#[must_use]
pub fn channel() -> (AssistantHandle, AssistantInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AssistantHandle { tx }, AssistantInbox { rx })
}
