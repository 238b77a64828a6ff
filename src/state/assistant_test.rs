use std::sync::Mutex;

use super::*;

// =========================================================================
// MockBackend
// =========================================================================

struct MockBackend {
    replies: Mutex<Vec<Result<QueryResponse, ApiError>>>,
    requests: Mutex<Vec<QueryRequest>>,
}

impl MockBackend {
    fn new(mut replies: Vec<Result<QueryResponse, ApiError>>) -> Self {
        replies.reverse();
        Self { replies: Mutex::new(replies), requests: Mutex::new(Vec::new()) }
    }

    fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QueryBackend for MockBackend {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ApiError::Transport("no reply queued".into())))
    }
}

fn answer(session_id: i64, text: &str) -> Result<QueryResponse, ApiError> {
    Ok(QueryResponse {
        session_id: Some(session_id),
        answer: text.to_owned(),
        sources: vec![Source {
            document_id: 1,
            document_name: "report.pdf".into(),
            relevant_text: "revenue grew".into(),
        }],
    })
}

// =========================================================================
// Transcript
// =========================================================================

#[test]
fn transcript_starts_with_greeting() {
    let panel = AssistantPanel::new();
    let greeting = &panel.transcript().messages()[0];
    assert_eq!(panel.transcript().len(), 1);
    assert_eq!(greeting.id, GREETING_ID);
    assert_eq!(greeting.role, Role::Assistant);
    assert!(greeting.content.starts_with("Hi! I'm your AI assistant."));
}

#[test]
fn message_ids_are_unique() {
    let mut panel = AssistantPanel::new();
    panel.begin("one");
    panel.finish(answer(1, "a"));
    let ids: std::collections::HashSet<_> = panel.transcript().messages().iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids.len(), 3);
}

// =========================================================================
// begin / finish
// =========================================================================

#[test]
fn blank_text_is_ignored() {
    let mut panel = AssistantPanel::new();
    assert_eq!(panel.begin("   \n"), None);
    assert_eq!(panel.transcript().len(), 1);
    assert!(!panel.is_loading());
}

#[test]
fn begin_refuses_while_loading() {
    let mut panel = AssistantPanel::new();
    assert!(panel.begin("first").is_some());
    assert_eq!(panel.begin("second"), None);
    assert_eq!(panel.transcript().len(), 2);
}

#[test]
fn begin_appends_user_turn_and_clears_input() {
    let mut panel = AssistantPanel::new();
    panel.set_input("What changed?");
    let request = panel.begin("What changed?").unwrap();

    assert_eq!(request, QueryRequest { message: "What changed?".into(), session_id: None });
    assert_eq!(panel.input(), "");
    assert!(panel.is_loading());
    let last = panel.transcript().last().unwrap();
    assert_eq!(last.role, Role::User);
    assert_eq!(last.content, "What changed?");
}

#[test]
fn finish_failure_adds_no_message() {
    let mut panel = AssistantPanel::new();
    panel.begin("q");
    let notice = panel
        .finish(Err(ApiError::Status { status: 500, body: r#"{"message":"index offline"}"#.into() }))
        .unwrap();

    assert!(notice.is_error());
    assert_eq!(notice.description.as_deref(), Some("index offline"));
    assert_eq!(panel.transcript().len(), 2);
    assert!(!panel.is_loading());
}

#[test]
fn finish_failure_describes_the_error() {
    let mut panel = AssistantPanel::new();
    panel.begin("q");
    let notice = panel.finish(Err(ApiError::Transport("connection refused".into()))).unwrap();
    assert_eq!(notice.description.as_deref(), Some("request failed: connection refused"));

    let mut panel = AssistantPanel::new();
    panel.begin("q");
    let notice = panel
        .finish(Err(ApiError::Status { status: 500, body: r#"{"message":"  "}"#.into() }))
        .unwrap();
    assert_eq!(notice.description.as_deref(), Some(r#"500: {"message":"  "}"#));
}

// =========================================================================
// Submit path
// =========================================================================

#[tokio::test]
async fn submit_records_answer_and_adopts_session() {
    let backend = MockBackend::new(vec![answer(42, "Revenue grew 10%."), answer(99, "Costs fell.")]);
    let mut panel = AssistantPanel::new();

    assert_eq!(panel.submit_text(&backend, "revenue?").await, SubmitOutcome::Answered);
    assert_eq!(panel.submit_text(&backend, "costs?").await, SubmitOutcome::Answered);

    let requests = backend.requests();
    assert_eq!(requests[0].session_id, None);
    assert_eq!(requests[1].session_id, Some(42));
    assert_eq!(panel.session_id(), Some(42));

    let messages = panel.transcript().messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[2].content, "Revenue grew 10%.");
    assert_eq!(messages[2].sources.len(), 1);
    assert!(!panel.is_loading());
}

#[tokio::test]
async fn blank_submit_sends_nothing() {
    let backend = MockBackend::new(vec![]);
    let mut panel = AssistantPanel::new();
    panel.set_input("  ");

    assert_eq!(panel.submit_input(&backend).await, SubmitOutcome::Ignored);
    assert!(backend.requests().is_empty());
    assert_eq!(panel.transcript().len(), 1);
}

#[tokio::test]
async fn failed_submit_returns_notice_and_clears_loading() {
    let backend = MockBackend::new(vec![Err(ApiError::Status { status: 503, body: "busy".into() })]);
    let mut panel = AssistantPanel::new();

    let outcome = panel.submit_text(&backend, "hello").await;

    let SubmitOutcome::Failed(notice) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(notice.title, "Error");
    assert_eq!(notice.description.as_deref(), Some("503: busy"));
    assert!(!panel.is_loading());
    assert_eq!(panel.transcript().len(), 2);
}

#[tokio::test]
async fn quick_action_prefills_then_submits_via_input() {
    let backend = MockBackend::new(vec![answer(1, "Here is a summary.")]);
    let mut panel = AssistantPanel::new();

    panel.quick_action(QUICK_ACTIONS[0]);
    assert_eq!(panel.input(), "Summarize documents");
    assert!(backend.requests().is_empty());

    panel.submit_input(&backend).await;
    assert_eq!(backend.requests()[0].message, "Summarize documents");
}

// =========================================================================
// Injection channel
// =========================================================================

#[tokio::test]
async fn injected_queries_use_the_same_submit_path() {
    let backend = MockBackend::new(vec![answer(7, "first"), answer(8, "second")]);
    let (handle, mut inbox) = channel();
    let mut panel = AssistantPanel::new();

    assert!(handle.ask("q3 findings"));
    assert!(handle.clone().ask("  "));
    assert!(handle.ask("margins"));

    let outcomes = panel.drain(&mut inbox, &backend).await;

    assert_eq!(outcomes, [SubmitOutcome::Answered, SubmitOutcome::Ignored, SubmitOutcome::Answered]);
    let sent: Vec<_> = backend.requests().into_iter().map(|r| (r.message, r.session_id)).collect();
    assert_eq!(sent, [("q3 findings".to_owned(), None), ("margins".to_owned(), Some(7))]);
    assert_eq!(panel.input(), "");
}

#[tokio::test]
async fn handle_reports_closed_panel() {
    let (handle, inbox) = channel();
    drop(inbox);
    assert!(!handle.ask("anyone?"));
}

#[tokio::test]
async fn inbox_recv_yields_in_order() {
    let (handle, mut inbox) = channel();
    handle.ask("a");
    handle.ask("b");
    drop(handle);

    assert_eq!(inbox.recv().await.as_deref(), Some("a"));
    assert_eq!(inbox.recv().await.as_deref(), Some("b"));
    assert_eq!(inbox.recv().await, None);
}
