//! In-process document service used by the integration tests.
//!
//! Serves the same routes as the real backend from in-memory state and
//! records the `Authorization` header of every request.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Json;
use axum::Router;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "tok-ada";

#[derive(Default)]
pub struct Inner {
    pub documents: Vec<Value>,
    pub next_id: i64,
    pub auth_headers: Vec<(String, Option<String>)>,
    pub uploads: Vec<String>,
    pub queries: Vec<Value>,
    pub recent: Vec<String>,
    pub next_session: i64,
    pub require_auth: bool,
    /// Make the list endpoint answer 500 while set.
    pub list_down: bool,
    pub logouts: usize,
}

#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Mutex<Inner>>,
}

impl MockState {
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_document(&self, name: &str, file_type: &str, size: u64) -> i64 {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.documents.push(document_json(id, name, file_type, size, "pending"));
        id
    }

    pub fn set_status(&self, id: i64, status: &str) {
        let mut inner = self.lock();
        if let Some(doc) = inner.documents.iter_mut().find(|doc| doc["id"] == id) {
            doc["processingStatus"] = json!(status);
        }
    }

    pub fn last_auth_header(&self, path: &str) -> Option<String> {
        self.lock()
            .auth_headers
            .iter()
            .rev()
            .find(|(seen, _)| seen == path)
            .and_then(|(_, header)| header.clone())
    }

    fn record(&self, path: &str, headers: &HeaderMap) -> bool {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let mut inner = self.lock();
        let expected = format!("Bearer {TOKEN}");
        let allowed = !inner.require_auth || header.as_deref() == Some(expected.as_str());
        inner.auth_headers.push((path.to_owned(), header));
        allowed
    }
}

pub struct MockServer {
    pub base_url: String,
    pub state: MockState,
    task: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn spawn() -> MockServer {
    let state = MockState::default();
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockServer { base_url: format!("http://{addr}"), state, task }
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/documents", get(list_documents))
        .route("/api/documents/stats", get(document_stats))
        .route("/api/documents/upload", post(upload_document))
        .route("/api/documents/{id}", delete(delete_document))
        .route("/api/chat/query", post(chat_query))
        .route("/api/chat/recent-queries", get(recent_queries))
        .route("/api/auth/login", post(login))
        .route("/api/auth/signup", post(signup))
        .route("/api/logout", get(logout))
        .route("/api/broken", get(broken))
        .with_state(state)
}

fn document_json(id: i64, name: &str, file_type: &str, size: u64, status: &str) -> Value {
    json!({
        "id": id,
        "originalName": name,
        "fileType": file_type,
        "fileSize": size,
        "processingStatus": status,
        "summary": null,
        "createdAt": format!("2024-01-01T00:00:{:02}Z", id % 60),
        "updatedAt": format!("2024-01-01T00:00:{:02}Z", id % 60),
    })
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Unauthorized" }))).into_response()
}

async fn list_documents(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.record("/api/documents", &headers) {
        return unauthorized();
    }
    let inner = state.lock();
    if inner.list_down {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "List unavailable" }))).into_response();
    }
    Json(Value::Array(inner.documents.clone())).into_response()
}

async fn document_stats(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.record("/api/documents/stats", &headers) {
        return unauthorized();
    }
    let inner = state.lock();
    let count = |types: &[&str]| {
        inner
            .documents
            .iter()
            .filter(|doc| types.iter().any(|t| doc["fileType"] == *t))
            .count()
    };
    Json(json!({
        "total": inner.documents.len(),
        "pdf": count(&["application/pdf"]),
        "powerpoint": count(&[
            "application/vnd.ms-powerpoint",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ]),
        "spreadsheet": count(&[
            "text/csv",
            "application/vnd.ms-excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ]),
        "document": count(&[
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "text/plain",
        ]),
    }))
    .into_response()
}

async fn upload_document(State(state): State<MockState>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !state.record("/api/documents/upload", &headers) {
        return unauthorized();
    }
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_owned();
        let file_type = field.content_type().unwrap_or("application/octet-stream").to_owned();
        let Ok(bytes) = field.bytes().await else {
            return (StatusCode::BAD_REQUEST, Json(json!({ "message": "bad upload" }))).into_response();
        };

        let mut inner = state.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.documents.push(document_json(id, &name, &file_type, bytes.len() as u64, "pending"));
        inner.uploads.push(name);
        return (StatusCode::CREATED, Json(json!({ "id": id }))).into_response();
    }
    (StatusCode::BAD_REQUEST, Json(json!({ "message": "No file uploaded" }))).into_response()
}

async fn delete_document(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !state.record("/api/documents/{id}", &headers) {
        return unauthorized();
    }
    let mut inner = state.lock();
    let before = inner.documents.len();
    inner.documents.retain(|doc| doc["id"] != id);
    if inner.documents.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Document not found" }))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn chat_query(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.record("/api/chat/query", &headers) {
        return unauthorized();
    }
    let mut inner = state.lock();
    let message = body["message"].as_str().unwrap_or_default().to_owned();
    let session_id = match body["sessionId"].as_i64() {
        Some(id) => id,
        None => {
            inner.next_session += 1;
            100 + inner.next_session
        }
    };
    inner.queries.push(body);
    inner.recent.insert(0, message.clone());
    Json(json!({
        "sessionId": session_id,
        "answer": format!("echo: {message}"),
        "sources": [{ "documentId": 1, "documentName": "report.pdf", "relevantText": "matched text" }],
    }))
    .into_response()
}

async fn recent_queries(State(state): State<MockState>, headers: HeaderMap) -> Response {
    if !state.record("/api/chat/recent-queries", &headers) {
        return unauthorized();
    }
    Json(state.lock().recent.clone()).into_response()
}

async fn login(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/api/auth/login", &headers);
    if body["username"] == USERNAME && body["password"] == PASSWORD {
        Json(json!({ "token": TOKEN })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid username or password" }))).into_response()
    }
}

async fn signup(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("/api/auth/signup", &headers);
    if body["username"] == USERNAME {
        (StatusCode::CONFLICT, Json(json!({ "message": "Username already exists" }))).into_response()
    } else {
        (StatusCode::CREATED, Json(json!({ "message": "User created" }))).into_response()
    }
}

async fn logout(State(state): State<MockState>, headers: HeaderMap) -> StatusCode {
    state.record("/api/logout", &headers);
    state.lock().logouts += 1;
    StatusCode::OK
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}
