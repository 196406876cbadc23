//! In-process stand-in for the Claude.ai API used by the integration tests.
#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SESSION_KEY: &str = "sk-test-good";
pub const ORG: &str = "org-1";
pub const PROJECT: &str = "p-1";

#[derive(Default)]
pub struct Mock {
    pub docs: Mutex<Vec<Value>>,
    /// "METHOD /path?query" for every request, in arrival order.
    pub log: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<Value>>,
    pub next_id: AtomicUsize,
    pub stream_dropped: Arc<AtomicBool>,
}

impl Mock {
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn doc_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|d| d["file_name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn seed_doc(&self, uuid: &str, file_name: &str, content: &str) {
        self.docs.lock().unwrap().push(json!({
            "uuid": uuid,
            "file_name": file_name,
            "content": content,
            "created_at": "2024-05-01T10:00:00Z",
        }));
    }
}

/// Start the mock on an ephemeral port; returns its base URL.
pub async fn spawn() -> (String, Arc<Mock>) {
    let mock = Arc::new(Mock::default());
    let app = Router::new()
        .route("/organizations", get(organizations))
        .route(
            "/organizations/{org}/projects",
            get(list_projects).post(create_project),
        )
        .route("/organizations/{org}/projects/{project}", put(archive_project))
        .route(
            "/organizations/{org}/projects/{project}/docs",
            get(list_docs).post(upload_doc),
        )
        .route(
            "/organizations/{org}/projects/{project}/docs/{uuid}",
            axum::routing::delete(delete_doc),
        )
        .route(
            "/organizations/{org}/chat_conversations",
            get(list_chats).post(create_chat),
        )
        .route(
            "/organizations/{org}/chat_conversations/delete_many",
            post(delete_chats),
        )
        .route("/organizations/{org}/chat_conversations/{chat}", get(get_chat))
        .route(
            "/organizations/{org}/chat_conversations/{chat}/completion",
            post(completion),
        )
        .route("/organizations/{org}/published_artifacts", get(artifacts))
        .layer(middleware::from_fn_with_state(mock.clone(), check_session))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), mock)
}

async fn check_session(State(mock): State<Arc<Mock>>, req: Request, next: Next) -> Response {
    let target = match req.uri().query() {
        Some(q) => format!("{} {}?{}", req.method(), req.uri().path(), q),
        None => format!("{} {}", req.method(), req.uri().path()),
    };
    mock.log.lock().unwrap().push(target);

    let cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if cookie != format!("sessionKey={}", SESSION_KEY) {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    next.run(req).await
}

async fn organizations() -> Json<Value> {
    Json(json!([{ "uuid": ORG, "name": "Personal", "id": 42 }]))
}

async fn list_projects(Path(org): Path<String>) -> Response {
    match org.as_str() {
        "limited" => (
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"{\"resetsAt\": 1700000000}"}}"#,
        )
            .into_response(),
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Bytes::from_static(b"caf\xe9 down"),
        )
            .into_response(),
        _ => Json(json!([
            { "uuid": PROJECT, "name": "Docs", "archived_at": null },
            { "uuid": "p-old", "name": "Old", "archived_at": "2024-01-01T00:00:00Z" },
        ]))
        .into_response(),
    }
}

async fn create_project(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    mock.bodies.lock().unwrap().push(body.clone());
    Json(json!({ "uuid": "p-new", "name": body["name"] }))
}

async fn archive_project(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> StatusCode {
    mock.bodies.lock().unwrap().push(body);
    StatusCode::OK
}

async fn list_docs(State(mock): State<Arc<Mock>>) -> Json<Value> {
    Json(Value::Array(mock.docs.lock().unwrap().clone()))
}

async fn upload_doc(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    let id = mock.next_id.fetch_add(1, Ordering::SeqCst);
    let doc = json!({
        "uuid": format!("doc-{}", id),
        "file_name": body["file_name"],
        "content": body["content"],
        "created_at": "2024-05-01T10:00:00Z",
    });
    let mut docs = mock.docs.lock().unwrap();
    docs.retain(|d| d["file_name"] != body["file_name"]);
    docs.push(doc.clone());
    Json(doc)
}

async fn delete_doc(
    State(mock): State<Arc<Mock>>,
    Path((_org, _project, uuid)): Path<(String, String, String)>,
) -> StatusCode {
    let mut docs = mock.docs.lock().unwrap();
    let before = docs.len();
    docs.retain(|d| d["uuid"] != uuid.as_str());
    if docs.len() == before {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

/// Served gzip-compressed, as the real service does.
async fn list_chats() -> Response {
    let body = json!([
        { "uuid": "c-1", "name": "First", "project_uuid": PROJECT, "updated_at": "2024-05-02T00:00:00Z" },
        { "uuid": "c-2", "name": "Elsewhere", "project_uuid": "p-other" },
    ]);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(body.to_string().as_bytes())
        .unwrap();
    let compressed = encoder.finish().unwrap();
    (
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        compressed,
    )
        .into_response()
}

async fn create_chat(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> Json<Value> {
    mock.bodies.lock().unwrap().push(body.clone());
    Json(json!({
        "uuid": "c-new",
        "name": body["name"],
        "project_uuid": body["project_uuid"],
    }))
}

async fn delete_chats(State(mock): State<Arc<Mock>>, Json(body): Json<Value>) -> StatusCode {
    mock.bodies.lock().unwrap().push(body);
    StatusCode::OK
}

async fn get_chat(Path((_org, chat)): Path<(String, String)>) -> Json<Value> {
    Json(json!({
        "uuid": chat,
        "name": "First",
        "project_uuid": PROJECT,
        "chat_messages": [
            { "uuid": "m-1", "text": "hi", "sender": "human" },
            { "uuid": "m-2", "text": "hello!", "sender": "assistant" },
        ],
    }))
}

async fn artifacts() -> Json<Value> {
    Json(json!([
        { "published_artifact_uuid": "a-1", "content": "fn main() {}" },
    ]))
}

/// Sets its flag when the server drops the response body.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

async fn completion(
    State(mock): State<Arc<Mock>>,
    Path((_org, chat)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    mock.bodies.lock().unwrap().push(body);
    let chunks: Vec<&'static str> = match chat.as_str() {
        // Chunk edges fall inside lines on purpose.
        "hello" => vec![
            "data: {\"comp",
            "letion\":\"Hel\"}\r\n\r\ndata: {\"completion\":\"lo\"}\n",
            "\ndata: [DO",
            "NE]\n\n",
        ],
        "cut" => vec!["data: {\"completion\":\"partial\"}\n\n"],
        "failing" => vec![
            "data: {\"completion\":\"partial\"}\n\n",
            "event: error\ndata: {\"error\":\"overloaded\"}\n\n",
        ],
        "endless" => {
            let flag = DropFlag(mock.stream_dropped.clone());
            let ticks = futures::stream::unfold((flag, 0u64), |(flag, n)| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let line = format!("data: {{\"completion\":\"tick{}\"}}\n\n", n);
                Some((Ok::<_, Infallible>(Bytes::from(line)), (flag, n + 1)))
            });
            return sse_response(Body::from_stream(ticks));
        }
        _ => return (StatusCode::NOT_FOUND, "no such chat").into_response(),
    };
    let stream = futures::stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes()))),
    );
    sse_response(Body::from_stream(stream))
}

fn sse_response(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}
