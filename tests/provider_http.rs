//! The Claude.ai client against an in-process mock of the HTTP API.

mod common;

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use claudesync::config::{ConfigStore, Scope, CLAUDE_API_URL};
use claudesync::error::Error;
use claudesync::models::MessageEvent;
use claudesync::provider::{ClaudeAiProvider, Provider};
use common::{ORG, PROJECT, SESSION_KEY};

fn store(tmp: &TempDir, base_url: &str) -> Arc<ConfigStore> {
    let work = tmp.path().join("work");
    std::fs::create_dir_all(&work).unwrap();
    let config = ConfigStore::load(tmp.path().join("home/.claudesync"), work).unwrap();
    config.set(CLAUDE_API_URL, base_url, Scope::Global).unwrap();
    Arc::new(config)
}

async fn logged_in() -> (TempDir, ClaudeAiProvider, Arc<common::Mock>) {
    let (url, mock) = common::spawn().await;
    let tmp = TempDir::new().unwrap();
    let config = store(&tmp, &url);
    config
        .set_session_key("claude.ai", SESSION_KEY, Utc::now() + chrono::Duration::days(1))
        .unwrap();
    let provider = ClaudeAiProvider::new(config).unwrap();
    (tmp, provider, mock)
}

async fn collect(provider: &ClaudeAiProvider, chat: &str) -> Vec<MessageEvent> {
    provider
        .send_message(ORG, chat, "hi", "UTC")
        .await
        .unwrap()
        .collect()
        .await
}

#[tokio::test]
async fn test_organizations_use_session_cookie() {
    let (_tmp, provider, mock) = logged_in().await;
    let orgs = provider.get_organizations().await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id, ORG);
    assert_eq!(orgs[0].name, "Personal");
    assert_eq!(mock.requests(), vec!["GET /organizations"]);
}

#[tokio::test]
async fn test_missing_session_key_sends_nothing() {
    let (url, mock) = common::spawn().await;
    let tmp = TempDir::new().unwrap();
    let provider = ClaudeAiProvider::new(store(&tmp, &url)).unwrap();

    let err = provider.get_organizations().await.unwrap_err();
    assert!(matches!(err, Error::MissingCredential { .. }));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_verify_session_key_does_not_touch_config() {
    let (url, _mock) = common::spawn().await;
    let tmp = TempDir::new().unwrap();
    let config = store(&tmp, &url);
    let provider = ClaudeAiProvider::new(config.clone()).unwrap();

    let err = provider.verify_session_key("sk-wrong").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden));
    let orgs = provider.verify_session_key(SESSION_KEY).await.unwrap();
    assert_eq!(orgs[0].id, ORG);
    assert!(config.providers_with_session_keys().is_empty());
}

#[tokio::test]
async fn test_expired_key_is_forbidden() {
    let (url, _mock) = common::spawn().await;
    let tmp = TempDir::new().unwrap();
    let config = store(&tmp, &url);
    config
        .set_session_key("claude.ai", "sk-expired", Utc::now())
        .unwrap();
    let provider = ClaudeAiProvider::new(config).unwrap();
    let err = provider.get_projects(ORG, false).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden));
    assert!(err.to_string().contains("403 Forbidden"));
}

#[tokio::test]
async fn test_archived_projects_filtered_unless_requested() {
    let (_tmp, provider, _mock) = logged_in().await;
    let active = provider.get_projects(ORG, false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, PROJECT);

    let all = provider.get_projects(ORG, true).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[1].is_archived());
}

#[tokio::test]
async fn test_rate_limit_carries_reset_instant() {
    let (_tmp, provider, mock) = logged_in().await;
    let err = provider.get_projects("limited", false).await.unwrap_err();
    let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
    match &err {
        Error::RateLimited { resets_at } => assert_eq!(*resets_at, Some(expected)),
        other => panic!("expected rate limit, got {:?}", other),
    }
    assert!(err.to_string().contains("message limit exceeded"));
    assert_eq!(mock.requests().len(), 1, "no retry");
}

#[tokio::test]
async fn test_server_error_body_decoded_as_latin1() {
    let (_tmp, provider, _mock) = logged_in().await;
    let err = provider.get_projects("broken", false).await.unwrap_err();
    match err {
        Error::RequestFailed { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "café down");
        }
        other => panic!("expected request failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_and_archive_project() {
    let (_tmp, provider, mock) = logged_in().await;
    let project = provider
        .create_project(ORG, "Notes", "Project created with ClaudeSync")
        .await
        .unwrap();
    assert_eq!(project.id, "p-new");
    assert_eq!(project.name, "Notes");

    provider.archive_project(ORG, "p-new").await.unwrap();
    let bodies = mock.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0]["is_private"], true);
    assert_eq!(bodies[1]["is_archived"], true);
    assert_eq!(
        mock.requests(),
        vec![
            "POST /organizations/org-1/projects",
            "PUT /organizations/org-1/projects/p-new",
        ]
    );
}

#[tokio::test]
async fn test_document_upload_list_delete() {
    let (_tmp, provider, mock) = logged_in().await;
    provider
        .upload_file(ORG, PROJECT, "notes/a.md", "# A")
        .await
        .unwrap();
    let docs = provider.list_files(ORG, PROJECT).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].file_name, "notes/a.md");
    assert_eq!(docs[0].content, "# A");

    provider
        .delete_file(ORG, PROJECT, &docs[0].uuid)
        .await
        .unwrap();
    assert!(mock.doc_names().is_empty());

    let err = provider
        .delete_file(ORG, PROJECT, "doc-missing")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RequestFailed { status: 404, .. }));
}

#[tokio::test]
async fn test_gzip_chat_list_and_raw_conversation() {
    let (_tmp, provider, mock) = logged_in().await;
    let chats = provider.get_chat_conversations(ORG).await.unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].project_uuid.as_deref(), Some(PROJECT));

    let chat = provider.get_chat_conversation(ORG, "c-1").await.unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].content, "hello!");
    assert!(mock
        .requests()
        .contains(&"GET /organizations/org-1/chat_conversations/c-1?rendering_mode=raw".to_string()));
}

#[tokio::test]
async fn test_create_and_delete_chats() {
    let (_tmp, provider, mock) = logged_in().await;
    let chat = provider.create_chat(ORG, "", PROJECT).await.unwrap();
    assert_eq!(chat.uuid, "c-new");
    provider
        .delete_chat(ORG, &["c-1".to_string(), "c-new".to_string()])
        .await
        .unwrap();
    let bodies = mock.bodies.lock().unwrap().clone();
    assert_eq!(bodies[0]["project_uuid"], PROJECT);
    assert_eq!(
        bodies[1]["conversation_uuids"],
        serde_json::json!(["c-1", "c-new"])
    );
}

#[tokio::test]
async fn test_artifact_lookup() {
    let (_tmp, provider, _mock) = logged_in().await;
    assert_eq!(
        provider.get_artifact_content(ORG, "a-1").await.unwrap(),
        "fn main() {}"
    );
    let err = provider.get_artifact_content(ORG, "a-9").await.unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "artifact", .. }));
}

#[tokio::test]
async fn test_streamed_reply_in_order() {
    let (_tmp, provider, _mock) = logged_in().await;
    assert_eq!(
        collect(&provider, "hello").await,
        vec![
            MessageEvent::CompletionDelta("Hel".into()),
            MessageEvent::CompletionDelta("lo".into()),
            MessageEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_stream_without_done_just_ends() {
    let (_tmp, provider, _mock) = logged_in().await;
    assert_eq!(
        collect(&provider, "cut").await,
        vec![MessageEvent::CompletionDelta("partial".into())]
    );
}

#[tokio::test]
async fn test_in_band_error_ends_stream() {
    let (_tmp, provider, _mock) = logged_in().await;
    assert_eq!(
        collect(&provider, "failing").await,
        vec![
            MessageEvent::CompletionDelta("partial".into()),
            MessageEvent::Error(r#"{"error":"overloaded"}"#.into()),
        ]
    );
}

#[tokio::test]
async fn test_http_failure_arrives_as_error_event() {
    let (_tmp, provider, _mock) = logged_in().await;
    let events = collect(&provider, "unknown").await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        MessageEvent::Error(message) => assert!(message.contains("404")),
        other => panic!("expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_stream_is_cold_until_polled() {
    let (_tmp, provider, mock) = logged_in().await;
    let mut stream = provider
        .send_message(ORG, "hello", "hi", "UTC")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(mock.requests().is_empty());

    assert_eq!(
        stream.next().await,
        Some(MessageEvent::CompletionDelta("Hel".into()))
    );
    assert_eq!(
        mock.requests(),
        vec!["POST /organizations/org-1/chat_conversations/hello/completion"]
    );
    let body = mock.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["prompt"], "hi");
    assert_eq!(body["timezone"], "UTC");
}

#[tokio::test]
async fn test_cancel_releases_response_body() {
    let (_tmp, provider, mock) = logged_in().await;
    let mut stream = provider
        .send_message(ORG, "endless", "hi", "UTC")
        .await
        .unwrap();

    assert_eq!(
        stream.next().await,
        Some(MessageEvent::CompletionDelta("tick0".into()))
    );
    stream.cancel();
    assert_eq!(stream.next().await, None);

    let released = async {
        while !mock.stream_dropped.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), released)
        .await
        .expect("server should see the connection close");
}
