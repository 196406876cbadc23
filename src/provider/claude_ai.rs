//! HTTP client for the Claude.ai web API.
//!
//! All calls share one request pipeline:
//!
//! 1. URL = `claude_api_url` + endpoint (read from config per request)
//! 2. optional JSON body
//! 3. browser-like headers plus `Cookie: sessionKey=<key>`, with the key
//!    resolved from config at send time
//! 4. gzip bodies decoded, non-2xx statuses classified
//!    (see [`response`](super::response))
//!
//! The service rejects obviously non-browser user agents, hence the Firefox
//! string below.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{response, Provider};
use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::models::{Artifact, Conversation, Document, Organization, Project};
use crate::sse::MessageStream;

pub const PROVIDER_NAME: &str = "claude.ai";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:129.0) Gecko/20100101 Firefox/129.0";

/// Claude.ai provider. Owns its connection pool; borrows credentials from
/// the shared [`ConfigStore`].
pub struct ClaudeAiProvider {
    config: Arc<ConfigStore>,
    client: Client,
}

impl ClaudeAiProvider {
    pub fn new(config: Arc<ConfigStore>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { config, client })
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(config: Arc<ConfigStore>, client: Client) -> Self {
        Self { config, client }
    }

    fn session_key(&self) -> Result<String> {
        Ok(self.config.session_key(PROVIDER_NAME)?.key)
    }

    fn build(&self, method: Method, endpoint: &str, session_key: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.api_url(), endpoint);
        tracing::debug!(%method, %url, "making request");
        self.client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(COOKIE, format!("sessionKey={}", session_key))
    }

    /// Run the shared pipeline and return the decoded body of a 2xx response.
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        session_key: Option<&str>,
    ) -> Result<Vec<u8>> {
        let session_key = match session_key {
            Some(key) => key.to_string(),
            None => self.session_key()?,
        };

        let mut request = self
            .build(method, endpoint, &session_key)
            .header(ACCEPT_ENCODING, "gzip");
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        tracing::debug!(status = status.as_u16(), "received response");

        let raw = resp.bytes().await?;
        let body = response::decode_body(&headers, &raw)?;

        if !status.is_success() {
            return Err(response::classify(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let bytes = self.execute(method, endpoint, body, None).await?;
        decode_json(&bytes, endpoint)
    }

    async fn request_empty(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<()> {
        self.execute(method, endpoint, body, None).await?;
        Ok(())
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8], endpoint: &str) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        Error::protocol(format!("unexpected response from {}: {}", endpoint, e))
    })
}

fn docs_endpoint(organization_id: &str, project_id: &str) -> String {
    format!(
        "/organizations/{}/projects/{}/docs",
        organization_id, project_id
    )
}

#[async_trait]
impl Provider for ClaudeAiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn verify_session_key(&self, session_key: &str) -> Result<Vec<Organization>> {
        let endpoint = "/organizations";
        let bytes = self
            .execute(Method::GET, endpoint, None, Some(session_key))
            .await?;
        decode_json(&bytes, endpoint)
    }

    async fn get_organizations(&self) -> Result<Vec<Organization>> {
        self.request_json(Method::GET, "/organizations", None).await
    }

    async fn get_projects(
        &self,
        organization_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Project>> {
        let endpoint = format!("/organizations/{}/projects", organization_id);
        let mut projects: Vec<Project> = self.request_json(Method::GET, &endpoint, None).await?;
        if !include_archived {
            projects.retain(|p| !p.is_archived());
        }
        Ok(projects)
    }

    async fn create_project(
        &self,
        organization_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Project> {
        let endpoint = format!("/organizations/{}/projects", organization_id);
        let body = json!({
            "name": name,
            "description": description,
            "is_private": true,
        });
        self.request_json(Method::POST, &endpoint, Some(&body)).await
    }

    async fn archive_project(&self, organization_id: &str, project_id: &str) -> Result<()> {
        let endpoint = format!("/organizations/{}/projects/{}", organization_id, project_id);
        let body = json!({ "is_archived": true });
        self.request_empty(Method::PUT, &endpoint, Some(&body)).await
    }

    async fn list_files(&self, organization_id: &str, project_id: &str) -> Result<Vec<Document>> {
        self.request_json(Method::GET, &docs_endpoint(organization_id, project_id), None)
            .await
    }

    async fn upload_file(
        &self,
        organization_id: &str,
        project_id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<()> {
        let body = json!({
            "file_name": file_name,
            "content": content,
        });
        self.request_empty(
            Method::POST,
            &docs_endpoint(organization_id, project_id),
            Some(&body),
        )
        .await
    }

    async fn delete_file(
        &self,
        organization_id: &str,
        project_id: &str,
        uuid: &str,
    ) -> Result<()> {
        let endpoint = format!("{}/{}", docs_endpoint(organization_id, project_id), uuid);
        self.request_empty(Method::DELETE, &endpoint, None).await
    }

    async fn get_chat_conversations(&self, organization_id: &str) -> Result<Vec<Conversation>> {
        let endpoint = format!("/organizations/{}/chat_conversations", organization_id);
        self.request_json(Method::GET, &endpoint, None).await
    }

    async fn get_chat_conversation(
        &self,
        organization_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation> {
        let endpoint = format!(
            "/organizations/{}/chat_conversations/{}?rendering_mode=raw",
            organization_id, conversation_id
        );
        self.request_json(Method::GET, &endpoint, None).await
    }

    async fn create_chat(
        &self,
        organization_id: &str,
        name: &str,
        project_id: &str,
    ) -> Result<Conversation> {
        let endpoint = format!("/organizations/{}/chat_conversations", organization_id);
        let body = json!({
            "name": name,
            "project_uuid": project_id,
        });
        self.request_json(Method::POST, &endpoint, Some(&body)).await
    }

    async fn delete_chat(&self, organization_id: &str, conversation_ids: &[String]) -> Result<()> {
        let endpoint = format!(
            "/organizations/{}/chat_conversations/delete_many",
            organization_id
        );
        let body = json!({ "conversation_uuids": conversation_ids });
        self.request_empty(Method::POST, &endpoint, Some(&body)).await
    }

    async fn get_published_artifacts(&self, organization_id: &str) -> Result<Vec<Artifact>> {
        let endpoint = format!("/organizations/{}/published_artifacts", organization_id);
        self.request_json(Method::GET, &endpoint, None).await
    }

    async fn get_artifact_content(
        &self,
        organization_id: &str,
        artifact_id: &str,
    ) -> Result<String> {
        self.get_published_artifacts(organization_id)
            .await?
            .into_iter()
            .find(|a| a.uuid == artifact_id)
            .map(|a| a.content)
            .ok_or_else(|| Error::NotFound {
                entity: "artifact",
                id: artifact_id.to_string(),
            })
    }

    async fn send_message(
        &self,
        organization_id: &str,
        chat_id: &str,
        prompt: &str,
        timezone: &str,
    ) -> Result<MessageStream> {
        let session_key = self.session_key()?;
        let endpoint = format!(
            "/organizations/{}/chat_conversations/{}/completion",
            organization_id, chat_id
        );
        let body = json!({
            "prompt": prompt,
            "timezone": timezone,
            "attachments": [],
            "files": [],
        });
        let request = self
            .build(Method::POST, &endpoint, &session_key)
            .header(ACCEPT, "text/event-stream")
            .header(ACCEPT_ENCODING, "identity")
            .body(serde_json::to_vec(&body)?);
        Ok(MessageStream::new(request))
    }
}
