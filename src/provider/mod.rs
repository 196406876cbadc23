//! Remote provider abstraction.
//!
//! Commands and the sync engine talk to the service through the
//! [`Provider`] trait so tests can substitute an in-memory implementation.
//! [`for_name`] resolves the provider stored in `active_provider`.
//!
//! # Implementations
//!
//! | Name | Type |
//! |------|------|
//! | `claude.ai` | [`ClaudeAiProvider`] |

pub mod claude_ai;
pub mod response;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::models::{Artifact, Conversation, Document, Organization, Project};
use crate::sse::MessageStream;

pub use claude_ai::ClaudeAiProvider;

/// Operations offered by a remote project host.
///
/// Every call is a single request (artifact lookup aside); nothing is
/// retried and every failure is returned to the caller.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used to look up the session key (e.g. `"claude.ai"`).
    fn name(&self) -> &str;

    /// Probe the service with a candidate session key without storing it.
    async fn verify_session_key(&self, session_key: &str) -> Result<Vec<Organization>>;

    async fn get_organizations(&self) -> Result<Vec<Organization>>;

    /// Projects of an organization; archived ones only when `include_archived`.
    async fn get_projects(
        &self,
        organization_id: &str,
        include_archived: bool,
    ) -> Result<Vec<Project>>;

    async fn create_project(
        &self,
        organization_id: &str,
        name: &str,
        description: &str,
    ) -> Result<Project>;

    async fn archive_project(&self, organization_id: &str, project_id: &str) -> Result<()>;

    async fn list_files(&self, organization_id: &str, project_id: &str) -> Result<Vec<Document>>;

    async fn upload_file(
        &self,
        organization_id: &str,
        project_id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<()>;

    async fn delete_file(&self, organization_id: &str, project_id: &str, uuid: &str)
        -> Result<()>;

    async fn get_chat_conversations(&self, organization_id: &str) -> Result<Vec<Conversation>>;

    async fn get_chat_conversation(
        &self,
        organization_id: &str,
        conversation_id: &str,
    ) -> Result<Conversation>;

    async fn create_chat(
        &self,
        organization_id: &str,
        name: &str,
        project_id: &str,
    ) -> Result<Conversation>;

    async fn delete_chat(&self, organization_id: &str, conversation_ids: &[String]) -> Result<()>;

    async fn get_published_artifacts(&self, organization_id: &str) -> Result<Vec<Artifact>>;

    /// Content of one published artifact, found by scanning the list.
    async fn get_artifact_content(&self, organization_id: &str, artifact_id: &str)
        -> Result<String>;

    /// Start a streamed completion. The request is sent when the returned
    /// stream is first polled.
    async fn send_message(
        &self,
        organization_id: &str,
        chat_id: &str,
        prompt: &str,
        timezone: &str,
    ) -> Result<MessageStream>;
}

/// Build the provider registered under `name`.
pub fn for_name(name: &str, config: Arc<ConfigStore>) -> Result<Box<dyn Provider>> {
    match name {
        claude_ai::PROVIDER_NAME => Ok(Box::new(ClaudeAiProvider::new(config)?)),
        other => Err(Error::config(format!(
            "unsupported provider: '{}'. Available: {}",
            other,
            claude_ai::PROVIDER_NAME
        ))),
    }
}

/// Build the provider named by `active_provider`.
pub fn active(config: Arc<ConfigStore>) -> Result<Box<dyn Provider>> {
    let name = config.active_provider();
    for_name(&name, config)
}
