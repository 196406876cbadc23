//! `claudesync chat`: list, create, delete, message and pull conversations
//! of the active project.

use anyhow::{bail, Context, Result};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigStore;
use crate::models::{Conversation, MessageEvent};
use crate::provider::{self, Provider};

/// Folder under the sync root that `chat pull` writes into. Never pushed.
pub const CHATS_DIR: &str = "claude_chats";
const ARTIFACTS_DIR: &str = "artifacts";

async fn project_conversations(
    provider: &dyn Provider,
    organization_id: &str,
    project_id: &str,
) -> Result<Vec<Conversation>> {
    let mut conversations = provider.get_chat_conversations(organization_id).await?;
    conversations.retain(|c| c.project_uuid.as_deref() == Some(project_id));
    Ok(conversations)
}

pub async fn run_list(config: Arc<ConfigStore>) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let project_id = config.active_project_id()?;
    let provider = provider::active(config)?;

    let conversations = project_conversations(provider.as_ref(), &organization_id, &project_id).await?;
    if conversations.is_empty() {
        println!("No chats found.");
        return Ok(());
    }
    for chat in &conversations {
        let name = if chat.name.is_empty() { "(untitled)" } else { chat.name.as_str() };
        println!(
            "{}  {}  {}",
            chat.uuid,
            chat.updated_at.as_deref().unwrap_or("-"),
            name
        );
    }
    Ok(())
}

/// Delete the given chats, or every chat of the active project with `all`.
pub async fn run_remove(config: Arc<ConfigStore>, all: bool, ids: Vec<String>) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let ids = if all {
        let project_id = config.active_project_id()?;
        let provider = provider::active(config.clone())?;
        project_conversations(provider.as_ref(), &organization_id, &project_id)
            .await?
            .into_iter()
            .map(|c| c.uuid)
            .collect()
    } else {
        ids
    };
    if ids.is_empty() {
        if all {
            println!("No chats to delete.");
            return Ok(());
        }
        bail!("no chat IDs given; pass one or more UUIDs or --all");
    }

    let provider = provider::active(config)?;
    provider.delete_chat(&organization_id, &ids).await?;
    println!("Deleted {} chat(s).", ids.len());
    Ok(())
}

pub async fn run_init(
    config: Arc<ConfigStore>,
    name: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let project_id = match project {
        Some(id) => id,
        None => config.active_project_id()?,
    };
    let provider = provider::active(config)?;
    let chat = provider
        .create_chat(&organization_id, name.as_deref().unwrap_or(""), &project_id)
        .await?;
    println!("Created chat {}", chat.uuid);
    Ok(())
}

/// How a relayed completion stream ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Relay {
    Done,
    /// Body ended without a `[DONE]` marker.
    Truncated,
    Interrupted,
}

/// Copy completion text to `out` as it arrives until the stream ends or
/// `interrupt` resolves. An in-band error is returned as an error.
pub async fn relay<S, W, F>(stream: &mut S, out: &mut W, interrupt: F) -> Result<Relay>
where
    S: Stream<Item = MessageEvent> + Unpin,
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    loop {
        let event = tokio::select! {
            _ = &mut interrupt => return Ok(Relay::Interrupted),
            event = stream.next() => event,
        };
        match event {
            Some(MessageEvent::CompletionDelta(text)) => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
            Some(MessageEvent::Done) => return Ok(Relay::Done),
            Some(MessageEvent::Error(message)) => bail!("completion failed: {}", message),
            None => return Ok(Relay::Truncated),
        }
    }
}

/// Send `prompt` to `chat` (or to a fresh chat in the active project) and
/// stream the reply to stdout. Ctrl-C stops the stream.
pub async fn run_message(
    config: Arc<ConfigStore>,
    chat: Option<String>,
    timezone: &str,
    prompt: &str,
) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("message must not be empty");
    }
    let organization_id = config.active_organization_id()?;
    let provider = provider::active(config.clone())?;

    let chat_id = match chat {
        Some(id) => id,
        None => {
            let project_id = config.active_project_id()?;
            let chat = provider.create_chat(&organization_id, "", &project_id).await?;
            eprintln!("Created chat {}", chat.uuid);
            chat.uuid
        }
    };

    let mut stream = provider
        .send_message(&organization_id, &chat_id, prompt, timezone)
        .await?;
    let mut stdout = std::io::stdout();
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let outcome = relay(&mut stream, &mut stdout, interrupt).await;
    println!();
    match outcome? {
        Relay::Done => {}
        Relay::Truncated => tracing::warn!(chat = %chat_id, "stream ended without completion marker"),
        Relay::Interrupted => {
            stream.cancel();
            eprintln!("Cancelled.");
        }
    }
    Ok(())
}

/// Write every conversation of the active project, and the organization's
/// published artifacts, under `<root>/claude_chats/`.
pub async fn run_pull(config: Arc<ConfigStore>) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let project_id = config.active_project_id()?;
    let root = config.sync_root()?;
    let provider = provider::active(config)?;

    let summary = pull_into(provider.as_ref(), &organization_id, &project_id, &root).await?;
    println!(
        "Pulled {} chat(s) and {} artifact(s) into {}",
        summary.0,
        summary.1,
        root.join(CHATS_DIR).display()
    );
    Ok(())
}

async fn pull_into(
    provider: &dyn Provider,
    organization_id: &str,
    project_id: &str,
    root: &Path,
) -> Result<(usize, usize)> {
    let chats_dir = root.join(CHATS_DIR);
    let artifacts_dir = chats_dir.join(ARTIFACTS_DIR);
    std::fs::create_dir_all(&artifacts_dir)
        .with_context(|| format!("failed to create {}", artifacts_dir.display()))?;

    let listed = project_conversations(provider, organization_id, project_id).await?;
    for summary in &listed {
        let chat = provider
            .get_chat_conversation(organization_id, &summary.uuid)
            .await?;
        let path = chats_dir.join(format!("{}.json", chat.uuid));
        let mut body = serde_json::to_string_pretty(&chat)?;
        body.push('\n');
        std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(chat = %chat.uuid, "pulled chat");
    }

    let artifacts = provider.get_published_artifacts(organization_id).await?;
    for artifact in &artifacts {
        let path = artifacts_dir.join(format!("{}.txt", artifact.uuid));
        std::fs::write(&path, &artifact.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok((listed.len(), artifacts.len()))
}
