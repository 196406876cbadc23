//! `claudesync push`: make the active project's documents mirror the local
//! sync root.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;

use crate::config::{ConfigStore, SYNC_CHANGE_DETECTION};
use crate::models::LocalMap;
use crate::progress::{ProgressMode, SyncProgressEvent};
use crate::provider;
use crate::scanner;
use crate::sync::{ChangeDetection, SyncEngine};

/// Paths never pushed, whatever the configuration says.
pub const DEFAULT_EXCLUDES: &[&str] = &[".claudesync/**", ".git/**", "claude_chats/**"];

pub async fn run_push(
    config: Arc<ConfigStore>,
    progress: ProgressMode,
    change_detection: Option<ChangeDetection>,
) -> Result<()> {
    let organization_id = config.active_organization_id()?;
    let project_id = config.active_project_id()?;
    let root = config.sync_root()?;
    let detection = match change_detection {
        Some(mode) => mode,
        None => match config.get_string(SYNC_CHANGE_DETECTION) {
            Some(raw) => raw.parse()?,
            None => ChangeDetection::default(),
        },
    };

    let scanned = scanner::scan(&root)?;
    let excludes = build_excludes(&config.push_excludes())?;
    let local = apply_excludes(scanned, &excludes);

    let reporter = progress.reporter();
    reporter.report(SyncProgressEvent::Scanned {
        files: local.len() as u64,
    });

    let provider = provider::active(config)?;
    let remote = provider.list_files(&organization_id, &project_id).await?;
    tracing::debug!(local = local.len(), remote = remote.len(), ?detection, "starting push");

    let engine = SyncEngine::new(provider.as_ref(), organization_id, project_id, root)
        .with_change_detection(detection)
        .with_reporter(reporter.as_ref());
    let report = engine.sync(&local, &remote).await?;

    println!(
        "Sync completed successfully: {} uploaded, {} updated, {} deleted",
        report.uploaded.len(),
        report.updated.len(),
        report.deleted.len()
    );
    Ok(())
}

/// Built-in excludes plus `extra` patterns.
pub fn build_excludes(extra: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_EXCLUDES.iter().copied().chain(extra.iter().map(String::as_str)) {
        let glob = Glob::new(pattern).with_context(|| format!("invalid exclude pattern '{}'", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Drop every entry whose relative name matches `excludes`.
pub fn apply_excludes(mut local: LocalMap, excludes: &GlobSet) -> LocalMap {
    local.retain(|name, _| !excludes.is_match(name));
    local
}
