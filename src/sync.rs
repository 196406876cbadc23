//! Push reconciliation between a local file map and a remote document list.
//!
//! Identity is the document's `file_name` (path relative to the sync root).
//! A run has two phases, always in this order:
//!
//! 1. **upload**: every local file missing remotely is uploaded; every local
//!    file present remotely but considered changed is uploaded again.
//! 2. **delete**: every remote document whose name is not local is deleted
//!    by uuid.
//!
//! Uploading first means a rename never leaves the project empty in
//! between. Requests are issued one at a time; the first failure aborts the
//! run and earlier operations stay applied.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{Document, LocalMap};
use crate::progress::{NoProgress, SyncProgressEvent, SyncProgressReporter};
use crate::provider::Provider;
use crate::scanner;

/// How an existing remote document is judged changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ChangeDetection {
    /// Compare the local fingerprint with the remote content string as-is.
    /// Remote content is full text, so existing files are effectively
    /// always re-uploaded.
    #[default]
    Fingerprint,
    /// Fingerprint the remote content too and compare digests.
    Digest,
}

impl FromStr for ChangeDetection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fingerprint" => Ok(Self::Fingerprint),
            "digest" => Ok(Self::Digest),
            other => Err(Error::config(format!(
                "unknown change detection '{}': expected fingerprint or digest",
                other
            ))),
        }
    }
}

impl ChangeDetection {
    fn is_changed(&self, local_fingerprint: &str, remote: &Document) -> bool {
        match self {
            Self::Fingerprint => local_fingerprint != remote.content,
            Self::Digest => local_fingerprint != scanner::fingerprint(remote.content.as_bytes()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    New,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub file_name: String,
    pub kind: UploadKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub uuid: String,
    pub file_name: String,
}

/// The operations one push would perform, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub uploads: Vec<PlannedUpload>,
    pub deletions: Vec<PlannedDeletion>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.deletions.is_empty()
    }
}

/// Names acted on by a completed push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

/// Decide what to upload and delete. Pure; no I/O.
pub fn plan(local: &LocalMap, remote: &[Document], detection: ChangeDetection) -> SyncPlan {
    let mut by_name: HashMap<&str, &Document> = HashMap::with_capacity(remote.len());
    for doc in remote {
        by_name.entry(doc.file_name.as_str()).or_insert(doc);
    }

    let uploads = local
        .iter()
        .filter_map(|(name, fingerprint)| match by_name.get(name.as_str()) {
            None => Some(PlannedUpload {
                file_name: name.clone(),
                kind: UploadKind::New,
            }),
            Some(doc) if detection.is_changed(fingerprint, doc) => Some(PlannedUpload {
                file_name: name.clone(),
                kind: UploadKind::Changed,
            }),
            Some(_) => None,
        })
        .collect();

    let deletions = remote
        .iter()
        .filter(|doc| !local.contains_key(&doc.file_name))
        .map(|doc| PlannedDeletion {
            uuid: doc.uuid.clone(),
            file_name: doc.file_name.clone(),
        })
        .collect();

    SyncPlan { uploads, deletions }
}

static NO_PROGRESS: NoProgress = NoProgress;

/// Drives a [`SyncPlan`] against one remote project.
pub struct SyncEngine<'a> {
    provider: &'a dyn Provider,
    organization_id: String,
    project_id: String,
    root: PathBuf,
    detection: ChangeDetection,
    reporter: &'a dyn SyncProgressReporter,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        organization_id: impl Into<String>,
        project_id: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            organization_id: organization_id.into(),
            project_id: project_id.into(),
            root: root.into(),
            detection: ChangeDetection::default(),
            reporter: &NO_PROGRESS,
        }
    }

    pub fn with_change_detection(mut self, detection: ChangeDetection) -> Self {
        self.detection = detection;
        self
    }

    pub fn with_reporter(mut self, reporter: &'a dyn SyncProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reconcile the remote project with `local`.
    pub async fn sync(&self, local: &LocalMap, remote: &[Document]) -> Result<SyncReport> {
        let plan = plan(local, remote, self.detection);
        let mut report = SyncReport::default();

        for upload in &plan.uploads {
            let content = self.read_local(&upload.file_name).await?;
            self.provider
                .upload_file(
                    &self.organization_id,
                    &self.project_id,
                    &upload.file_name,
                    &content,
                )
                .await?;

            let file_name = upload.file_name.clone();
            match upload.kind {
                UploadKind::New => {
                    tracing::info!(file = %file_name, "uploaded");
                    self.reporter.report(SyncProgressEvent::Uploaded {
                        file_name: file_name.clone(),
                    });
                    report.uploaded.push(file_name);
                }
                UploadKind::Changed => {
                    tracing::info!(file = %file_name, "updated");
                    self.reporter.report(SyncProgressEvent::Updated {
                        file_name: file_name.clone(),
                    });
                    report.updated.push(file_name);
                }
            }
        }

        for deletion in &plan.deletions {
            self.provider
                .delete_file(&self.organization_id, &self.project_id, &deletion.uuid)
                .await?;
            tracing::info!(file = %deletion.file_name, uuid = %deletion.uuid, "deleted");
            self.reporter.report(SyncProgressEvent::Deleted {
                file_name: deletion.file_name.clone(),
            });
            report.deleted.push(deletion.file_name.clone());
        }

        Ok(report)
    }

    async fn read_local(&self, file_name: &str) -> Result<String> {
        let path = self.root.join(file_name);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
