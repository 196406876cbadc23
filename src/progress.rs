//! Push progress reporting.
//!
//! Reports what `claudesync push` is doing so users can follow each upload
//! and deletion. Progress is emitted on **stderr** so stdout stays parseable
//! for scripts.

use std::io::Write;

/// A single progress event for push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncProgressEvent {
    /// Local scan finished with this many files.
    Scanned { files: u64 },
    /// New remote document created.
    Uploaded { file_name: String },
    /// Existing remote document re-uploaded.
    Updated { file_name: String },
    /// Remote document with no local counterpart removed.
    Deleted { file_name: String },
}

/// Reports push progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the sync engine.
    fn report(&self, event: SyncProgressEvent);
}

/// Human-friendly progress on stderr: "push  uploaded  docs/a.md".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let line = match &event {
            SyncProgressEvent::Scanned { files } => {
                format!("push  scanned  {} local files\n", format_number(*files))
            }
            SyncProgressEvent::Uploaded { file_name } => format!("push  uploaded  {}\n", file_name),
            SyncProgressEvent::Updated { file_name } => format!("push  updated   {}\n", file_name),
            SyncProgressEvent::Deleted { file_name } => format!("push  deleted   {}\n", file_name),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        let obj = match &event {
            SyncProgressEvent::Scanned { files } => serde_json::json!({
                "event": "progress",
                "phase": "scanned",
                "files": files
            }),
            SyncProgressEvent::Uploaded { file_name } => serde_json::json!({
                "event": "progress",
                "phase": "uploaded",
                "file_name": file_name
            }),
            SyncProgressEvent::Updated { file_name } => serde_json::json!({
                "event": "progress",
                "phase": "updated",
                "file_name": file_name
            }),
            SyncProgressEvent::Deleted { file_name } => serde_json::json!({
                "event": "progress",
                "phase": "deleted",
                "file_name": file_name
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
