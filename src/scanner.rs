//! Local file scanner.
//!
//! Walks a sync root and fingerprints every regular file with a 16-byte MD5
//! digest, used only for change detection. Symlinks are not followed and
//! are skipped; directories contribute nothing on their own.

use md5::{Digest, Md5};
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::LocalMap;

/// Scan `root` and return relative path → hex digest.
///
/// Paths use `/` as the separator regardless of platform, since they double
/// as remote document names. Any I/O error aborts the scan.
pub fn scan(root: &Path) -> Result<LocalMap> {
    if !root.is_dir() {
        return Err(Error::io(
            root,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "sync root does not exist or is not a directory",
            ),
        ));
    }

    let mut files = LocalMap::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            Error::io(path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        files.insert(relative_name(relative), fingerprint(&content));
    }

    tracing::debug!(root = %root.display(), files = files.len(), "scan complete");
    Ok(files)
}

/// Hex-encoded MD5 of `content` (32 lowercase hex characters).
pub fn fingerprint(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
