//! Directory listing and size metadata for the reconciliation engines

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Filtering applied when listing a directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Leave out entries whose name starts with `.`
    pub skip_hidden: bool,
    /// Only return entries that resolve to directories
    pub directories_only: bool,
}

impl ListOptions {
    pub fn skip_hidden() -> Self {
        Self {
            skip_hidden: true,
            directories_only: false,
        }
    }

    pub fn directories(mut self) -> Self {
        self.directories_only = true;
        self
    }
}

/// List the direct children of `dir`, sorted by path.
///
/// An unreadable directory (missing, permission denied, not a directory)
/// yields an empty list; the failure is logged rather than returned.
pub fn list_directory(dir: &Path, options: ListOptions) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| !(options.skip_hidden && is_hidden(&entry.file_name().to_string_lossy())))
        .map(|entry| entry.path())
        .filter(|path| !options.directories_only || path.is_dir())
        .collect();

    paths.sort();
    paths
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Source of per-file size metadata
pub trait MetadataAccessor {
    /// Size in bytes, or `None` when the metadata cannot be read
    fn size(&self, path: &Path) -> Option<u64>;
}

/// Reads sizes from the real filesystem, following symlinks
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadata;

impl MetadataAccessor for FsMetadata {
    fn size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).ok().map(|m| m.len())
    }
}

/// Total size of all regular files below `path`.
///
/// Entries that cannot be read are left out of the sum; a missing root is 0.
pub fn directory_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    walkdir::WalkDir::new(path)
        .follow_links(false)
        .max_open(64)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
