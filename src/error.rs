use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Size metadata for a cached artifact could not be read. Aborts the
    /// scan that hit it; previously committed state stays untouched.
    #[error("Size unavailable for {}", path.display())]
    SizeUnavailable { path: PathBuf },

    #[error("Failed to remove cached download {}: {source}", path.display())]
    CacheCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tap name format. Expected 'user/repo', got '{0}'")]
    InvalidTapName(String),

    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
