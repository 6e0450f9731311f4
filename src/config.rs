//! Paths and tunables shared by the reconciliation engines.
//!
//! A [`Config`] is built once (usually via [`Config::from_env`]) and handed to
//! each engine explicitly, so tests can point everything at a temporary tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for a single "is this tap registered" check
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Artifacts smaller than `folder size / divisor` are folded into the aggregate
pub const DEFAULT_THRESHOLD_DIVISOR: u64 = 50;

/// Label used for the aggregate of small cached downloads
pub const DEFAULT_OTHER_LABEL: &str = "Other smaller packages";

#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: PathBuf,
    pub taps_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Homebrew's JSON API cache, a sibling of the downloads directory
    pub api_cache_dir: PathBuf,
    pub cellar_dir: PathBuf,
    pub caskroom_dir: PathBuf,
    pub brew_executable: PathBuf,
    pub oracle_timeout: Duration,
    pub threshold_divisor: u64,
    pub other_label: String,
}

impl Config {
    /// Build a configuration rooted at `prefix`, using the standard Homebrew layout
    pub fn with_prefix(prefix: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        let cache_dir = cache_dir.into();
        Self {
            taps_dir: prefix.join("Library/Taps"),
            cellar_dir: prefix.join("Cellar"),
            caskroom_dir: prefix.join("Caskroom"),
            brew_executable: prefix.join("bin/brew"),
            api_cache_dir: api_cache_dir_for(&cache_dir),
            cache_dir,
            prefix,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            threshold_divisor: DEFAULT_THRESHOLD_DIVISOR,
            other_label: DEFAULT_OTHER_LABEL.to_string(),
        }
    }

    /// Detect the configuration from the environment
    pub fn from_env() -> Self {
        let mut config = Self::with_prefix(detect_prefix(), detect_cache_dir());
        if let Some(brew) = std::env::var_os("HOMEBREW_BREW_FILE") {
            config.brew_executable = PathBuf::from(brew);
        }
        config
    }

    pub fn taps_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.taps_dir = path.into();
        self
    }

    /// Also moves the API cache next to the new downloads directory
    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = path.into();
        self.api_cache_dir = api_cache_dir_for(&self.cache_dir);
        self
    }

    pub fn api_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.api_cache_dir = path.into();
        self
    }

    pub fn oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// A divisor of zero would make every artifact "large"; it is clamped to 1.
    pub fn threshold_divisor(mut self, divisor: u64) -> Self {
        self.threshold_divisor = divisor.max(1);
        self
    }

    pub fn other_label(mut self, label: impl Into<String>) -> Self {
        self.other_label = label.into();
        self
    }
}

fn api_cache_dir_for(cache_dir: &Path) -> PathBuf {
    cache_dir.parent().unwrap_or(cache_dir).join("api")
}

/// Detect the Homebrew prefix on this system
pub fn detect_prefix() -> PathBuf {
    if let Ok(prefix) = std::env::var("HOMEBREW_PREFIX") {
        return PathBuf::from(prefix);
    }

    #[cfg(target_arch = "aarch64")]
    {
        PathBuf::from("/opt/homebrew")
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        PathBuf::from("/usr/local")
    }
}

/// Detect the directory holding Homebrew's downloaded artifacts
pub fn detect_cache_dir() -> PathBuf {
    if let Some(cache) = std::env::var_os("HOMEBREW_CACHE") {
        return PathBuf::from(cache).join("downloads");
    }

    let home = std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "macos")
        && let Some(home) = &home
    {
        return home.join("Library/Caches/Homebrew/downloads");
    }

    if let Some(cache_home) = std::env::var_os("XDG_CACHE_HOME") {
        PathBuf::from(cache_home).join("Homebrew/downloads")
    } else if let Some(home) = home {
        home.join(".cache/Homebrew/downloads")
    } else {
        Path::new(".cache/Homebrew/downloads").to_path_buf()
    }
}
