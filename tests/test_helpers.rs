// Test helpers for isolated testing
// Builds Homebrew-like trees in temporary directories
#![allow(dead_code)]

use brewsight::Config;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Isolated test environment using temporary directories
/// Automatically cleaned up when dropped (RAII pattern)
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub prefix: PathBuf,
    pub taps: PathBuf,
    pub cache: PathBuf,
    pub cellar: PathBuf,
    pub caskroom: PathBuf,
}

impl TestEnvironment {
    /// Create a new isolated test environment
    ///
    /// - temp/
    ///   - Library/Taps/  (tap clones)
    ///   - Cellar/        (installed formulae)
    ///   - Caskroom/      (installed casks)
    ///   - cache/downloads/ (cached artifacts)
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let prefix = temp_dir.path().to_path_buf();
        let taps = prefix.join("Library/Taps");
        let cache = prefix.join("cache/downloads");
        let cellar = prefix.join("Cellar");
        let caskroom = prefix.join("Caskroom");

        for dir in [&taps, &cache, &cellar, &caskroom] {
            fs::create_dir_all(dir).unwrap();
        }

        Self {
            temp_dir,
            prefix,
            taps,
            cache,
            cellar,
            caskroom,
        }
    }

    /// Configuration pointing at this environment, with a short oracle timeout
    pub fn config(&self) -> Config {
        Config::with_prefix(&self.prefix, &self.cache).oracle_timeout(Duration::from_millis(200))
    }

    /// Create `Library/Taps/<owner>/<repo_dir>` with a `.git` directory
    pub fn add_tap(&self, owner: &str, repo_dir: &str) -> PathBuf {
        let dir = self.taps.join(owner).join(repo_dir);
        fs::create_dir_all(dir.join(".git")).unwrap();
        dir
    }

    /// Write a cached artifact of exactly `size` bytes
    pub fn add_artifact(&self, filename: &str, size: usize) -> PathBuf {
        write_sized(&self.cache.join(filename), size)
    }

    /// Write a Homebrew API manifest such as `formula.jws.json` into `cache/api/`
    pub fn add_api_manifest(&self, filename: &str) -> PathBuf {
        let api = self.prefix.join("cache/api");
        fs::create_dir_all(&api).unwrap();
        write_sized(&api.join(filename), 16)
    }

    pub fn install_formula(&self, name: &str, version: &str) {
        fs::create_dir_all(self.cellar.join(name).join(version)).unwrap();
    }

    pub fn install_cask(&self, token: &str, version: &str) {
        fs::create_dir_all(self.caskroom.join(token).join(version)).unwrap();
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_sized(path: &Path, size: usize) -> PathBuf {
    fs::write(path, vec![0u8; size]).unwrap();
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_creates_directories() {
        let env = TestEnvironment::new();

        assert!(env.taps.exists());
        assert!(env.cache.exists());
        assert!(env.cellar.exists());
        assert!(env.caskroom.exists());
    }

    #[test]
    fn test_environment_cleanup() {
        let cache_path = {
            let env = TestEnvironment::new();
            env.cache.clone()
        };

        // After env is dropped, temp directory should be cleaned up
        assert!(!cache_path.exists());
    }

    #[test]
    fn test_config_points_into_environment() {
        let env = TestEnvironment::new();
        let config = env.config();

        assert_eq!(config.taps_dir, env.taps);
        assert_eq!(config.cache_dir, env.cache);
        assert_eq!(config.cellar_dir, env.cellar);
        assert_eq!(config.caskroom_dir, env.caskroom);
    }
}
