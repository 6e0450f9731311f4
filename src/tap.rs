//! Tap discovery - merging locally cloned taps with authoritative presence checks

use crate::config::Config;
use crate::error::{ReconcileError, Result};
use crate::listing::{ListOptions, list_directory};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Repository directories are named `homebrew-<repo>`
pub const TAP_REPO_PREFIX: &str = "homebrew-";

/// Taps every Homebrew installation is expected to have, checked with the oracle
/// when they are not cloned locally
pub const WELL_KNOWN_TAPS: [&str; 2] = ["homebrew/core", "homebrew/cask"];

/// A registered package source, named `<owner>/<repo>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tap {
    name: String,
}

impl Tap {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            name: format!("{}/{}", owner, repo),
        }
    }

    /// Parse a tap name into its two segments.
    /// A `homebrew-` prefix on the repo segment is dropped: "user/homebrew-repo" → "user/repo"
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
            return Err(ReconcileError::InvalidTapName(name.to_string()));
        }

        let repo = parts[1].strip_prefix(TAP_REPO_PREFIX).unwrap_or(parts[1]);
        if repo.is_empty() {
            return Err(ReconcileError::InvalidTapName(name.to_string()));
        }

        Ok(Self::new(parts[0], repo))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        self.name.split_once('/').map_or(self.name.as_str(), |(owner, _)| owner)
    }

    pub fn repo(&self) -> &str {
        self.name.split_once('/').map_or("", |(_, repo)| repo)
    }

    /// On-disk repository directory name, e.g. `homebrew-core`
    pub fn directory_name(&self) -> String {
        format!("{}{}", TAP_REPO_PREFIX, self.repo())
    }

    /// Full path of this tap below the taps directory
    pub fn directory(&self, taps_dir: &Path) -> PathBuf {
        taps_dir.join(self.owner()).join(self.directory_name())
    }
}

impl fmt::Display for Tap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// External authority answering "is this tap currently registered?"
pub trait TapOracle {
    fn is_tap_registered(&self, name: &str) -> impl Future<Output = anyhow::Result<bool>> + Send;
}

/// Asks `brew tap`, which also lists API-backed taps that have no local clone
#[derive(Debug, Clone)]
pub struct BrewTapOracle {
    brew: PathBuf,
}

impl BrewTapOracle {
    pub fn new(brew: impl Into<PathBuf>) -> Self {
        Self { brew: brew.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.brew_executable)
    }
}

impl TapOracle for BrewTapOracle {
    fn is_tap_registered(&self, name: &str) -> impl Future<Output = anyhow::Result<bool>> + Send {
        let brew = self.brew.clone();
        let name = name.to_string();
        async move {
            let output = tokio::process::Command::new(&brew)
                .arg("tap")
                .env("HOMEBREW_NO_AUTO_UPDATE", "1")
                .kill_on_drop(true)
                .output()
                .await?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("brew tap failed: {}", stderr.trim());
            }

            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(stdout.lines().any(|line| line.trim() == name))
        }
    }
}

/// Answers from Homebrew's JSON API cache, without running `brew`.
///
/// Since Homebrew 4 the core and cask taps are served from the API and need no
/// clone; a downloaded API manifest means the tap is in use.
#[derive(Debug, Clone)]
pub struct ApiTapOracle {
    api_cache_dir: PathBuf,
    api_enabled: bool,
}

impl ApiTapOracle {
    pub fn new(api_cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_cache_dir: api_cache_dir.into(),
            api_enabled: true,
        }
    }

    /// Honors `HOMEBREW_NO_INSTALL_FROM_API`, under which no tap is API-backed
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_enabled: std::env::var_os("HOMEBREW_NO_INSTALL_FROM_API").is_none(),
            ..Self::new(&config.api_cache_dir)
        }
    }

    fn manifest_for(&self, name: &str) -> Option<PathBuf> {
        let manifest = match name {
            "homebrew/core" => "formula.jws.json",
            "homebrew/cask" => "cask.jws.json",
            _ => return None,
        };
        Some(self.api_cache_dir.join(manifest))
    }
}

impl TapOracle for ApiTapOracle {
    fn is_tap_registered(&self, name: &str) -> impl Future<Output = anyhow::Result<bool>> + Send {
        let manifest = self.manifest_for(name).filter(|_| self.api_enabled);
        async move {
            let Some(manifest) = manifest else {
                return Ok(false);
            };
            Ok(tokio::fs::try_exists(&manifest).await?)
        }
    }
}

/// Taps found by walking `<taps_dir>/<owner>/homebrew-<repo>`.
///
/// Unreadable directories contribute nothing. Repository directory names lose
/// their fixed 9-character prefix; names that would come out empty are skipped,
/// as are names already seen.
pub fn local_taps(taps_dir: &Path) -> Vec<Tap> {
    let owners = list_directory(taps_dir, ListOptions::skip_hidden().directories());
    debug!("Contents of tap folder: {:?}", owners);

    let mut seen = HashSet::new();
    let mut taps = Vec::new();

    for owner_dir in owners {
        debug!("Tap repo: {}", owner_dir.display());
        let Some(owner) = file_name(&owner_dir) else {
            continue;
        };

        for repo_dir in list_directory(&owner_dir, ListOptions::skip_hidden().directories()) {
            let Some(raw_repo) = file_name(&repo_dir) else {
                continue;
            };

            let repo: String = raw_repo.chars().skip(TAP_REPO_PREFIX.len()).collect();
            if repo.is_empty() {
                warn!("Ignoring tap directory with no repository name: {}", repo_dir.display());
                continue;
            }

            let tap = Tap::new(&owner, &repo);
            info!("Full tap name: {}", tap);

            if seen.insert(tap.clone()) {
                taps.push(tap);
            }
        }
    }

    taps
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

/// Discovers all registered taps: local clones first, then any well-known tap
/// the oracle confirms.
pub struct TapDiscovery<'a, O> {
    config: &'a Config,
    oracle: &'a O,
}

impl<'a, O: TapOracle + Sync> TapDiscovery<'a, O> {
    pub fn new(config: &'a Config, oracle: &'a O) -> Self {
        Self { config, oracle }
    }

    pub async fn discover(&self) -> Vec<Tap> {
        let taps_dir = self.config.taps_dir.clone();
        let mut taps = match tokio::task::spawn_blocking(move || local_taps(&taps_dir)).await {
            Ok(taps) => taps,
            Err(e) => {
                warn!("Local tap scan did not complete: {}", e);
                Vec::new()
            }
        };

        let missing: Vec<&str> = WELL_KNOWN_TAPS
            .into_iter()
            .filter(|name| {
                let found = taps.iter().any(|tap| tap.name() == *name);
                if found {
                    info!("Found {} in local taps", name);
                } else {
                    warn!("Couldn't find {} in local taps", name);
                }
                !found
            })
            .collect();

        // At most one check per well-known tap, all in flight at once
        let checks = missing.into_iter().map(|name| self.check_well_known(name));
        let confirmed = futures::future::join_all(checks).await;

        taps.extend(confirmed.into_iter().flatten());
        taps
    }

    async fn check_well_known(&self, name: &str) -> Option<Tap> {
        let timeout = self.config.oracle_timeout;

        match tokio::time::timeout(timeout, self.oracle.is_tap_registered(name)).await {
            Ok(Ok(true)) => {
                info!("{} is added, but not in local taps", name);
                Tap::parse(name).ok()
            }
            Ok(Ok(false)) => {
                warn!("{} is not added and not in local taps", name);
                None
            }
            Ok(Err(e)) => {
                warn!("Failed to check whether {} is added: {}", name, e);
                None
            }
            Err(_) => {
                warn!("Timed out after {:?} checking whether {} is added", timeout, name);
                None
            }
        }
    }
}
