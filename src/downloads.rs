//! Cached download scanning and classification.
//!
//! A scan lists the download cache, derives a package name for each artifact,
//! folds artifacts below the display threshold into one aggregate entry, and
//! sorts the rest by size. Classification is a separate pass against the
//! installed packages and is re-run whenever those change.

use crate::artifact::{normalize_name, parse_artifact_name};
use crate::config::Config;
use crate::error::{ReconcileError, Result};
use crate::listing::{FsMetadata, ListOptions, MetadataAccessor, directory_size, list_directory};
use crate::registry::{InstalledPackage, InstalledPackages};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Manifest sidecars stored next to the artifacts
const MANIFEST_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Formula,
    Cask,
    /// Not matched against the installed packages (or not classified yet)
    Unknown,
    /// The aggregate of artifacts too small to show on their own
    Other,
}

/// One artifact in the download cache, or the aggregate of the small ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDownload {
    pub package_name: String,
    pub size_in_bytes: u64,
    pub package_type: PackageType,
}

impl CachedDownload {
    /// An entry that has not been classified yet
    pub fn new(package_name: impl Into<String>, size_in_bytes: u64) -> Self {
        Self {
            package_name: package_name.into(),
            size_in_bytes,
            package_type: PackageType::Unknown,
        }
    }

    pub fn aggregate(label: impl Into<String>, size_in_bytes: u64) -> Self {
        Self {
            package_name: label.into(),
            size_in_bytes,
            package_type: PackageType::Other,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.package_type == PackageType::Other
    }

    fn with_type(&self, package_type: PackageType) -> Self {
        Self {
            package_type,
            ..self.clone()
        }
    }
}

/// Result of one cache scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheScan {
    /// Individual entries ascending by size, followed by the aggregate
    pub downloads: Vec<CachedDownload>,
    /// Total size of the cache directory when the scan ran
    pub folder_size: u64,
}

impl CacheScan {
    pub fn aggregate(&self) -> Option<&CachedDownload> {
        self.downloads.iter().find(|d| d.is_aggregate())
    }

    pub fn individual(&self) -> impl Iterator<Item = &CachedDownload> {
        self.downloads.iter().filter(|d| !d.is_aggregate())
    }

    /// Re-derive package types against `installed`
    pub fn classified(self, installed: &InstalledPackages) -> Self {
        Self {
            downloads: classify(&self.downloads, installed),
            folder_size: self.folder_size,
        }
    }
}

/// Scans the download cache configured in [`Config::cache_dir`]
pub struct CacheScanner<'a, M = FsMetadata> {
    config: &'a Config,
    metadata: M,
}

impl<'a> CacheScanner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            metadata: FsMetadata,
        }
    }
}

impl<'a, M: MetadataAccessor> CacheScanner<'a, M> {
    pub fn with_metadata(config: &'a Config, metadata: M) -> Self {
        Self { config, metadata }
    }

    /// Scan using the current size of the cache directory
    pub fn scan(&self) -> Result<CacheScan> {
        let folder_size = directory_size(&self.config.cache_dir);
        self.scan_with_folder_size(folder_size)
    }

    /// Scan against a known cache folder size.
    ///
    /// Fails only when an artifact's size cannot be read; nothing is returned
    /// for that run so callers keep their previous result.
    pub fn scan_with_folder_size(&self, folder_size: u64) -> Result<CacheScan> {
        let cache_dir = &self.config.cache_dir;
        let smallest_displayable_size = folder_size / self.config.threshold_divisor.max(1);

        let mut downloads = Vec::new();
        let mut too_small_size: u64 = 0;

        for path in list_directory(cache_dir, ListOptions::skip_hidden()) {
            if is_manifest(&path) || path.is_dir() {
                continue;
            }

            let Some(filename) = path.file_name().map(|f| f.to_string_lossy().to_string()) else {
                continue;
            };

            let package_name = match parse_artifact_name(&filename) {
                Ok(name) => name,
                Err(reason) => {
                    debug!("Skipping cached file {}: {}", filename, reason);
                    continue;
                }
            };
            debug!("Temp item name: {}", package_name);

            let size = self
                .metadata
                .size(&path)
                .ok_or_else(|| ReconcileError::SizeUnavailable { path: path.clone() })?;

            if size < smallest_displayable_size {
                too_small_size += size;
            } else {
                downloads.push(CachedDownload::new(package_name, size));
            }

            debug!("Others size: {}", too_small_size);
        }

        downloads.sort_by_key(|d| d.size_in_bytes);
        downloads.push(CachedDownload::aggregate(
            self.config.other_label.clone(),
            too_small_size,
        ));

        debug!("Cached downloads contents: {:?}", downloads);

        Ok(CacheScan {
            downloads,
            folder_size,
        })
    }
}

/// Delete everything in the download cache and return the space reclaimed,
/// measured as the folder size before the purge. A missing cache reclaims 0.
pub fn clear_cache(config: &Config) -> Result<u64> {
    let cache_dir = &config.cache_dir;
    if !cache_dir.exists() {
        return Ok(0);
    }

    let reclaimed = directory_size(cache_dir);
    info!("Will delete cached downloads in {}", cache_dir.display());

    for path in list_directory(cache_dir, ListOptions::default()) {
        let is_dir = fs::symlink_metadata(&path).is_ok_and(|m| m.is_dir());
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|source| ReconcileError::CacheCleanup {
            path: path.clone(),
            source,
        })?;
    }

    info!("Reclaimed {} bytes from cached downloads", reclaimed);
    Ok(reclaimed)
}

fn is_manifest(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
}

/// Assign formula/cask/unknown to every entry except the aggregate, which is kept as-is.
///
/// Names are reduced to their letters and matched case-insensitively as a
/// substring of installed names; formulae win over casks.
pub fn classify(downloads: &[CachedDownload], installed: &InstalledPackages) -> Vec<CachedDownload> {
    debug!(
        "Classifying {} cached downloads against {} installed packages",
        downloads.len(),
        installed.len()
    );

    downloads
        .iter()
        .map(|download| {
            if download.is_aggregate() {
                return download.clone();
            }

            let package_type = package_type_for(&download.package_name, installed);
            debug!(
                "Cached package {} ({}) is {:?}",
                download.package_name,
                normalize_name(&download.package_name),
                package_type
            );
            download.with_type(package_type)
        })
        .collect()
}

fn package_type_for(package_name: &str, installed: &InstalledPackages) -> PackageType {
    let normalized = normalize_name(package_name);
    if normalized.is_empty() {
        return PackageType::Unknown;
    }

    if contains_match(&installed.formulae, &normalized) {
        PackageType::Formula
    } else if contains_match(&installed.casks, &normalized) {
        PackageType::Cask
    } else {
        PackageType::Unknown
    }
}

fn contains_match(packages: &[InstalledPackage], normalized: &str) -> bool {
    packages
        .iter()
        .any(|package| package.name.to_lowercase().contains(normalized))
}
