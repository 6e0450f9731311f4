//! Installed formulae and casks, read from the Cellar and Caskroom

use crate::config::Config;
use crate::listing::{ListOptions, list_directory};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An installed formula name or cask token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstalledPackage {
    pub name: String,
}

impl InstalledPackage {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only view of what is installed, split into formulae and casks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackages {
    pub formulae: Vec<InstalledPackage>,
    pub casks: Vec<InstalledPackage>,
}

impl InstalledPackages {
    pub fn new(formulae: Vec<InstalledPackage>, casks: Vec<InstalledPackage>) -> Self {
        Self { formulae, casks }
    }

    pub fn from_names<F, C>(formulae: F, casks: C) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            formulae: formulae.into_iter().map(InstalledPackage::new).collect(),
            casks: casks.into_iter().map(InstalledPackage::new).collect(),
        }
    }

    /// Load installed formulae from the Cellar and casks from the Caskroom.
    /// Missing or unreadable directories count as nothing installed.
    pub fn load(config: &Config) -> Self {
        Self {
            formulae: read_package_dir(&config.cellar_dir),
            casks: read_package_dir(&config.caskroom_dir),
        }
    }

    pub fn len(&self) -> usize {
        self.formulae.len() + self.casks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulae.is_empty() && self.casks.is_empty()
    }
}

/// Both the Cellar and the Caskroom are laid out as `<name>/<version>/`;
/// only the names matter here.
fn read_package_dir(root: &Path) -> Vec<InstalledPackage> {
    let mut packages: Vec<InstalledPackage> =
        list_directory(root, ListOptions::skip_hidden().directories())
            .iter()
            .filter_map(|package_dir| package_dir.file_name())
            .map(|name| InstalledPackage::new(name.to_string_lossy()))
            .collect();

    packages.sort_by(|a, b| a.name.cmp(&b.name));
    packages.dedup_by(|a, b| a.name == b.name);
    packages
}
