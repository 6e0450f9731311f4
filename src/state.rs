//! Observable reconciliation state.
//!
//! Engines never patch the state in place: each commit swaps a whole list, and
//! subscribers receive the new [`Snapshot`] over a `watch` channel.

use crate::downloads::{CacheScan, CachedDownload, classify};
use crate::registry::InstalledPackages;
use crate::tap::Tap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub taps: Vec<Tap>,
    pub cached_downloads: Vec<CachedDownload>,
    pub cached_downloads_folder_size: u64,
}

impl Snapshot {
    /// The aggregate of downloads too small to show individually
    pub fn aggregate(&self) -> Option<&CachedDownload> {
        self.cached_downloads.iter().find(|d| d.is_aggregate())
    }

    pub fn individual_downloads(&self) -> impl Iterator<Item = &CachedDownload> {
        self.cached_downloads.iter().filter(|d| !d.is_aggregate())
    }
}

pub type StateReceiver = watch::Receiver<Snapshot>;

#[derive(Debug)]
pub struct ReconciliationState {
    tx: watch::Sender<Snapshot>,
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx }
    }

    /// Receive every committed snapshot from now on
    pub fn subscribe(&self) -> StateReceiver {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn commit_taps(&self, taps: Vec<Tap>) {
        debug!("Committing {} taps", taps.len());
        self.tx.send_modify(|snapshot| snapshot.taps = taps);
    }

    pub fn commit_cache_scan(&self, scan: CacheScan) {
        debug!("Committing {} cached downloads", scan.downloads.len());
        self.tx.send_modify(|snapshot| {
            snapshot.cached_downloads = scan.downloads;
            snapshot.cached_downloads_folder_size = scan.folder_size;
        });
    }

    /// Re-derive package types of the committed downloads against `installed`
    ///
    /// Reads and writes under the same lock, so a scan committed concurrently is
    /// either classified here or lands afterwards, never overwritten.
    pub fn reclassify(&self, installed: &InstalledPackages) {
        self.tx.send_modify(|snapshot| {
            snapshot.cached_downloads = classify(&snapshot.cached_downloads, installed);
        });
    }
}
