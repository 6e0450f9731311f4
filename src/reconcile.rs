//! Runs tap discovery and the cache scan side by side and commits their results.
//!
//! # Examples
//!
//! ```no_run
//! use brewsight::{BrewTapOracle, Config, InstalledPackages, Reconciler};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let oracle = BrewTapOracle::from_config(&config);
//!     let reconciler = Reconciler::new(config, oracle);
//!
//!     let installed = InstalledPackages::load(reconciler.config());
//!     reconciler.refresh(&installed).await?;
//!
//!     for tap in reconciler.state().snapshot().taps {
//!         println!("{}", tap);
//!     }
//!     Ok(())
//! }
//! ```

use crate::config::Config;
use crate::downloads::{CacheScan, CacheScanner, clear_cache};
use crate::error::Result;
use crate::registry::InstalledPackages;
use crate::state::ReconciliationState;
use crate::tap::{Tap, TapDiscovery, TapOracle};
use anyhow::anyhow;
use std::future::Future;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed,
    /// Shutdown fired before anything was committed
    Cancelled,
}

/// Resolves once `signal` fires. A signal that cannot be listened for never
/// fires, so it cannot cancel anything.
pub async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

pub struct Reconciler<O> {
    config: Config,
    oracle: O,
    state: ReconciliationState,
}

impl<O: TapOracle + Sync> Reconciler<O> {
    pub fn new(config: Config, oracle: O) -> Self {
        Self {
            config,
            oracle,
            state: ReconciliationState::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub async fn discover_taps(&self) -> Vec<Tap> {
        TapDiscovery::new(&self.config, &self.oracle).discover().await
    }

    /// Scan the download cache off the async runtime. Results are unclassified.
    pub async fn scan_cache(&self) -> Result<CacheScan> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || CacheScanner::new(&config).scan())
            .await
            .map_err(|e| anyhow!("Cache scan did not complete: {}", e))?
    }

    /// Purge the download cache and commit the rescanned, now empty, cache.
    ///
    /// Returns the bytes reclaimed. On failure nothing is committed.
    pub async fn clear_cache(&self) -> Result<u64> {
        let config = self.config.clone();
        let reclaimed = tokio::task::spawn_blocking(move || clear_cache(&config))
            .await
            .map_err(|e| anyhow!("Cache cleanup did not complete: {}", e))??;

        let scan = self.scan_cache().await?;
        self.state.commit_cache_scan(scan);
        Ok(reclaimed)
    }

    /// Rediscover taps and rescan the cache, then commit both.
    ///
    /// Taps are committed even when the cache scan fails; in that case the
    /// previously committed downloads stay in place and the error is returned.
    pub async fn refresh(&self, installed: &InstalledPackages) -> Result<RefreshOutcome> {
        self.refresh_until(installed, std::future::pending()).await
    }

    /// Like [`refresh`](Self::refresh), but gives up without touching the state
    /// if `shutdown` resolves before both engines have finished.
    pub async fn refresh_until<F>(&self, installed: &InstalledPackages, shutdown: F) -> Result<RefreshOutcome>
    where
        F: Future<Output = ()>,
    {
        let (taps, scan) = tokio::select! {
            results = async { tokio::join!(self.discover_taps(), self.scan_cache()) } => results,
            _ = shutdown => {
                info!("Refresh cancelled before committing results");
                return Ok(RefreshOutcome::Cancelled);
            }
        };

        self.state.commit_taps(taps);

        match scan {
            Ok(scan) => {
                self.state.commit_cache_scan(scan.classified(installed));
                Ok(RefreshOutcome::Completed)
            }
            Err(e) => {
                warn!("Keeping previous cached downloads: {}", e);
                Err(e)
            }
        }
    }

    /// Re-derive cached download types after the installed packages changed
    pub fn reclassify(&self, installed: &InstalledPackages) {
        self.state.reclassify(installed);
    }
}
