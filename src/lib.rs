//! Library interface for brewsight
//!
//! Reconciles what Homebrew has on disk (taps, cached downloads) with the
//! installed package set, producing the lists a front-end displays.

pub mod artifact;
pub mod config;
pub mod downloads;
pub mod error;
pub mod format;
pub mod listing;
pub mod reconcile;
pub mod registry;
pub mod state;
pub mod tap;

// Re-export commonly used types
pub use artifact::{ParseFailure, parse_artifact_name};
pub use config::Config;
pub use downloads::{CacheScan, CacheScanner, CachedDownload, PackageType, classify, clear_cache};
pub use error::{ReconcileError, Result};
pub use reconcile::{Reconciler, RefreshOutcome, shutdown_on};
pub use registry::{InstalledPackage, InstalledPackages};
pub use state::{ReconciliationState, Snapshot};
pub use tap::{ApiTapOracle, BrewTapOracle, Tap, TapDiscovery, TapOracle};
