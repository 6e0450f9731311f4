// Tests for running both engines together and committing to the state

mod test_helpers;

use brewsight::{
    InstalledPackages, PackageType, ReconcileError, Reconciler, RefreshOutcome, TapOracle,
    shutdown_on,
};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use test_helpers::TestEnvironment;

/// Reports every tap as registered, optionally after a delay
struct CountingOracle {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingOracle {
    fn new() -> Self {
        Self::delayed(Duration::ZERO)
    }

    fn delayed(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }
}

impl TapOracle for CountingOracle {
    fn is_tap_registered(&self, _name: &str) -> impl Future<Output = anyhow::Result<bool>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            Ok(true)
        }
    }
}

fn populated_env() -> TestEnvironment {
    let env = TestEnvironment::new();
    env.add_tap("homebrew", "homebrew-core");
    env.add_tap("homebrew", "homebrew-bundle");
    env.add_artifact("wget--1.21.3.bottle.tar.gz", 500_000);
    env.add_artifact("curl--7.88--arm64.tar.gz", 800_000);
    env.install_formula("wget", "1.21.3");
    env
}

#[tokio::test]
async fn test_refresh_commits_taps_and_downloads() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());
    let installed = InstalledPackages::load(reconciler.config());

    let outcome = reconciler.refresh(&installed).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Completed);

    let snapshot = reconciler.state().snapshot();
    let taps: Vec<_> = snapshot.taps.iter().map(|t| t.name()).collect();
    assert_eq!(taps, vec!["homebrew/bundle", "homebrew/core", "homebrew/cask"]);

    let types: Vec<_> = snapshot
        .cached_downloads
        .iter()
        .map(|d| (d.package_name.as_str(), d.package_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("wget", PackageType::Formula),
            ("curl", PackageType::Unknown),
            ("Other smaller packages", PackageType::Other),
        ]
    );
    assert_eq!(snapshot.cached_downloads_folder_size, 1_300_000);
}

#[tokio::test]
async fn test_refresh_replaces_previous_result() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());
    let installed = InstalledPackages::load(reconciler.config());

    reconciler.refresh(&installed).await.unwrap();
    std::fs::remove_file(env.cache.join("curl--7.88--arm64.tar.gz")).unwrap();
    reconciler.refresh(&installed).await.unwrap();

    let snapshot = reconciler.state().snapshot();
    assert_eq!(snapshot.individual_downloads().count(), 1);
    assert_eq!(snapshot.cached_downloads.len(), 2);
}

#[tokio::test]
async fn test_reclassify_after_install() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());

    reconciler.refresh(&InstalledPackages::default()).await.unwrap();
    assert!(
        reconciler
            .state()
            .snapshot()
            .individual_downloads()
            .all(|d| d.package_type == PackageType::Unknown)
    );

    env.install_formula("curl", "7.88");
    reconciler.reclassify(&InstalledPackages::load(reconciler.config()));

    assert!(
        reconciler
            .state()
            .snapshot()
            .individual_downloads()
            .all(|d| d.package_type == PackageType::Formula)
    );
}

#[tokio::test]
async fn test_cancelled_refresh_leaves_state_untouched() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::delayed(Duration::from_secs(30)));
    let installed = InstalledPackages::load(reconciler.config());

    let outcome = reconciler
        .refresh_until(&installed, tokio::time::sleep(Duration::from_millis(20)))
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Cancelled);
    assert_eq!(reconciler.state().snapshot(), Default::default());
}

#[tokio::test]
async fn test_unavailable_signal_never_cancels() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::delayed(Duration::from_millis(20)));
    let installed = InstalledPackages::load(reconciler.config());

    let broken_signal = async { Err(std::io::Error::other("no signal handler")) };
    let outcome = reconciler
        .refresh_until(&installed, shutdown_on(broken_signal))
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Completed);
    assert_eq!(reconciler.state().snapshot().taps.len(), 3);
}

#[tokio::test]
async fn test_delivered_signal_cancels() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::delayed(Duration::from_secs(30)));
    let installed = InstalledPackages::load(reconciler.config());

    let outcome = reconciler
        .refresh_until(&installed, shutdown_on(async { Ok(()) }))
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Cancelled);
}

#[tokio::test]
async fn test_clear_cache_reclaims_and_commits_empty_scan() {
    let env = populated_env();
    env.add_artifact("wget--1.21.3.bottle.manifest.json", 1_000);
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());
    let installed = InstalledPackages::load(reconciler.config());

    reconciler.refresh(&installed).await.unwrap();
    assert_eq!(reconciler.state().snapshot().individual_downloads().count(), 2);

    let reclaimed = reconciler.clear_cache().await.unwrap();
    assert_eq!(reclaimed, 1_301_000);

    let snapshot = reconciler.state().snapshot();
    assert_eq!(snapshot.cached_downloads_folder_size, 0);
    assert_eq!(snapshot.individual_downloads().count(), 0);
    assert_eq!(snapshot.aggregate().unwrap().size_in_bytes, 0);
    assert!(env.cache.exists());
    assert_eq!(std::fs::read_dir(&env.cache).unwrap().count(), 0);

    // Nothing left to reclaim
    assert_eq!(reconciler.clear_cache().await.unwrap(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_scan_keeps_previous_downloads() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());
    let installed = InstalledPackages::load(reconciler.config());

    reconciler.refresh(&installed).await.unwrap();
    let before = reconciler.state().snapshot();

    std::os::unix::fs::symlink(
        env.cache.join("gone"),
        env.cache.join("jq--1.7.1.bottle.tar.gz"),
    )
    .unwrap();
    env.add_tap("user", "homebrew-tools");

    let result = reconciler.refresh(&installed).await;
    assert!(matches!(result, Err(ReconcileError::SizeUnavailable { .. })));

    let after = reconciler.state().snapshot();
    assert_eq!(after.cached_downloads, before.cached_downloads);
    // Taps are independent of the cache scan and still refresh
    assert_eq!(after.taps.len(), before.taps.len() + 1);
}

#[tokio::test]
async fn test_subscriber_notified_on_refresh() {
    let env = populated_env();
    let reconciler = Reconciler::new(env.config(), CountingOracle::new());
    let mut rx = reconciler.state().subscribe();

    reconciler.refresh(&InstalledPackages::default()).await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.taps.len(), 3);
    assert!(snapshot.aggregate().is_some());
}
