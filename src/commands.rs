//! Command implementations for the brewsight CLI

use anyhow::Result;
use brewsight::format::format_size;
use brewsight::{
    ApiTapOracle, BrewTapOracle, CachedDownload, InstalledPackages, PackageType, Reconciler,
    RefreshOutcome, Snapshot, TapOracle, shutdown_on,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::IsTerminal;

/// Oracle picked on the command line
pub enum CliOracle {
    Brew(BrewTapOracle),
    Api(ApiTapOracle),
}

impl TapOracle for CliOracle {
    fn is_tap_registered(&self, name: &str) -> impl Future<Output = anyhow::Result<bool>> + Send {
        async move {
            match self {
                CliOracle::Brew(oracle) => oracle.is_tap_registered(name).await,
                CliOracle::Api(oracle) => oracle.is_tap_registered(name).await,
            }
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    if !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub async fn taps(reconciler: &Reconciler<CliOracle>, json: bool) -> Result<()> {
    let pb = spinner("Discovering taps...");
    let taps = reconciler.discover_taps().await;
    pb.finish_and_clear();

    reconciler.state().commit_taps(taps);
    let snapshot = reconciler.state().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.taps)?);
        return Ok(());
    }

    print_taps(&snapshot);
    Ok(())
}

pub async fn cache(
    reconciler: &Reconciler<CliOracle>,
    installed: &InstalledPackages,
    json: bool,
    classify: bool,
) -> Result<()> {
    let pb = spinner("Scanning cached downloads...");
    let scan = reconciler.scan_cache().await;
    pb.finish_and_clear();

    let scan = scan?;
    let scan = if classify {
        scan.classified(installed)
    } else {
        scan
    };
    reconciler.state().commit_cache_scan(scan);
    let snapshot = reconciler.state().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.cached_downloads)?);
        return Ok(());
    }

    print_cached_downloads(&snapshot);
    Ok(())
}

pub async fn clean_cache(reconciler: &Reconciler<CliOracle>) -> Result<()> {
    println!("Cleaning download cache...");

    let pb = spinner("Deleting cached downloads...");
    let reclaimed = reconciler.clear_cache().await;
    pb.finish_and_clear();

    let reclaimed = reclaimed?;
    if reclaimed == 0 {
        println!("{} Cache is already empty", "✓".green());
        return Ok(());
    }

    println!(
        "{} Removed cached downloads, freed {}",
        "✓".green().bold(),
        format_size(reclaimed).bold()
    );
    Ok(())
}

pub async fn status(
    reconciler: &Reconciler<CliOracle>,
    installed: &InstalledPackages,
    json: bool,
) -> Result<()> {
    let pb = spinner("Reconciling taps and cached downloads...");
    let outcome = reconciler
        .refresh_until(installed, shutdown_on(tokio::signal::ctrl_c()))
        .await;
    pb.finish_and_clear();

    if outcome? == RefreshOutcome::Cancelled {
        println!("{} Cancelled", "⚠".yellow());
        return Ok(());
    }

    let snapshot = reconciler.state().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_taps(&snapshot);
    println!();
    print_cached_downloads(&snapshot);
    Ok(())
}

fn print_taps(snapshot: &Snapshot) {
    println!("{}", "==> Taps".bold().green());

    if snapshot.taps.is_empty() {
        println!("No taps found");
        return;
    }

    for tap in &snapshot.taps {
        println!("{}", tap.to_string().cyan());
    }
}

fn print_cached_downloads(snapshot: &Snapshot) {
    println!("{}", "==> Cached Downloads".bold().green());
    println!(
        "{}: {}",
        "Size".bold(),
        format_size(snapshot.cached_downloads_folder_size).cyan()
    );
    println!();

    let width = snapshot
        .cached_downloads
        .iter()
        .map(|d| d.package_name.chars().count())
        .max()
        .unwrap_or(0);

    for download in &snapshot.cached_downloads {
        println!(
            "  {:<width$}  {:>12}  {}",
            download.package_name,
            format_size(download.size_in_bytes),
            type_label(download),
            width = width
        );
    }
}

fn type_label(download: &CachedDownload) -> String {
    match download.package_type {
        PackageType::Formula => "formula".green().to_string(),
        PackageType::Cask => "cask".blue().to_string(),
        PackageType::Unknown => "unknown".yellow().to_string(),
        PackageType::Other => "other".dimmed().to_string(),
    }
}
