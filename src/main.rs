mod commands;

use brewsight::{ApiTapOracle, BrewTapOracle, Config, InstalledPackages, Reconciler};
use clap::{CommandFactory, Parser, Subcommand};
use colored::Colorize;
use commands::CliOracle;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "brewsight")]
#[command(author, version, about = "Reconcile Homebrew taps and cached downloads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Homebrew prefix (defaults to HOMEBREW_PREFIX or the platform default)
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    /// Directory holding the taps
    #[arg(long, global = true)]
    taps_dir: Option<PathBuf>,

    /// Directory holding cached downloads
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Timeout for each tap presence check, in milliseconds
    #[arg(long, global = true)]
    oracle_timeout_ms: Option<u64>,

    /// Check tap presence against the API cache instead of asking brew
    #[arg(long, global = true)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered taps
    Taps {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cached downloads, classified against installed packages
    Cache {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Skip classification against installed packages
        #[arg(long)]
        no_classify: bool,

        /// Delete all cached downloads
        #[arg(long, conflicts_with_all = ["json", "no_classify"])]
        clean: bool,
    },

    /// Reconcile taps and cached downloads together
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn build_config(cli: &Cli) -> Config {
    let mut config = match &cli.prefix {
        Some(prefix) => Config::with_prefix(prefix, Config::from_env().cache_dir),
        None => Config::from_env(),
    };

    if let Some(taps_dir) = &cli.taps_dir {
        config = config.taps_dir(taps_dir);
    }
    if let Some(cache_dir) = &cli.cache_dir {
        config = config.cache_dir(cache_dir);
    }
    if let Some(ms) = cli.oracle_timeout_ms {
        config = config.oracle_timeout(Duration::from_millis(ms));
    }

    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&cli);
    let oracle = if cli.offline {
        CliOracle::Api(ApiTapOracle::from_config(&config))
    } else {
        CliOracle::Brew(BrewTapOracle::from_config(&config))
    };
    let reconciler = Reconciler::new(config, oracle);

    match cli.command {
        Some(Commands::Taps { json }) => {
            commands::taps(&reconciler, json).await?;
        }
        Some(Commands::Cache { clean: true, .. }) => {
            commands::clean_cache(&reconciler).await?;
        }
        Some(Commands::Cache {
            json, no_classify, ..
        }) => {
            let installed = InstalledPackages::load(reconciler.config());
            commands::cache(&reconciler, &installed, json, !no_classify).await?;
        }
        Some(Commands::Status { json }) => {
            let installed = InstalledPackages::load(reconciler.config());
            commands::status(&reconciler, &installed, json).await?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "brewsight", &mut std::io::stdout());
        }
        None => {
            println!("{} brewsight - Homebrew taps and cache at a glance", "==>".bold().green());
            println!("\nRun {} to see available commands.", "brewsight --help".cyan());
        }
    }

    Ok(())
}
