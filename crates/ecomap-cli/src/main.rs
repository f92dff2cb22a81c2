//! Ecomap CLI - Browse an ecosystem map corpus from the terminal
//!
//! A command-line interface for filtering YAML entity records, projecting
//! the relationship graph around a filtered set and managing the columnar cache.
//!
//! # Usage
//!
//! ```bash
//! # List services tagged with "food"
//! ecomap list --category Service --tag food
//!
//! # Build the graph around everything in the North region
//! ecomap graph --region north --output json --out graph.json
//!
//! # Rebuild the columnar cache
//! ecomap index build
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ecomap_config::{ConfigOverrides, LogFormat};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod progress;

/// Ecomap - Filter records and explore their relationship graph
#[derive(Parser, Debug)]
#[command(name = "ecomap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Workspace directory holding `.ecomap/config.toml`
    #[arg(long, short = 'w', global = true, env = "ECOMAP_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "ECOMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus root directory (overrides `data.root`)
    #[arg(long, short = 'd', global = true, env = "ECOMAP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Settings these flags override; commands add their own on top.
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error")
        } else if self.verbose {
            Some("debug")
        } else {
            None
        };

        ConfigOverrides {
            data_root: self.data_dir.clone(),
            log_level: log_level.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List records matching the filters
    List(commands::list::ListArgs),

    /// Build the relationship graph around the filtered records
    Graph(commands::graph::GraphArgs),

    /// List relationship documents touching the filtered records
    Relationships(commands::relationships::RelationshipsArgs),

    /// Manage the columnar cache
    #[command(subcommand)]
    Index(commands::index::IndexCommand),

    /// View and initialize configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.global)?;

    match cli.command {
        Commands::List(args) => commands::list::execute(args, cli.global),
        Commands::Graph(args) => commands::graph::execute(args, cli.global),
        Commands::Relationships(args) => commands::relationships::execute(args, cli.global),
        Commands::Index(cmd) => commands::index::execute(cmd, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global),
    }
}

/// Install the stderr subscriber.
///
/// `--quiet` and `--verbose` arrive as overrides of `[logging] level`;
/// `RUST_LOG` wins over all of them.
fn init_logging(global: &GlobalOptions) -> Result<()> {
    let logging = commands::logging_settings(global);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).finish())?;
        }
    }

    Ok(())
}
