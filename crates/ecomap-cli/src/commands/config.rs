//! Config command - View and initialize configuration
//!
//! - `show` prints the effective configuration after all merges
//! - `path` prints where the global and local files live
//! - `init` writes a default config file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ecomap_config::ConfigFiles;
use serde::Serialize;

use super::{load_config, print_info, resolve_workspace};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show(ShowArgs),

    /// Show configuration file paths
    Path(ShowArgs),

    /// Create a default configuration file
    Init(InitArgs),
}

/// Arguments for the show and path commands
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Write ~/.ecomap/config.toml instead of the workspace config
    #[arg(long)]
    global: bool,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, &global),
        ConfigCommand::Path(args) => execute_path(args, &global),
        ConfigCommand::Init(args) => execute_init(args, &global),
    }
}

fn execute_show(args: ShowArgs, global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let text = toml::to_string_pretty(&config).context("Failed to render configuration")?;
        print!("{}", text);
    }

    Ok(())
}

fn execute_path(args: ShowArgs, global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let files = ConfigFiles::for_workspace(&workspace);

    let paths = ConfigPaths {
        global_exists: files.global.as_ref().is_some_and(|p| p.exists()),
        local_exists: files.local.exists(),
        global: files.global,
        local: files.local,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    let mark = |exists: bool| if exists { "" } else { " (not found)" };
    match paths.global {
        Some(ref path) => println!("Global: {}{}", path.display(), mark(paths.global_exists)),
        None => println!("Global: (no home directory)"),
    }
    println!("Local:  {}{}", paths.local.display(), mark(paths.local_exists));

    Ok(())
}

fn execute_init(args: InitArgs, global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let files = ConfigFiles::for_workspace(&workspace);

    let path = if args.global {
        files
            .init_global()
            .context("Failed to initialize global config")?
    } else {
        files
            .init_local()
            .context("Failed to initialize local config")?
    };

    print_info(&format!("Config file: {}", path.display()), global.quiet);
    Ok(())
}
