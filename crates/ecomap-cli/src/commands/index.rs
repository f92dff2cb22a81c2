//! Index command - Columnar cache lifecycle
//!
//! - `build` rebuilds the SQLite snapshot from the YAML corpus
//! - `status` reports whether the snapshot matches the corpus
//! - `clean` deletes the snapshot
//! - `export` writes the snapshot rows as CSV

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ecomap_core::{CacheStatus, ColumnarCache};

use super::{cached_source, load_config, print_info, print_warnings, resolve_workspace};
use crate::progress::{finish_spinner, finish_spinner_warn, spinner};
use crate::GlobalOptions;

/// Cache management commands
#[derive(Subcommand, Debug)]
pub enum IndexCommand {
    /// Rebuild the cache from the corpus
    Build,

    /// Show cache freshness
    Status(StatusArgs),

    /// Delete the cache database
    Clean,

    /// Write the cached rows as CSV, rebuilding a stale cache first
    Export(ExportArgs),
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long, value_name = "FILE", default_value = "index_data.csv")]
    csv: PathBuf,
}

/// Execute the index command
pub fn execute(cmd: IndexCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        IndexCommand::Build => execute_build(&global),
        IndexCommand::Status(args) => execute_status(args, &global),
        IndexCommand::Clean => execute_clean(&global),
        IndexCommand::Export(args) => execute_export(args, &global),
    }
}

fn execute_build(global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;
    let source = cached_source(&config, &workspace);

    let pb = spinner("Building cache...", global.quiet);
    let report = match source.rebuild() {
        Ok(report) => report,
        Err(e) => {
            finish_spinner_warn(pb, "Cache build failed");
            return Err(e).context("Failed to build cache");
        }
    };

    let message = format!(
        "Cached {} records in {}",
        report.len(),
        source.cache_path().display()
    );
    if report.has_warnings() {
        finish_spinner_warn(pb, &message);
    } else {
        finish_spinner(pb, &message);
    }
    print_warnings(&report.warnings);

    Ok(())
}

fn execute_status(args: StatusArgs, global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;
    let source = cached_source(&config, &workspace);
    let status = source.status().context("Failed to read cache status")?;

    let rows = match status {
        CacheStatus::Fresh { rows } | CacheStatus::Stale { rows } => Some(rows),
        CacheStatus::Missing | CacheStatus::Incompatible { .. } | CacheStatus::Unreadable => None,
    };
    let built_at = match rows {
        Some(_) => ColumnarCache::open(source.cache_path())
            .and_then(|cache| cache.built_at())
            .context("Failed to read cache metadata")?,
        None => None,
    };

    if args.json {
        let mut json = serde_json::json!({
            "path": source.cache_path(),
            "status": status.as_str(),
            "rows": rows,
            "built_at": built_at,
        });
        if let CacheStatus::Incompatible { ref found } = status {
            json["schema_version"] = serde_json::json!(found);
        }
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Cache:  {}", source.cache_path().display());
    match status {
        CacheStatus::Missing => println!("Status: missing (run `ecomap index build`)"),
        CacheStatus::Fresh { rows } => println!("Status: fresh ({} rows)", rows),
        CacheStatus::Stale { rows } => {
            println!("Status: stale ({} rows, corpus changed since build)", rows)
        }
        CacheStatus::Incompatible { ref found } => {
            println!("Status: incompatible (schema version {})", found)
        }
        CacheStatus::Unreadable => {
            println!("Status: unreadable (not a cache database, rebuilt on next use)")
        }
    }
    if let Some(built_at) = built_at {
        println!("Built:  {} (unix seconds)", built_at);
    }

    Ok(())
}

fn execute_clean(global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;
    let source = cached_source(&config, &workspace);

    if source.clean().context("Failed to delete cache")? {
        print_info(
            &format!("Removed {}", source.cache_path().display()),
            global.quiet,
        );
    } else {
        print_info("No cache to remove", global.quiet);
    }

    Ok(())
}

fn execute_export(args: ExportArgs, global: &GlobalOptions) -> Result<()> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;
    let source = cached_source(&config, &workspace);

    let (rows, warnings) = source
        .export_csv(&args.csv)
        .with_context(|| format!("Failed to export {}", args.csv.display()))?;
    print_warnings(&warnings);
    print_info(
        &format!("Exported {} rows to {}", rows, args.csv.display()),
        global.quiet,
    );

    Ok(())
}
