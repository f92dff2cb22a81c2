//! CLI command implementations
//!
//! This module contains all ecomap CLI command implementations and the
//! plumbing they share: workspace resolution, config loading and the
//! mapping from `MapConfig` onto the core loader and builder settings.

pub mod config;
pub mod graph;
pub mod index;
pub mod list;
pub mod relationships;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ecomap_config::{
    load_explicit, ConfigFiles, ConfigOverrides, EdgeClosure, LoggingConfig, MapConfig,
};
use ecomap_core::{
    CachedSource, Category, CategoryFilter, CategoryFolder, ClosurePolicy, Corpus,
    FilterSpec, GraphBuilder, LoadWarning, LoaderConfig, NodeSizing,
};

use crate::GlobalOptions;

/// Filter flags shared by `list`, `graph` and `relationships`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Free-text search over name, id, organisation and tags
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Category name, or "all"
    #[arg(long, short = 't')]
    pub category: Option<String>,

    /// Region substring
    #[arg(long, short = 'r')]
    pub region: Option<String>,

    /// Tag substring
    #[arg(long, short = 'g')]
    pub tag: Option<String>,
}

impl FilterArgs {
    /// Build the filter these flags describe.
    pub fn to_filter(&self) -> FilterSpec {
        let mut filter = FilterSpec::new();
        if let Some(ref text) = self.search {
            filter = filter.with_search(text.as_str());
        }
        if let Some(ref category) = self.category {
            let parsed = match category.parse::<CategoryFilter>() {
                Ok(parsed) => parsed,
                Err(never) => match never {},
            };
            filter = filter.with_category(parsed);
        }
        if let Some(ref region) = self.region {
            filter = filter.with_region(region.as_str());
        }
        if let Some(ref tag) = self.tag {
            filter = filter.with_tag(tag.as_str());
        }
        filter
    }
}

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Resolve the workspace path from options or current directory.
pub fn resolve_workspace(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref ws) = global.workspace {
        if !ws.exists() {
            anyhow::bail!("Workspace '{}' not found", ws.display());
        }
        return ws
            .canonicalize()
            .with_context(|| format!("Failed to resolve workspace {}", ws.display()));
    }

    std::env::current_dir().context("Failed to get current directory")
}

/// Load settings with the global flags as overrides.
pub fn load_config(global: &GlobalOptions, workspace: &Path) -> Result<MapConfig> {
    load_config_with(global, workspace, global.to_config_overrides())
}

/// Load settings from `--config` or the workspace files, then `overrides`.
pub fn load_config_with(
    global: &GlobalOptions,
    workspace: &Path,
    overrides: ConfigOverrides,
) -> Result<MapConfig> {
    let config = if let Some(ref config_path) = global.config {
        if !config_path.exists() {
            anyhow::bail!("Config file not found: {}", config_path.display());
        }
        load_explicit(config_path, &overrides).context("Failed to load config file")?
    } else {
        ConfigFiles::for_workspace(workspace)
            .load(&overrides)
            .context("Failed to load configuration")?
    };

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Logging settings for subscriber setup, before any command runs.
///
/// Configuration errors are reported later by the command itself; until then
/// the defaults apply, still honouring `--verbose` and `--quiet`.
pub fn logging_settings(global: &GlobalOptions) -> LoggingConfig {
    resolve_workspace(global)
        .and_then(|workspace| load_config(global, &workspace))
        .map(|config| config.logging)
        .unwrap_or_else(|_| {
            let mut config = MapConfig::default();
            config.apply_overrides(&global.to_config_overrides());
            config.logging
        })
}

/// Loader settings described by `[data]`.
pub fn loader_config(config: &MapConfig) -> LoaderConfig {
    let categories = config
        .data
        .categories
        .iter()
        .map(|(folder, label)| CategoryFolder::new(folder.as_str(), Category::parse(label)))
        .collect();

    LoaderConfig::default()
        .with_categories(categories)
        .with_relationships_dir(config.data.relationships_dir.as_str())
        .with_template_prefix(config.data.template_prefix.as_str())
        .with_extensions(config.data.extensions.clone())
}

/// Map the config crate's closure selection onto the builder policy.
pub fn closure_policy(closure: EdgeClosure) -> ClosurePolicy {
    match closure {
        EdgeClosure::InclusiveOr => ClosurePolicy::InclusiveOr,
        EdgeClosure::StrictAnd => ClosurePolicy::StrictAnd,
    }
}

/// Graph builder described by `[graph]`.
pub fn graph_builder(config: &MapConfig) -> GraphBuilder {
    GraphBuilder::new()
        .with_policy(closure_policy(config.graph.closure_policy))
        .with_sizing(NodeSizing {
            base: config.graph.base_size,
            per_degree: config.graph.size_per_degree,
        })
}

/// Cached entity source for the configured corpus and cache path.
pub fn cached_source(config: &MapConfig, workspace: &Path) -> CachedSource {
    CachedSource::new(
        config.data_root(workspace),
        config.cache_path(workspace),
        loader_config(config),
    )
}

/// Load the corpus, through the cache when `[cache] use_cache` is set.
pub fn open_corpus(config: &MapConfig, workspace: &Path) -> Result<Corpus> {
    let root = config.data_root(workspace);
    let loader = loader_config(config);

    let corpus = if config.cache.use_cache {
        let source = cached_source(config, workspace);
        Corpus::load(&source, &root, loader)
    } else {
        Corpus::from_directory(&root, loader)
    };

    corpus.with_context(|| format!("Failed to load corpus from {}", root.display()))
}

/// Report skipped documents on stderr.
///
/// Each warning is already logged by the loader; this prints the tally.
pub fn print_warnings(warnings: &[LoadWarning]) {
    if !warnings.is_empty() {
        print_warning(&format!(
            "{} document(s) skipped or altered while loading",
            warnings.len()
        ));
    }
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

/// Message printed when a filter selects nothing.
pub const NO_MATCHES: &str = "No matching entities found for current filters.";
