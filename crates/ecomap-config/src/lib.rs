//! Ecomap settings
//!
//! `MapConfig` describes the corpus layout, the graph projection, the cache and
//! logging. It is assembled from layers, lowest precedence first:
//! built-in defaults, `~/.ecomap/config.toml`, `<workspace>/.ecomap/config.toml`
//! and `ConfigOverrides` taken from the command line.

mod error;
mod layer;
mod loader;

pub use error::ConfigError;
pub use loader::{load_explicit, ConfigFiles, SETTINGS_DIR, SETTINGS_FILE};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration for ecomap.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// Corpus layout
    pub data: DataConfig,

    /// Graph projection settings
    pub graph: GraphConfig,

    /// Columnar cache settings
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Corpus layout on disk.
///
/// # Example TOML
///
/// ```toml
/// [data]
/// root = "data"
/// relationships_dir = "relationships"
/// template_prefix = "0_template"
/// extensions = ["yaml", "yml"]
///
/// [data.categories]
/// organizations = "Organization"
/// partners = "Organization"
/// datasets = "Dataset"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Corpus root, relative to the workspace unless absolute
    pub root: PathBuf,

    /// Folder holding relationship documents
    pub relationships_dir: String,

    /// Files starting with this prefix are templates and never loaded
    pub template_prefix: String,

    /// Recognized document extensions
    pub extensions: Vec<String>,

    /// Folder name → category label
    pub categories: BTreeMap<String, String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            relationships_dir: "relationships".to_string(),
            template_prefix: "0_template".to_string(),
            extensions: vec!["yaml".to_string(), "yml".to_string()],
            categories: default_categories(),
        }
    }
}

/// Default folder → category mapping.
pub fn default_categories() -> BTreeMap<String, String> {
    [
        ("organizations", "Organization"),
        ("services", "Service"),
        ("plans", "Plan"),
        ("events", "Event"),
        ("collections", "Collection"),
        ("items", "Item"),
        ("resources", "Resource"),
    ]
    .into_iter()
    .map(|(folder, label)| (folder.to_string(), label.to_string()))
    .collect()
}

/// Graph projection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Which relationships cross into a projection
    pub closure_policy: EdgeClosure,

    /// Constant part of the node size
    pub base_size: u32,

    /// Size added per unit of degree
    pub size_per_degree: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            closure_policy: EdgeClosure::default(),
            base_size: 10,
            size_per_degree: 2,
        }
    }
}

/// Edge closure policy selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeClosure {
    /// Either endpoint in the filtered set (default)
    #[default]
    InclusiveOr,
    /// Both endpoints in the filtered set
    StrictAnd,
}

impl std::fmt::Display for EdgeClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InclusiveOr => write!(f, "inclusive-or"),
            Self::StrictAnd => write!(f, "strict-and"),
        }
    }
}

/// Accepts the TOML spellings plus the short `or` / `and` forms.
impl std::str::FromStr for EdgeClosure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "inclusive-or" | "inclusive" | "or" => Ok(Self::InclusiveOr),
            "strict-and" | "strict" | "and" => Ok(Self::StrictAnd),
            _ => Err(ConfigError::invalid(
                "graph.closure_policy",
                format!("unknown policy '{}' (expected inclusive-or or strict-and)", s),
            )),
        }
    }
}

/// Columnar cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache database, relative to the workspace unless absolute
    pub path: PathBuf,

    /// Read entities through the cache by default
    pub use_cache: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".ecomap/index.db"),
            use_cache: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Settings given on the command line; they beat every file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// `--data-dir`
    pub data_root: Option<PathBuf>,

    /// `graph --policy`
    pub closure_policy: Option<EdgeClosure>,

    /// `--cache`
    pub use_cache: Option<bool>,

    /// `--verbose` / `--quiet`
    pub log_level: Option<String>,
}

impl MapConfig {
    /// Apply command-line settings.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref root) = overrides.data_root {
            self.data.root = root.clone();
        }
        if let Some(policy) = overrides.closure_policy {
            self.graph.closure_policy = policy;
        }
        if let Some(use_cache) = overrides.use_cache {
            self.cache.use_cache = use_cache;
        }
        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!(
                    "unknown level '{}'. Valid values: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        if self.data.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "data.extensions",
                "at least one document extension is required",
            ));
        }

        if self.data.categories.is_empty() {
            return Err(ConfigError::invalid(
                "data.categories",
                "at least one category folder is required",
            ));
        }

        if let Some((folder, _)) = self
            .data
            .categories
            .iter()
            .find(|(_, label)| label.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                format!("data.categories.{}", folder),
                "category label must not be empty",
            ));
        }

        if self.data.categories.contains_key(&self.data.relationships_dir) {
            return Err(ConfigError::invalid(
                "data.relationships_dir",
                format!(
                    "'{}' is also mapped as a category folder",
                    self.data.relationships_dir
                ),
            ));
        }

        Ok(())
    }

    /// Get the effective corpus root for a workspace.
    pub fn data_root(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.data.root)
    }

    /// Get the effective cache database path for a workspace.
    pub fn cache_path(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.cache.path)
    }
}

fn resolve(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.data.root, PathBuf::from("data"));
        assert_eq!(config.data.relationships_dir, "relationships");
        assert_eq!(config.data.categories.len(), 7);
        assert_eq!(config.graph.closure_policy, EdgeClosure::InclusiveOr);
        assert_eq!(config.graph.base_size, 10);
        assert!(!config.cache.use_cache);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = MapConfig::default();
        let overrides = ConfigOverrides {
            data_root: Some(PathBuf::from("/corpus")),
            closure_policy: Some(EdgeClosure::StrictAnd),
            log_level: Some("debug".to_string()),
            use_cache: Some(true),
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.data.root, PathBuf::from("/corpus"));
        assert_eq!(config.graph.closure_policy, EdgeClosure::StrictAnd);
        assert_eq!(config.logging.level, "debug");
        assert!(config.cache.use_cache);
    }

    #[test]
    fn test_path_resolution() {
        let config = MapConfig::default();
        let workspace = PathBuf::from("/home/user/map");

        assert_eq!(config.data_root(&workspace), PathBuf::from("/home/user/map/data"));
        assert_eq!(
            config.cache_path(&workspace),
            PathBuf::from("/home/user/map/.ecomap/index.db")
        );
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let mut config = MapConfig::default();
        config.data.root = PathBuf::from("/srv/corpus");
        let workspace = PathBuf::from("/home/user/map");

        assert_eq!(config.data_root(&workspace), PathBuf::from("/srv/corpus"));
    }

    #[test]
    fn test_edge_closure_from_str() {
        assert_eq!(
            "strict-and".parse::<EdgeClosure>().unwrap(),
            EdgeClosure::StrictAnd
        );
        assert_eq!("OR".parse::<EdgeClosure>().unwrap(), EdgeClosure::InclusiveOr);
        assert_eq!("strict_and".parse::<EdgeClosure>().unwrap(), EdgeClosure::StrictAnd);
        let err = "xor".parse::<EdgeClosure>().unwrap_err();
        assert!(err.to_string().contains("graph.closure_policy"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MapConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = MapConfig::default();
        config.data.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = MapConfig::default();
        config
            .data
            .categories
            .insert("relationships".to_string(), "Link".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("relationships_dir"));

        let mut config = MapConfig::default();
        config
            .data
            .categories
            .insert("misc".to_string(), " ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = MapConfig::default();
        config.graph.closure_policy = EdgeClosure::StrictAnd;
        config
            .data
            .categories
            .insert("datasets".to_string(), "Dataset".to_string());

        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("closure_policy = \"strict-and\""));

        let parsed: MapConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: MapConfig = toml::from_str(
            r#"
            [graph]
            size_per_degree = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.graph.size_per_degree, 5);
        assert_eq!(parsed.graph.base_size, 10);
        assert_eq!(parsed.data, DataConfig::default());
    }
}
