//! One settings file as written.
//!
//! Every field is optional, so a file changes only what it names, including
//! values equal to the built-in default. Category folders are additive: each
//! file adds to or relabels the mapping built so far.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::{EdgeClosure, LogFormat, MapConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ConfigLayer {
    data: DataLayer,
    graph: GraphLayer,
    cache: CacheLayer,
    logging: LoggingLayer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DataLayer {
    root: Option<PathBuf>,
    relationships_dir: Option<String>,
    template_prefix: Option<String>,
    extensions: Option<Vec<String>>,
    categories: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GraphLayer {
    closure_policy: Option<EdgeClosure>,
    base_size: Option<u32>,
    size_per_degree: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheLayer {
    path: Option<PathBuf>,
    use_cache: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggingLayer {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl ConfigLayer {
    /// Read and parse a settings file.
    pub(crate) fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the fields this layer sets over `config`.
    pub(crate) fn apply(self, config: &mut MapConfig) {
        let ConfigLayer {
            data,
            graph,
            cache,
            logging,
        } = self;

        set(&mut config.data.root, data.root);
        set(&mut config.data.relationships_dir, data.relationships_dir);
        set(&mut config.data.template_prefix, data.template_prefix);
        set(&mut config.data.extensions, data.extensions);
        config.data.categories.extend(data.categories);

        set(&mut config.graph.closure_policy, graph.closure_policy);
        set(&mut config.graph.base_size, graph.base_size);
        set(&mut config.graph.size_per_degree, graph.size_per_degree);

        set(&mut config.cache.path, cache.path);
        set(&mut config.cache.use_cache, cache.use_cache);

        set(&mut config.logging.level, logging.level);
        set(&mut config.logging.format, logging.format);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(text: &str) -> ConfigLayer {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_empty_layer_changes_nothing() {
        let mut config = MapConfig::default();
        layer("").apply(&mut config);
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn test_default_value_still_overrides() {
        let mut config = MapConfig::default();
        config.graph.closure_policy = EdgeClosure::StrictAnd;
        config.cache.use_cache = true;
        config.logging.level = "debug".to_string();

        layer(
            r#"
            [graph]
            closure_policy = "inclusive-or"

            [cache]
            use_cache = false

            [logging]
            level = "info"
            "#,
        )
        .apply(&mut config);

        assert_eq!(config.graph.closure_policy, EdgeClosure::InclusiveOr);
        assert!(!config.cache.use_cache);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_categories_are_added() {
        let mut config = MapConfig::default();
        layer("[data.categories]\nservices = \"Offer\"\ndatasets = \"Dataset\"\n").apply(&mut config);

        assert_eq!(config.data.categories.len(), 8);
        assert_eq!(config.data.categories["services"], "Offer");
        assert_eq!(config.data.categories["organizations"], "Organization");
    }
}
