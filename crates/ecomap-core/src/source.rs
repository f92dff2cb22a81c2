//! Entity Sources
//!
//! Entities can come straight from the YAML corpus or from the columnar cache.
//! Both yield the same `EntityRecord` shape through the `EntitySource` trait, so
//! filtering and graph building do not care where records were read from.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::builder::GraphBuilder;
use crate::cache::{CacheError, CacheStatus, ColumnarCache};
use crate::filter::FilterSpec;
use crate::graph::GraphProjection;
use crate::loader::{LoadReport, LoadWarning, LoaderConfig, LoaderError, RecordLoader, RelationshipLoader};
use crate::model::{EntityRecord, RelationshipRecord};

/// Errors that can occur while reading an entity source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Something that can produce the full set of entity records.
pub trait EntitySource {
    /// Load every entity record with the warnings produced on the way.
    fn load_entities(&self) -> Result<LoadReport<EntityRecord>>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

// ============================================================================
// Directory Source
// ============================================================================

/// Reads entities directly from the YAML corpus.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    loader: RecordLoader,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            root: root.into(),
            loader: RecordLoader::new(config),
        }
    }

    /// Corpus root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl EntitySource for DirectorySource {
    fn load_entities(&self) -> Result<LoadReport<EntityRecord>> {
        Ok(self.loader.load(&self.root)?)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

// ============================================================================
// Cached Source
// ============================================================================

/// Reads entities through the columnar cache, rebuilding it when stale.
#[derive(Debug, Clone)]
pub struct CachedSource {
    root: PathBuf,
    cache_path: PathBuf,
    loader: RecordLoader,
}

impl CachedSource {
    pub fn new(root: impl Into<PathBuf>, cache_path: impl Into<PathBuf>, config: LoaderConfig) -> Self {
        Self {
            root: root.into(),
            cache_path: cache_path.into(),
            loader: RecordLoader::new(config),
        }
    }

    /// Cache database path
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Freshness of the cache against the current corpus.
    pub fn status(&self) -> Result<CacheStatus> {
        let fingerprint = self.loader.fingerprint(&self.root)?;
        Ok(ColumnarCache::status(&self.cache_path, &fingerprint)?)
    }

    /// Rebuild the cache from the corpus, whatever its state.
    ///
    /// Returns the load report the rows were built from.
    pub fn rebuild(&self) -> Result<LoadReport<EntityRecord>> {
        let fingerprint = self.loader.fingerprint(&self.root)?;
        let report = self.loader.load(&self.root)?;

        let status = ColumnarCache::status(&self.cache_path, &fingerprint)?;
        if status.needs_replacing() {
            info!("Replacing {} cache file", status.as_str());
            self.clean()?;
        }

        let cache = ColumnarCache::create(&self.cache_path)?;
        cache.rebuild(&report.records, &fingerprint)?;
        Ok(report)
    }

    /// Remove the cache database. Returns whether anything was deleted.
    pub fn clean(&self) -> Result<bool> {
        let mut removed = false;
        for suffix in ["", "-wal", "-shm"] {
            let mut name = self.cache_path.as_os_str().to_owned();
            name.push(suffix);
            let path = PathBuf::from(name);
            if path.exists() {
                std::fs::remove_file(&path).map_err(CacheError::from)?;
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Records matching a filter, read from a fresh cache.
    pub fn query(&self, filter: &FilterSpec) -> Result<LoadReport<EntityRecord>> {
        let (cache, warnings) = self.fresh_cache()?;
        let records = cache.query(filter, self.loader.config())?;
        Ok(LoadReport { records, warnings })
    }

    /// Write the cache rows as CSV to `path`, rebuilding a stale cache first.
    ///
    /// Returns the number of rows written and the warnings of any rebuild.
    pub fn export_csv(&self, path: &Path) -> Result<(usize, Vec<LoadWarning>)> {
        let (cache, warnings) = self.fresh_cache()?;
        let file = File::create(path).map_err(CacheError::from)?;
        let rows = cache.export_csv(BufWriter::new(file))?;
        info!("Exported {} rows to {}", rows, path.display());
        Ok((rows, warnings))
    }

    fn fresh_cache(&self) -> Result<(ColumnarCache, Vec<LoadWarning>)> {
        let fingerprint = self.loader.fingerprint(&self.root)?;
        let status = ColumnarCache::status(&self.cache_path, &fingerprint)?;
        if status.is_fresh() {
            debug!("Cache {} is fresh", self.cache_path.display());
            return Ok((ColumnarCache::open(&self.cache_path)?, Vec::new()));
        }

        info!("Cache is {}, rebuilding", status.as_str());
        let report = self.rebuild()?;
        Ok((ColumnarCache::open(&self.cache_path)?, report.warnings))
    }
}

impl EntitySource for CachedSource {
    fn load_entities(&self) -> Result<LoadReport<EntityRecord>> {
        let (cache, warnings) = self.fresh_cache()?;
        let records = cache.read_records(self.loader.config())?;
        Ok(LoadReport { records, warnings })
    }

    fn describe(&self) -> String {
        format!("cache {}", self.cache_path.display())
    }
}

// ============================================================================
// Corpus
// ============================================================================

/// Entities and relationships loaded together.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub entities: Vec<EntityRecord>,
    pub relationships: Vec<RelationshipRecord>,
    /// Warnings from both load passes
    pub warnings: Vec<LoadWarning>,
}

impl Corpus {
    /// Load entities from `source` and relationships from `root`.
    pub fn load(source: &dyn EntitySource, root: &Path, config: LoaderConfig) -> Result<Self> {
        debug!("Loading entities from {}", source.describe());
        let entities = source.load_entities()?;
        let relationships = RelationshipLoader::new(config).load(root)?;

        let mut warnings = entities.warnings;
        warnings.extend(relationships.warnings);

        Ok(Self {
            entities: entities.records,
            relationships: relationships.records,
            warnings,
        })
    }

    /// Load everything straight from the YAML corpus.
    pub fn from_directory(root: &Path, config: LoaderConfig) -> Result<Self> {
        let source = DirectorySource::new(root, config.clone());
        Self::load(&source, root, config)
    }

    /// Entities matching a filter, in load order.
    pub fn select(&self, filter: &FilterSpec) -> Vec<&EntityRecord> {
        filter.apply(&self.entities)
    }

    /// Relationships with at least one endpoint among the matching entities.
    ///
    /// An open filter keeps every relationship, dangling ones included.
    pub fn relationships_for(&self, filter: &FilterSpec) -> Vec<&RelationshipRecord> {
        if filter.is_open() {
            return self.relationships.iter().collect();
        }

        let selected: HashSet<&str> = self
            .select(filter)
            .into_iter()
            .map(|record| record.id.as_str())
            .collect();
        self.relationships
            .iter()
            .filter(|rel| {
                selected.contains(rel.source_id.as_str()) || selected.contains(rel.target_id.as_str())
            })
            .collect()
    }

    /// Build the graph projection for a filter.
    pub fn project(&self, builder: &GraphBuilder, filter: &FilterSpec) -> GraphProjection {
        builder.build(&self.entities, &self.relationships, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::fs;
    use tempfile::TempDir;

    fn corpus_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("plans")).unwrap();
        fs::write(dir.path().join("plans/alpha.yaml"), "name: Alpha\n").unwrap();
        dir
    }

    #[test]
    fn test_directory_source() {
        let dir = corpus_dir();
        let source = DirectorySource::new(dir.path(), LoaderConfig::default());
        let report = source.load_entities().unwrap();
        assert_eq!(report.len(), 1);
        assert!(source.describe().starts_with("directory "));
    }

    #[test]
    fn test_cached_source_rebuilds_when_stale() {
        let dir = corpus_dir();
        let cache_path = dir.path().join(".ecomap").join("index.db");
        let source = CachedSource::new(dir.path(), &cache_path, LoaderConfig::default());

        assert_eq!(source.status().unwrap(), CacheStatus::Missing);
        assert_eq!(source.load_entities().unwrap().len(), 1);
        assert!(source.status().unwrap().is_fresh());

        fs::write(dir.path().join("plans/beta.yaml"), "name: Beta\n").unwrap();
        assert_eq!(source.status().unwrap(), CacheStatus::Stale { rows: 1 });
        assert_eq!(source.load_entities().unwrap().len(), 2);
        assert_eq!(source.status().unwrap(), CacheStatus::Fresh { rows: 2 });
    }

    #[test]
    fn test_cached_source_clean() {
        let dir = corpus_dir();
        let cache_path = dir.path().join("index.db");
        let source = CachedSource::new(dir.path(), &cache_path, LoaderConfig::default());

        assert!(!source.clean().unwrap());
        source.rebuild().unwrap();
        assert!(cache_path.exists());
        assert!(source.clean().unwrap());
        assert!(!cache_path.exists());
    }

    #[test]
    fn test_cached_source_replaces_unreadable_file() {
        let dir = corpus_dir();
        let cache_path = dir.path().join(".ecomap").join("index.db");
        fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        fs::write(&cache_path, b"garbage where a database should be").unwrap();
        let source = CachedSource::new(dir.path(), &cache_path, LoaderConfig::default());

        assert_eq!(source.status().unwrap(), CacheStatus::Unreadable);
        assert_eq!(source.load_entities().unwrap().len(), 1);
        assert_eq!(source.status().unwrap(), CacheStatus::Fresh { rows: 1 });
    }

    #[test]
    fn test_cached_source_export_csv() {
        let dir = corpus_dir();
        let source = CachedSource::new(dir.path(), dir.path().join("index.db"), LoaderConfig::default());
        let out = dir.path().join("index_data.csv");

        let (rows, warnings) = source.export_csv(&out).unwrap();
        assert_eq!(rows, 1);
        assert!(warnings.is_empty());

        let text = fs::read_to_string(&out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,type,subtype,tags,organisation,region,projects,folder,filename")
        );
        assert_eq!(lines.next(), Some("alpha,Alpha,,,,,,,plans,alpha.yaml"));
    }

    #[test]
    fn test_relationships_for_filter() {
        let corpus = Corpus {
            entities: vec![
                EntityRecord::new("a", Category::Organization).with_tags(["housing"]),
                EntityRecord::new("b", Category::Service),
            ],
            relationships: vec![
                RelationshipRecord::new("r1", "a", "b"),
                RelationshipRecord::new("r2", "b", "z"),
                RelationshipRecord::new("r3", "x", "y"),
            ],
            warnings: Vec::new(),
        };

        let ids = |filter: &FilterSpec| -> Vec<String> {
            corpus
                .relationships_for(filter)
                .into_iter()
                .map(|rel| rel.id.clone())
                .collect()
        };

        assert_eq!(ids(&FilterSpec::new()), vec!["r1", "r2", "r3"]);
        assert_eq!(ids(&FilterSpec::new().with_tag("hous")), vec!["r1"]);
        assert_eq!(
            ids(&FilterSpec::new().with_category(Category::Service.into())),
            vec!["r1", "r2"]
        );
        assert!(ids(&FilterSpec::new().with_search("nothing")).is_empty());
    }

    #[test]
    fn test_corpus_from_directory_without_relationships() {
        let dir = corpus_dir();
        let corpus = Corpus::from_directory(dir.path(), LoaderConfig::default()).unwrap();
        assert_eq!(corpus.entities.len(), 1);
        assert!(corpus.relationships.is_empty());
        assert!(corpus.warnings.is_empty());
    }
}
