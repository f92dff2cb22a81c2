//! Record and Relationship Loaders
//!
//! Reads the YAML corpus from disk:
//!
//! ```text
//! <root>/
//!   organizations/<id>.yaml
//!   services/<id>.yaml
//!   ...
//!   relationships/<id>.yaml
//! ```
//!
//! A bad document never aborts a pass. Each unreadable, unparseable or unusable
//! file becomes one `LoadWarning` and the remaining files are still loaded. Only
//! a missing root directory is a hard error.
//!
//! ## Usage
//!
//! ```ignore
//! use ecomap_core::loader::{LoaderConfig, RecordLoader, RelationshipLoader};
//!
//! let config = LoaderConfig::default();
//! let entities = RecordLoader::new(config.clone()).load(Path::new("data"))?;
//! let relationships = RelationshipLoader::new(config).load(Path::new("data"))?;
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::model::{Category, EntityRecord, RelationshipRecord};

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort a whole load pass.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Root directory does not exist
    #[error("Data root not found: {0}")]
    RootNotFound(PathBuf),

    /// Root path exists but is not a directory
    #[error("Data root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

// ============================================================================
// Warnings
// ============================================================================

/// Why a single document was skipped or altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// File could not be read
    Unreadable,
    /// File is not valid YAML
    Malformed,
    /// File contains no document
    EmptyDocument,
    /// Top-level YAML value is not a mapping
    NotAMapping,
    /// Relationship lacks `source` or `target`
    MissingEndpoint,
    /// Entity id already loaded from another file
    DuplicateId,
}

impl WarningKind {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::Unreadable => "unreadable",
            WarningKind::Malformed => "malformed",
            WarningKind::EmptyDocument => "empty-document",
            WarningKind::NotAMapping => "not-a-mapping",
            WarningKind::MissingEndpoint => "missing-endpoint",
            WarningKind::DuplicateId => "duplicate-id",
        }
    }
}

/// A per-file problem collected during a load pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Offending file
    pub path: PathBuf,
    pub kind: WarningKind,
    pub message: String,
}

impl LoadWarning {
    fn new(path: &Path, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Records produced by a load pass together with the warnings it collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub warnings: Vec<LoadWarning>,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> LoadReport<T> {
    /// Number of loaded records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no record was loaded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if any file produced a warning
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn warn(&mut self, warning: LoadWarning) {
        warn!("Skipping {}", warning);
        self.warnings.push(warning);
    }
}

// ============================================================================
// Loader Configuration
// ============================================================================

/// Maps a corpus folder to the category of the documents inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFolder {
    pub folder: String,
    pub category: Category,
}

impl CategoryFolder {
    pub fn new(folder: impl Into<String>, category: Category) -> Self {
        Self {
            folder: folder.into(),
            category,
        }
    }
}

/// Layout of the corpus on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Category folders, loaded in this order
    pub categories: Vec<CategoryFolder>,
    /// Folder holding relationship documents
    pub relationships_dir: String,
    /// Files whose name starts with this prefix are skipped
    pub template_prefix: String,
    /// Recognized document extensions (without the dot)
    pub extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            categories: Category::BUILTIN
                .iter()
                .map(|c| CategoryFolder::new(c.default_folder(), c.clone()))
                .collect(),
            relationships_dir: "relationships".to_string(),
            template_prefix: "0_template".to_string(),
            extensions: vec!["yaml".to_string(), "yml".to_string()],
        }
    }
}

impl LoaderConfig {
    /// Replace the folder → category mapping
    pub fn with_categories(mut self, categories: Vec<CategoryFolder>) -> Self {
        self.categories = categories;
        self
    }

    /// Set the relationships folder
    pub fn with_relationships_dir(mut self, dir: impl Into<String>) -> Self {
        self.relationships_dir = dir.into();
        self
    }

    /// Set the template prefix
    pub fn with_template_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.template_prefix = prefix.into();
        self
    }

    /// Set the recognized extensions
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Category of documents in a folder, if the folder is mapped.
    pub fn category_for_folder(&self, folder: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.folder == folder)
            .map(|c| &c.category)
    }

    /// Folders mapped to a category.
    pub fn folders_for(&self, category: &Category) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| c.category.same_as(category))
            .map(|c| c.folder.as_str())
            .collect()
    }

    /// Check if a file name denotes a document that should be loaded.
    pub fn is_document(&self, file_name: &str) -> bool {
        if file_name.starts_with('.') {
            return false;
        }
        if !self.template_prefix.is_empty() && file_name.starts_with(&self.template_prefix) {
            debug!("Skipping template {}", file_name);
            return false;
        }
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

// ============================================================================
// Record Loader
// ============================================================================

/// Loads entity records from the category folders of a corpus.
#[derive(Debug, Clone, Default)]
pub struct RecordLoader {
    config: LoaderConfig,
}

impl RecordLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Get the loader configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load every entity record under `root`.
    ///
    /// Ids are unique across categories: a later file reusing an id is skipped
    /// with a `DuplicateId` warning.
    pub fn load(&self, root: &Path) -> Result<LoadReport<EntityRecord>> {
        check_root(root)?;

        let mut report = LoadReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for mapping in &self.config.categories {
            let dir = root.join(&mapping.folder);
            if !dir.is_dir() {
                debug!("Category folder {} not present, skipping", dir.display());
                continue;
            }

            let before = report.records.len();
            for path in self.document_files(&dir, &mut report) {
                let Some(record) = self.load_entity(&path, mapping, &mut report) else {
                    continue;
                };
                if !seen.insert(record.id.clone()) {
                    report.warn(LoadWarning::new(
                        &path,
                        WarningKind::DuplicateId,
                        format!("duplicate id '{}', keeping the first record", record.id),
                    ));
                    continue;
                }
                report.records.push(record);
            }
            debug!(
                "Loaded {} {} record(s) from {}",
                report.records.len() - before,
                mapping.category,
                dir.display()
            );
        }

        info!(
            "Loaded {} entity record(s) with {} warning(s)",
            report.records.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    /// SHA-256 over every entity document's relative path and contents.
    ///
    /// Two corpora with the same fingerprint load to the same records.
    pub fn fingerprint(&self, root: &Path) -> Result<String> {
        check_root(root)?;

        let mut hasher = Sha256::new();
        let mut scratch = LoadReport::<()>::default();

        for mapping in &self.config.categories {
            let dir = root.join(&mapping.folder);
            if !dir.is_dir() {
                continue;
            }
            for path in self.document_files(&dir, &mut scratch) {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                hasher.update(relative.to_string_lossy().as_bytes());
                hasher.update([0u8]);
                match std::fs::read(&path) {
                    Ok(bytes) => hasher.update(&bytes),
                    Err(e) => hasher.update(e.to_string().as_bytes()),
                }
                hasher.update([0u8]);
            }
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    fn document_files<T>(&self, dir: &Path, report: &mut LoadReport<T>) -> Vec<PathBuf> {
        document_files(&self.config, dir, report)
    }

    fn load_entity(
        &self,
        path: &Path,
        mapping: &CategoryFolder,
        report: &mut LoadReport<EntityRecord>,
    ) -> Option<EntityRecord> {
        let document = read_document(path, report)?;
        let id = file_stem(path)?;
        let filename = path.file_name()?.to_string_lossy().into_owned();

        let mut record = EntityRecord::new(id, mapping.category.clone())
            .with_provenance(mapping.folder.clone(), filename)
            .with_tags(string_list(&document, "tags"))
            .with_projects(string_list(&document, "projects"));

        if let Some(name) = scalar(&document, "name") {
            record = record.with_name(name);
        }
        if let Some(declared) = scalar(&document, "@type") {
            record = record.with_declared_type(declared);
        }
        if let Some(subtype) = scalar(&document, "subtype") {
            record = record.with_subtype(subtype);
        }
        if let Some(organisation) = scalar(&document, "organisation") {
            record = record.with_organisation(organisation);
        }
        if let Some(region) = scalar(&document, "region") {
            record = record.with_region(region);
        }

        Some(record)
    }
}

// ============================================================================
// Relationship Loader
// ============================================================================

/// Loads relationship records from the relationships folder of a corpus.
#[derive(Debug, Clone, Default)]
pub struct RelationshipLoader {
    config: LoaderConfig,
}

impl RelationshipLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load every relationship document under `root`.
    ///
    /// A missing relationships folder yields an empty report. Endpoints are not
    /// checked against the entity set.
    pub fn load(&self, root: &Path) -> Result<LoadReport<RelationshipRecord>> {
        check_root(root)?;

        let mut report = LoadReport::default();
        let dir = root.join(&self.config.relationships_dir);
        if !dir.is_dir() {
            debug!("Relationships folder {} not present", dir.display());
            return Ok(report);
        }

        for path in document_files(&self.config, &dir, &mut report) {
            if let Some(record) = self.load_relationship(&path, &mut report) {
                report.records.push(record);
            }
        }

        info!(
            "Loaded {} relationship record(s) with {} warning(s)",
            report.records.len(),
            report.warnings.len()
        );
        Ok(report)
    }

    fn load_relationship(
        &self,
        path: &Path,
        report: &mut LoadReport<RelationshipRecord>,
    ) -> Option<RelationshipRecord> {
        let document = read_document(path, report)?;
        let id = file_stem(path)?;

        let (source, target) = match (scalar(&document, "source"), scalar(&document, "target")) {
            (Some(source), Some(target)) => (source, target),
            (source, _) => {
                let missing = if source.is_none() { "source" } else { "target" };
                report.warn(LoadWarning::new(
                    path,
                    WarningKind::MissingEndpoint,
                    format!("relationship has no '{}'", missing),
                ));
                return None;
            }
        };

        let mut record = RelationshipRecord::new(id, source, target)
            .with_tags(string_list(&document, "tags"));
        if let Some(kind) = scalar(&document, "relationship_type") {
            record = record.with_type(kind);
        }
        if let Some(description) = scalar(&document, "description") {
            record = record.with_description(description);
        }
        if let Some(name) = scalar(&document, "name") {
            record = record.with_name(name);
        }

        Some(record)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn check_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(LoaderError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(LoaderError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Document files directly inside `dir`, sorted by file name.
fn document_files<T>(config: &LoaderConfig, dir: &Path, report: &mut LoadReport<T>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                report.warn(LoadWarning::new(&path, WarningKind::Unreadable, e.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if config.is_document(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    files
}

/// Read and parse one document, recording a warning when it is unusable.
fn read_document<T>(path: &Path, report: &mut LoadReport<T>) -> Option<Mapping> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            report.warn(LoadWarning::new(path, WarningKind::Unreadable, e.to_string()));
            return None;
        }
    };

    let value: Value = match serde_yaml::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            report.warn(LoadWarning::new(
                path,
                WarningKind::Malformed,
                format!("invalid YAML: {}", e),
            ));
            return None;
        }
    };

    match untag(value) {
        Value::Mapping(mapping) => Some(mapping),
        Value::Null => {
            report.warn(LoadWarning::new(
                path,
                WarningKind::EmptyDocument,
                "document is empty",
            ));
            None
        }
        _ => {
            report.warn(LoadWarning::new(
                path,
                WarningKind::NotAMapping,
                "document is not a mapping",
            ));
            None
        }
    }
}

fn untag(value: Value) -> Value {
    match value {
        Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

/// Scalar field as text; blank strings and non-scalars read as absent.
fn scalar(document: &Mapping, key: &str) -> Option<String> {
    document.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => return scalar_text(&tagged.value),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// List field as text values; a lone scalar reads as a one-element list.
fn string_list(document: &Mapping, key: &str) -> Vec<String> {
    match document.get(key) {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(other) => scalar_text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_is_document() {
        let config = LoaderConfig::default();
        assert!(config.is_document("council.yaml"));
        assert!(config.is_document("council.YML"));
        assert!(!config.is_document("0_template.yaml"));
        assert!(!config.is_document("0_template_service.yaml"));
        assert!(!config.is_document(".hidden.yaml"));
        assert!(!config.is_document("notes.md"));
        assert!(!config.is_document("README"));
    }

    #[test]
    fn test_default_config_folders() {
        let config = LoaderConfig::default();
        assert_eq!(config.categories.len(), 7);
        assert_eq!(
            config.category_for_folder("organizations"),
            Some(&Category::Organization)
        );
        assert_eq!(config.folders_for(&Category::Resource), vec!["resources"]);
        assert_eq!(config.category_for_folder("relationships"), None);
    }

    #[test]
    fn test_load_entity_fields() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "services/food-bank.yaml",
            "name: Food Bank\n\"@type\": SERVICE\nsubtype: Emergency\norganisation: Trust\nregion: North\ntags: [food, community, food]\nprojects: pilot\nextra: ignored\n",
        );

        let report = RecordLoader::default().load(dir.path()).unwrap();
        assert!(!report.has_warnings());
        assert_eq!(report.len(), 1);

        let record = &report.records[0];
        assert_eq!(record.id, "food-bank");
        assert_eq!(record.category, Category::Service);
        assert_eq!(record.label(), "Food Bank");
        assert_eq!(record.declared_type.as_deref(), Some("SERVICE"));
        assert_eq!(record.subtype.as_deref(), Some("Emergency"));
        assert_eq!(record.organisation.as_deref(), Some("Trust"));
        assert_eq!(record.region.as_deref(), Some("North"));
        assert_eq!(record.tags, vec!["food", "community"]);
        assert_eq!(record.projects, vec!["pilot"]);
        assert_eq!(record.folder, "services");
        assert_eq!(record.filename, "food-bank.yaml");
    }

    #[test]
    fn test_scalar_values_are_stringified() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "items/a.yaml", "name: 2024\nregion: ''\ntags: [1, true]\n");

        let report = RecordLoader::default().load(dir.path()).unwrap();
        let record = &report.records[0];
        assert_eq!(record.label(), "2024");
        assert_eq!(record.region, None);
        assert_eq!(record.tags, vec!["1", "true"]);
    }

    #[test]
    fn test_relationship_type_defaults() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "relationships/r1.yaml", "source: a\ntarget: b\n");

        let report = RelationshipLoader::default().load(dir.path()).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.records[0].relationship_type, "relatesTo");
        assert_eq!(report.records[0].id, "r1");
    }

    #[test]
    fn test_relationship_missing_endpoint_warns() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "relationships/r1.yaml", "source: a\n");
        write(dir.path(), "relationships/r2.yaml", "target: b\n");

        let report = RelationshipLoader::default().load(dir.path()).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .all(|w| w.kind == WarningKind::MissingEndpoint));
        assert!(report.warnings[0].message.contains("target"));
        assert!(report.warnings[1].message.contains("source"));
    }

    #[test]
    fn test_empty_and_scalar_documents_warn() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "plans/empty.yaml", "");
        write(dir.path(), "plans/scalar.yaml", "just a string\n");

        let report = RecordLoader::default().load(dir.path()).unwrap();
        assert!(report.is_empty());
        let kinds: Vec<_> = report.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::EmptyDocument, WarningKind::NotAMapping]);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "events/launch.yaml", "name: Launch\n");

        let loader = RecordLoader::default();
        let first = loader.fingerprint(dir.path()).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, loader.fingerprint(dir.path()).unwrap());

        write(dir.path(), "events/launch.yaml", "name: Relaunch\n");
        assert_ne!(first, loader.fingerprint(dir.path()).unwrap());
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let err = RecordLoader::default().load(&missing).unwrap_err();
        assert!(matches!(err, LoaderError::RootNotFound(_)));

        let err = RelationshipLoader::default().load(&missing).unwrap_err();
        assert!(matches!(err, LoaderError::RootNotFound(_)));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.yaml");
        fs::write(&file, "name: x\n").unwrap();

        let err = RecordLoader::default().load(&file).unwrap_err();
        assert!(matches!(err, LoaderError::NotADirectory(_)));
    }
}
