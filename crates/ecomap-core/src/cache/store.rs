//! SQLite connection and operations for the columnar cache.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use std::io::Write;

use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Result as SqliteResult,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::filter::FilterSpec;
use crate::loader::LoaderConfig;
use crate::model::{Category, EntityRecord};

use super::query::build_predicate;
use super::schema::{
    CACHE_SCHEMA_VERSION, INDEX_COLUMN_NAMES, INDEX_DATA_COLUMNS, LIST_SEPARATOR, META_BUILT_AT,
    META_SCHEMA_VERSION, META_SOURCE_FINGERPRINT, SCHEMA_CREATE_INDEXES, SCHEMA_CREATE_INDEX_DATA,
    SCHEMA_CREATE_METADATA,
};

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: String, found: String },

    #[error("Cache not found: {0}")]
    NotFound(PathBuf),

    #[error("Cache file {path} is unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Freshness of a cache file relative to the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// No cache file exists
    Missing,
    /// Cache rows were built from the current corpus
    Fresh { rows: usize },
    /// Corpus changed since the cache was built
    Stale { rows: usize },
    /// Cache was written with another schema version
    Incompatible { found: String },
    /// File exists but is not a cache database
    Unreadable,
}

impl CacheStatus {
    /// Check if the cache can be read as-is
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheStatus::Fresh { .. })
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Missing => "missing",
            CacheStatus::Fresh { .. } => "fresh",
            CacheStatus::Stale { .. } => "stale",
            CacheStatus::Incompatible { .. } => "incompatible",
            CacheStatus::Unreadable => "unreadable",
        }
    }

    /// Check if the file must be deleted before a rebuild
    pub fn needs_replacing(&self) -> bool {
        matches!(self, CacheStatus::Incompatible { .. } | CacheStatus::Unreadable)
    }
}

/// Flattened snapshot of the entity records in SQLite.
pub struct ColumnarCache {
    conn: Connection,
    path: Option<PathBuf>,
}

impl ColumnarCache {
    /// Open an existing cache database
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CacheError::NotFound(path.to_path_buf()));
        }

        let classify = |e: rusqlite::Error| unreadable(path, e);
        let conn = Connection::open(path).map_err(classify)?;
        Self::configure_connection(&conn).map_err(classify)?;

        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_metadata WHERE key = ?1",
                [META_SCHEMA_VERSION],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify)?;
        let version = version.unwrap_or_default();
        if version != CACHE_SCHEMA_VERSION {
            return Err(CacheError::SchemaVersionMismatch {
                expected: CACHE_SCHEMA_VERSION.to_string(),
                found: version,
            });
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create a new cache database with schema
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_connection(&conn)?;
        Self::create_schema(&conn)?;

        let cache = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        cache.set_metadata(META_SCHEMA_VERSION, CACHE_SCHEMA_VERSION)?;
        Ok(cache)
    }

    /// Create an in-memory cache database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure_connection(&conn)?;
        Self::create_schema(&conn)?;

        let cache = Self { conn, path: None };
        cache.set_metadata(META_SCHEMA_VERSION, CACHE_SCHEMA_VERSION)?;
        Ok(cache)
    }

    fn configure_connection(conn: &Connection) -> SqliteResult<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        Ok(())
    }

    fn create_schema(conn: &Connection) -> SqliteResult<()> {
        conn.execute(SCHEMA_CREATE_INDEX_DATA, [])?;
        conn.execute(SCHEMA_CREATE_METADATA, [])?;
        conn.execute_batch(SCHEMA_CREATE_INDEXES)?;
        Ok(())
    }

    /// Report how a cache file relates to the corpus fingerprint.
    pub fn status(path: &Path, fingerprint: &str) -> Result<CacheStatus> {
        if !path.exists() {
            return Ok(CacheStatus::Missing);
        }

        let cache = match Self::open(path) {
            Ok(cache) => cache,
            Err(CacheError::SchemaVersionMismatch { found, .. }) => {
                return Ok(CacheStatus::Incompatible { found });
            }
            Err(CacheError::Unreadable { reason, .. }) => {
                warn!("Cache {} is unreadable: {}", path.display(), reason);
                return Ok(CacheStatus::Unreadable);
            }
            Err(e) => return Err(e),
        };

        let rows = cache.row_count()?;
        if cache.fingerprint()?.as_deref() == Some(fingerprint) {
            Ok(CacheStatus::Fresh { rows })
        } else {
            Ok(CacheStatus::Stale { rows })
        }
    }

    /// Path of the database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Metadata Operations
    // =========================================================================

    /// Get a metadata value
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cache_metadata WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Set a metadata value
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cache_metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Corpus fingerprint the rows were built from
    pub fn fingerprint(&self) -> Result<Option<String>> {
        self.get_metadata(META_SOURCE_FINGERPRINT)
    }

    /// Build time in seconds since the Unix epoch
    pub fn built_at(&self) -> Result<Option<u64>> {
        Ok(self
            .get_metadata(META_BUILT_AT)?
            .and_then(|v| v.parse().ok()))
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Replace every row with `records` in one transaction.
    pub fn rebuild(&self, records: &[EntityRecord], fingerprint: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM index_data", [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO index_data ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                INDEX_DATA_COLUMNS
            ))?;
            for record in records {
                stmt.execute(params![
                    record.id,
                    record.name,
                    record.declared_type,
                    record.subtype,
                    joined(&record.tags),
                    record.organisation,
                    record.region,
                    joined(&record.projects),
                    record.folder,
                    record.filename,
                ])?;
            }
        }

        let built_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        tx.execute(
            "INSERT OR REPLACE INTO cache_metadata (key, value) VALUES (?1, ?2)",
            params![META_SOURCE_FINGERPRINT, fingerprint],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO cache_metadata (key, value) VALUES (?1, ?2)",
            params![META_BUILT_AT, built_at.to_string()],
        )?;
        tx.commit()?;

        info!("Cached {} entity row(s)", records.len());
        Ok(records.len())
    }

    /// Number of cached rows
    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM index_data", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Read every row back as an entity record, ordered by folder then file.
    pub fn read_records(&self, config: &LoaderConfig) -> Result<Vec<EntityRecord>> {
        self.query(&FilterSpec::new(), config)
    }

    /// Records matching a filter.
    ///
    /// The SQL predicate narrows the scan; the filter itself decides each row.
    pub fn query(&self, filter: &FilterSpec, config: &LoaderConfig) -> Result<Vec<EntityRecord>> {
        let predicate = build_predicate(filter, config);
        let sql = format!(
            "SELECT {} FROM index_data{} ORDER BY folder, filename",
            INDEX_DATA_COLUMNS,
            predicate.where_sql()
        );
        debug!("Cache query: {} {:?}", sql, predicate.params);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(predicate.params.iter()), |row| {
            Self::row_to_record(row, config)
        })?;

        let mut records = Vec::new();
        for row in rows {
            let record = row?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Write every row as CSV, header first, ordered by folder then file.
    ///
    /// List columns keep their joined form and NULLs become empty fields.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(INDEX_COLUMN_NAMES)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM index_data ORDER BY folder, filename",
            INDEX_DATA_COLUMNS
        ))?;
        let mut rows = stmt.query([])?;

        let mut written = 0;
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(INDEX_COLUMN_NAMES.len());
            for i in 0..INDEX_COLUMN_NAMES.len() {
                let value: Option<String> = row.get(i)?;
                fields.push(value.unwrap_or_default());
            }
            out.write_record(&fields)?;
            written += 1;
        }

        out.flush()?;
        debug!("Exported {} cache row(s) as CSV", written);
        Ok(written)
    }

    fn row_to_record(row: &rusqlite::Row<'_>, config: &LoaderConfig) -> SqliteResult<EntityRecord> {
        let id: String = row.get(0)?;
        let name: Option<String> = row.get(1)?;
        let type_tag: Option<String> = row.get(2)?;
        let subtype: Option<String> = row.get(3)?;
        let tags: Option<String> = row.get(4)?;
        let organisation: Option<String> = row.get(5)?;
        let region: Option<String> = row.get(6)?;
        let projects: Option<String> = row.get(7)?;
        let folder: String = row.get(8)?;
        let filename: String = row.get(9)?;

        let category = match config.category_for_folder(&folder) {
            Some(category) => category.clone(),
            None => match type_tag.as_deref() {
                Some(t) if !t.trim().is_empty() => Category::parse(t),
                _ => Category::Custom(folder.clone()),
            },
        };

        let mut record = EntityRecord::new(id, category)
            .with_provenance(folder, filename)
            .with_tags(split(tags.as_deref()))
            .with_projects(split(projects.as_deref()));
        record.name = name.filter(|s| !s.is_empty());
        record.subtype = subtype.filter(|s| !s.is_empty());
        record.organisation = organisation.filter(|s| !s.is_empty());
        record.region = region.filter(|s| !s.is_empty());
        record.declared_type = type_tag.filter(|s| !s.is_empty());

        Ok(record)
    }
}

/// Errors meaning the file is not a cache this version can read.
fn unreadable(path: &Path, error: rusqlite::Error) -> CacheError {
    let not_a_cache = match &error {
        rusqlite::Error::SqliteFailure(failure, message) => {
            matches!(failure.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
                || message
                    .as_deref()
                    .is_some_and(|m| m.starts_with("no such table"))
        }
        _ => false,
    };

    if not_a_cache {
        CacheError::Unreadable {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    } else {
        CacheError::Sqlite(error)
    }
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(LIST_SEPARATOR))
    }
}

fn split(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| v.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}
