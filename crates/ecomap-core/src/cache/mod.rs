//! Columnar Cache
//!
//! A SQLite snapshot of the entity records, one flattened row per document.
//! The cache is always rebuilt wholesale from the corpus and carries the corpus
//! fingerprint it was built from, so a reader can tell when it is stale.
//!
//! ## Usage
//!
//! ```ignore
//! use ecomap_core::cache::ColumnarCache;
//!
//! let cache = ColumnarCache::create(Path::new(".ecomap/index.db"))?;
//! cache.rebuild(&report.records, &fingerprint)?;
//! let services = cache.query(&filter, &loader_config)?;
//! ```

pub mod query;
pub mod schema;
pub mod store;

pub use query::{build_predicate, like_pattern, SqlPredicate};
pub use schema::{CACHE_SCHEMA_VERSION, INDEX_COLUMN_NAMES};
pub use store::{CacheError, CacheStatus, ColumnarCache};
