//! Ecomap Core - Filtering and graph projection over a YAML record corpus
//!
//! This crate provides the core functionality for browsing an ecosystem map:
//! - Record and relationship loading from per-category YAML folders
//! - A multi-field filter engine shared by list and graph views
//! - Graph projection with Inclusive-OR / Strict-AND edge closure and degree sizing
//! - A SQLite columnar cache as an alternative entity source

pub mod builder;
pub mod cache;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod model;
pub mod source;

// Record re-exports
pub use model::{
    Category, EntityRecord, RelationshipRecord, DEFAULT_RELATIONSHIP_TYPE, UNCLASSIFIED_GROUP,
};

// Loader re-exports
pub use loader::{
    CategoryFolder, LoadReport, LoadWarning, LoaderConfig, LoaderError, RecordLoader,
    RelationshipLoader, WarningKind,
};

// Filter re-exports
pub use filter::{CategoryFilter, FilterSpec};

// Builder and projection re-exports
pub use builder::{BuilderConfig, ClosurePolicy, GraphBuilder, NodeSizing};
pub use graph::{
    GraphProjection, ProjectedEdge, ProjectedNode, ProjectionGraph, ProjectionSummary,
    RenderGraph,
};

// Cache and source re-exports
pub use cache::{CacheError, CacheStatus, ColumnarCache};
pub use source::{CachedSource, Corpus, DirectorySource, EntitySource, SourceError};
