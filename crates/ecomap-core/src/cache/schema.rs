//! SQLite Schema for the Columnar Cache
//!
//! One flattened row per entity document. List-valued fields are stored joined
//! with ", " so downstream tools can read the table without YAML.

/// Schema version of cache databases
pub const CACHE_SCHEMA_VERSION: &str = "1.0";

/// Metadata key holding the schema version
pub const META_SCHEMA_VERSION: &str = "schema_version";

/// Metadata key holding the corpus fingerprint the rows were built from
pub const META_SOURCE_FINGERPRINT: &str = "source_fingerprint";

/// Metadata key holding the build time (seconds since the Unix epoch)
pub const META_BUILT_AT: &str = "built_at";

/// Separator used for list-valued columns
pub const LIST_SEPARATOR: &str = ", ";

/// SQL to create the entity table
///
/// `id` is the file stem; the other columns follow the document schema.
pub const SCHEMA_CREATE_INDEX_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS index_data (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT,
    type TEXT,
    subtype TEXT,
    tags TEXT,
    organisation TEXT,
    region TEXT,
    projects TEXT,
    folder TEXT NOT NULL,
    filename TEXT NOT NULL
)
"#;

/// SQL to create the metadata table
pub const SCHEMA_CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_metadata (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
)
"#;

/// SQL to create indexes for the category and region lookups
pub const SCHEMA_CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_index_data_folder ON index_data(folder);
CREATE INDEX IF NOT EXISTS idx_index_data_type ON index_data(type);
CREATE INDEX IF NOT EXISTS idx_index_data_region ON index_data(region);
"#;

/// Column names for entity queries (in order for row mapping)
pub const INDEX_DATA_COLUMNS: &str =
    "id, name, type, subtype, tags, organisation, region, projects, folder, filename";

/// The same columns one by one, used as the CSV header
pub const INDEX_COLUMN_NAMES: [&str; 10] = [
    "id",
    "name",
    "type",
    "subtype",
    "tags",
    "organisation",
    "region",
    "projects",
    "folder",
    "filename",
];

/// Expression reproducing the free-text search haystack inside SQLite
pub const SEARCH_HAYSTACK_SQL: &str = "(COALESCE(NULLIF(name, ''), id) || ' ' || id || ' ' || \
     COALESCE(organisation, '') || ' ' || COALESCE(tags, ''))";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(SCHEMA_CREATE_INDEX_DATA, []).unwrap();
        conn.execute(SCHEMA_CREATE_METADATA, []).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(tables, vec!["cache_metadata", "index_data"]);
    }

    #[test]
    fn test_schema_creates_indexes() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(SCHEMA_CREATE_INDEX_DATA, []).unwrap();
        conn.execute_batch(SCHEMA_CREATE_INDEXES).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(indexes.contains(&"idx_index_data_folder".to_string()));
        assert!(indexes.contains(&"idx_index_data_region".to_string()));
    }

    #[test]
    fn test_column_list_matches_names() {
        assert_eq!(INDEX_COLUMN_NAMES.join(", "), INDEX_DATA_COLUMNS);
    }

    #[test]
    fn test_haystack_expression() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(SCHEMA_CREATE_INDEX_DATA, []).unwrap();
        conn.execute(
            "INSERT INTO index_data (id, name, tags, folder, filename) VALUES ('a', NULL, 'x, y', 'items', 'a.yaml')",
            [],
        )
        .unwrap();

        let haystack: String = conn
            .query_row(
                &format!("SELECT {} FROM index_data", SEARCH_HAYSTACK_SQL),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(haystack, "a a  x, y");
    }
}
