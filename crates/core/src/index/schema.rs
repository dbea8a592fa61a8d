//! SQLite schema for the page cache.
//!
//! The version lives in `PRAGMA user_version`. A cache holds nothing that
//! cannot be rebuilt from the vault, so an older layout is dropped and
//! recreated rather than migrated.

use rusqlite::Connection;
use thiserror::Error;

pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cache schema version {found} is newer than supported version {supported}")]
    VersionTooNew { found: i32, supported: i32 },
}

const CREATE_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS cache_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- `position` preserves indexing order
    CREATE TABLE IF NOT EXISTS pages (
        path TEXT PRIMARY KEY,
        position INTEGER NOT NULL,
        relative_path TEXT NOT NULL,
        folder_path TEXT NOT NULL,
        basename TEXT NOT NULL,
        title TEXT NOT NULL,
        frontmatter_json TEXT NOT NULL,
        tags_json TEXT NOT NULL,
        inline_tags_json TEXT NOT NULL,
        links_json TEXT NOT NULL,
        mtime INTEGER NOT NULL,
        size INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_pages_position ON pages(position);
"#;

const DROP_TABLES: &str = r#"
    DROP TABLE IF EXISTS pages;
    DROP TABLE IF EXISTS cache_meta;
"#;

/// Bring `conn` to [`SCHEMA_VERSION`].
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew { found, supported: SCHEMA_VERSION });
    }
    if found == SCHEMA_VERSION {
        return Ok(());
    }

    if found > 0 {
        tracing::info!("Rebuilding page cache schema v{found} as v{SCHEMA_VERSION}");
    }
    conn.execute_batch(DROP_TABLES)?;
    conn.execute_batch(CREATE_TABLES)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn user_version(conn: &Connection) -> Result<i32, SchemaError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'pages'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(table_count(&conn), 1);
    }

    #[test]
    fn unversioned_tables_are_replaced() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE pages (path TEXT)").unwrap();
        init_schema(&conn).unwrap();

        let has_position: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('pages') WHERE name = 'position'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_position, 1);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1).unwrap();

        assert!(matches!(
            init_schema(&conn),
            Err(SchemaError::VersionTooNew { found, .. }) if found == SCHEMA_VERSION + 1
        ));
    }
}
