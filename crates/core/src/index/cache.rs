//! On-disk page cache.
//!
//! Only the page store is persisted; the derived index structures are rebuilt
//! on load. Each vault gets its own SQLite file, named after a hash of the
//! vault root path.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::schema::{SchemaError, init_schema};
use super::types::PageMetadata;
use crate::frontmatter::Frontmatter;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("failed to create cache directory {0}: {1}")]
    CreateDir(String, #[source] std::io::Error),

    #[error("cache belongs to vault {found}, expected {expected}")]
    VaultMismatch { found: String, expected: String },

    #[error("corrupt cache entry for {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

const VAULT_ROOT_KEY: &str = "vault_root";

/// Page cache handle for one vault.
pub struct PageCache {
    conn: Connection,
    vault_root: String,
}

impl PageCache {
    /// Open or create the cache database at `path` for the given vault.
    pub fn open(path: &Path, vault_root: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::CreateDir(parent.display().to_string(), e))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        Self::with_connection(conn, vault_root)
    }

    /// Create an in-memory cache (for testing).
    pub fn open_in_memory(vault_root: &Path) -> Result<Self, CacheError> {
        Self::with_connection(Connection::open_in_memory()?, vault_root)
    }

    fn with_connection(conn: Connection, vault_root: &Path) -> Result<Self, CacheError> {
        init_schema(&conn)?;

        let vault_root = vault_root.to_string_lossy().to_string();
        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_meta WHERE key = ?1",
                [VAULT_ROOT_KEY],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(found) = stored
            && found != vault_root
        {
            return Err(CacheError::VaultMismatch { found, expected: vault_root });
        }

        Ok(Self { conn, vault_root })
    }

    /// Cache file location for a vault inside `cache_dir`.
    pub fn path_for(cache_dir: &Path, vault_root: &Path) -> PathBuf {
        let name = vault_root.file_name().and_then(|n| n.to_str()).unwrap_or("vault");
        let hash = fnv1a(vault_root.as_os_str().as_encoded_bytes());
        cache_dir.join(format!("{}-{hash:016x}.db", sanitize(name)))
    }

    /// Replace the cached pages with `pages`, preserving their order.
    pub fn save(&mut self, pages: &[PageMetadata]) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;

        tx.execute("DELETE FROM pages", [])?;
        tx.execute(
            "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?1, ?2)",
            params![VAULT_ROOT_KEY, self.vault_root],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (path, position, relative_path, folder_path, basename, title,
                                    frontmatter_json, tags_json, inline_tags_json, links_json,
                                    mtime, size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;

            for (position, page) in pages.iter().enumerate() {
                let path = page.path.to_string_lossy().to_string();
                let to_json = |value: serde_json::Result<String>| {
                    value.map_err(|source| CacheError::Corrupt { path: path.clone(), source })
                };

                stmt.execute(params![
                    path,
                    i64::try_from(position).unwrap_or(i64::MAX),
                    page.relative_path,
                    page.folder_path,
                    page.basename,
                    page.title,
                    to_json(serde_json::to_string(&page.frontmatter))?,
                    to_json(serde_json::to_string(&page.tags))?,
                    to_json(serde_json::to_string(&page.inline_tags))?,
                    to_json(serde_json::to_string(&page.links))?,
                    page.mtime,
                    i64::try_from(page.size).unwrap_or(i64::MAX),
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Saved {} pages to cache for {}", pages.len(), self.vault_root);
        Ok(())
    }

    /// Load all cached pages in their original order.
    pub fn load(&self) -> Result<Vec<PageMetadata>, CacheError> {
        let mut stmt = self.conn.prepare(
            "SELECT path, relative_path, folder_path, basename, title, frontmatter_json,
                    tags_json, inline_tags_json, links_json, mtime, size
             FROM pages ORDER BY position",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RawPage {
                path: row.get(0)?,
                relative_path: row.get(1)?,
                folder_path: row.get(2)?,
                basename: row.get(3)?,
                title: row.get(4)?,
                frontmatter_json: row.get(5)?,
                tags_json: row.get(6)?,
                inline_tags_json: row.get(7)?,
                links_json: row.get(8)?,
                mtime: row.get(9)?,
                size: row.get(10)?,
            })
        })?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?.into_page()?);
        }
        Ok(pages)
    }

    /// Number of cached pages.
    pub fn count(&self) -> Result<usize, CacheError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

struct RawPage {
    path: String,
    relative_path: String,
    folder_path: String,
    basename: String,
    title: String,
    frontmatter_json: String,
    tags_json: String,
    inline_tags_json: String,
    links_json: String,
    mtime: i64,
    size: i64,
}

impl RawPage {
    fn into_page(self) -> Result<PageMetadata, CacheError> {
        let path = self.path;
        let decode = |json: &str| -> Result<Vec<String>, CacheError> { decode(&path, json) };

        Ok(PageMetadata {
            frontmatter: decode_as::<Frontmatter>(&path, &self.frontmatter_json)?,
            tags: decode(&self.tags_json)?,
            inline_tags: decode(&self.inline_tags_json)?,
            links: decode(&self.links_json)?,
            relative_path: self.relative_path,
            folder_path: self.folder_path,
            basename: self.basename,
            title: self.title,
            mtime: self.mtime,
            size: u64::try_from(self.size).unwrap_or(0),
            path: PathBuf::from(path),
        })
    }
}

fn decode(path: &str, json: &str) -> Result<Vec<String>, CacheError> {
    decode_as(path, json)
}

fn decode_as<T: DeserializeOwned>(path: &str, json: &str) -> Result<T, CacheError> {
    serde_json::from_str(json)
        .map_err(|source| CacheError::Corrupt { path: path.to_string(), source })
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// 64-bit FNV-1a. Cache file names depend on it, so its output must not
/// change between toolchains.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn page(name: &str) -> PageMetadata {
        let mut frontmatter = Frontmatter::default();
        frontmatter.fields.insert("status".into(), json!("draft"));
        frontmatter.fields.insert("nested".into(), json!({"n": [1, 2]}));

        PageMetadata {
            path: PathBuf::from(format!("/vault/{name}.md")),
            relative_path: format!("{name}.md"),
            folder_path: String::new(),
            basename: name.to_string(),
            title: name.to_uppercase(),
            frontmatter,
            tags: vec!["x".into(), "y".into()],
            inline_tags: vec!["#y".into()],
            links: vec!["other".into(), "other".into()],
            mtime: 1_700_000_000_123,
            size: 42,
        }
    }

    #[test]
    fn save_and_load_preserves_pages_and_order() {
        let mut cache = PageCache::open_in_memory(Path::new("/vault")).unwrap();
        let pages = vec![page("zeta"), page("alpha")];

        cache.save(&pages).unwrap();
        assert_eq!(cache.load().unwrap(), pages);
        assert_eq!(cache.count().unwrap(), 2);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let mut cache = PageCache::open_in_memory(Path::new("/vault")).unwrap();
        cache.save(&[page("a"), page("b")]).unwrap();
        cache.save(&[page("c")]).unwrap();

        let loaded = cache.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].basename, "c");
    }

    #[test]
    fn reopening_for_another_vault_fails() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("cache.db");

        let mut cache = PageCache::open(&db, Path::new("/vault-a")).unwrap();
        cache.save(&[page("a")]).unwrap();
        drop(cache);

        let err = PageCache::open(&db, Path::new("/vault-b")).err().unwrap();
        assert!(matches!(err, CacheError::VaultMismatch { .. }));
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("cache.db");
        std::fs::write(&db, b"definitely not sqlite, just some bytes padding it out").unwrap();

        assert!(PageCache::open(&db, Path::new("/vault")).is_err());
    }

    #[test]
    fn cache_path_is_stable_per_vault() {
        let dir = Path::new("/cache");
        let a = PageCache::path_for(dir, Path::new("/home/me/My Notes"));
        let b = PageCache::path_for(dir, Path::new("/home/me/My Notes"));
        let c = PageCache::path_for(dir, Path::new("/home/me/Other"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.file_name().unwrap().to_string_lossy().starts_with("My_Notes-"));
    }

    #[cfg(unix)]
    #[test]
    fn cache_file_name_is_pinned() {
        let path = PageCache::path_for(Path::new("/cache"), Path::new("/home/me/My Notes"));
        assert_eq!(path, Path::new("/cache/My_Notes-b74df75c512bd99e.db"));
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
    }
}
