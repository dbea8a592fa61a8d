//! Vault index: page records, derived lookup structures and the indexer
//! that keeps them current.
//!
//! - [`PageStore`] holds one [`PageMetadata`] per markdown file
//! - [`VaultIndex`] derives tag, folder, link and backlink lookups from it
//! - [`VaultIndexer`] scans a vault, applies incremental updates, persists
//!   pages to a SQLite [`PageCache`] and optionally watches the filesystem
//!
//! # Example
//!
//! ```no_run
//! use vaultdex_core::index::{IndexerConfig, VaultIndexer};
//!
//! let indexer = VaultIndexer::new(IndexerConfig::new("/path/to/vault"));
//! indexer.initialize()?;
//! for page in indexer.documents_with_tag("project") {
//!     println!("{}", page.relative_path);
//! }
//! # Ok::<(), vaultdex_core::index::IndexerError>(())
//! ```

pub mod cache;
pub mod indexer;
pub mod schema;
pub mod store;
pub mod structures;
pub mod types;
pub mod watcher;

pub use cache::{CacheError, PageCache};
pub use indexer::{IndexerConfig, IndexerError, UpdateOutcome, VaultIndexer};
pub use schema::{SCHEMA_VERSION, SchemaError};
pub use store::PageStore;
pub use structures::{IndexSnapshot, VaultIndex, normalize_link_target};
pub use types::{
    Document, IndexEvent, IndexStats, IndexStatus, IndexingError, PageMetadata, ScanReport,
};
pub use watcher::{Debouncer, VaultWatcher, WatchError, WatchEvent, WatchEventKind};
