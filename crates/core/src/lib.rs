//! Markdown vault indexing and querying.
//!
//! - [`vault`]: file discovery, filesystem access and content extraction
//! - [`frontmatter`]: YAML frontmatter parsing
//! - [`index`]: page store, derived lookups, cache and the [`index::VaultIndexer`]
//! - [`query`]: structured queries, filter collections and document sets
//! - [`registry`]: one indexer per configured vault
//! - [`config`]: TOML configuration

pub mod config;
pub mod frontmatter;
pub mod index;
pub mod query;
pub mod registry;
pub mod vault;

pub use index::{Document, IndexStatus, IndexerConfig, PageMetadata, VaultIndexer};
pub use query::{DocumentSet, FilterCollection, QueryError, StructuredQuery};
pub use registry::{SimilarityHit, SimilaritySearch, VaultRegistry};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
