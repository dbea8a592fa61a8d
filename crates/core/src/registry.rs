//! Registry of configured vaults and their indexers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::config::ResolvedConfig;
use crate::index::{IndexStatus, IndexerError, ScanReport, VaultIndexer};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown vault: {0}")]
    UnknownVault(String),

    #[error("vault '{0}' is already registered")]
    DuplicateVault(String),

    #[error("vault '{id}' is not available: {reason}")]
    VaultNotAvailable { id: String, status: IndexStatus, reason: String },

    #[error("vault '{0}' has no similarity search configured")]
    NoSimilaritySearch(String),

    #[error("similarity search failed for vault '{id}': {source}")]
    Similarity {
        id: String,
        #[source]
        source: SimilarityError,
    },
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimilarityError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub path: PathBuf,
    pub score: f32,
}

/// A semantic search backend for one vault.
pub trait SimilaritySearch: Send + Sync {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SimilarityHit>, SimilarityError>;
}

/// One registered vault.
#[derive(Clone)]
pub struct Vault {
    id: String,
    indexer: VaultIndexer,
    similarity: Option<Arc<dyn SimilaritySearch>>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("id", &self.id)
            .field("indexer", &self.indexer)
            .field("similarity", &self.similarity.is_some())
            .finish()
    }
}

impl Vault {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn indexer(&self) -> &VaultIndexer {
        &self.indexer
    }

    pub fn status(&self) -> IndexStatus {
        self.indexer.status()
    }

    /// Why the vault failed to initialize, if it did.
    pub fn error(&self) -> Option<String> {
        self.indexer.init_error()
    }
}

/// Owns one indexer per vault id. Vaults initialize independently: one
/// failing vault never blocks the others.
#[derive(Debug, Default)]
pub struct VaultRegistry {
    vaults: RwLock<BTreeMap<String, Vault>>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with one uninitialized indexer per configured vault.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let registry = Self::new();
        {
            let mut vaults = registry.vaults.write();
            for vault in &config.vaults {
                let indexer = VaultIndexer::new(vault.indexer_config(&config.cache_dir));
                vaults.insert(
                    vault.id.clone(),
                    Vault { id: vault.id.clone(), indexer, similarity: None },
                );
            }
        }
        registry
    }

    pub fn register(&self, id: &str, indexer: VaultIndexer) -> Result<(), RegistryError> {
        let mut vaults = self.vaults.write();
        if vaults.contains_key(id) {
            return Err(RegistryError::DuplicateVault(id.to_string()));
        }
        vaults.insert(id.to_string(), Vault { id: id.to_string(), indexer, similarity: None });
        Ok(())
    }

    pub fn set_similarity(
        &self,
        id: &str,
        search: Arc<dyn SimilaritySearch>,
    ) -> Result<(), RegistryError> {
        let mut vaults = self.vaults.write();
        let vault =
            vaults.get_mut(id).ok_or_else(|| RegistryError::UnknownVault(id.to_string()))?;
        vault.similarity = Some(search);
        Ok(())
    }

    /// Initialize every vault, each on its own thread. Returns the outcome
    /// per vault id; failed vaults are left in the error state.
    pub fn init(&self) -> Vec<(String, Result<ScanReport, IndexerError>)> {
        let vaults: Vec<Vault> = self.vaults.read().values().cloned().collect();

        std::thread::scope(|scope| {
            let handles: Vec<_> = vaults
                .iter()
                .map(|vault| (vault.id.clone(), scope.spawn(|| vault.indexer.initialize())))
                .collect();

            handles
                .into_iter()
                .filter_map(|(id, handle)| match handle.join() {
                    Ok(result) => {
                        if let Err(e) = &result {
                            tracing::error!("Vault '{id}' failed to initialize: {e}");
                        }
                        Some((id, result))
                    }
                    Err(_) => {
                        tracing::error!("Initialization thread for vault '{id}' panicked");
                        None
                    }
                })
                .collect()
        })
    }

    /// Initialize a single vault.
    pub fn init_vault(&self, id: &str) -> Result<Result<ScanReport, IndexerError>, RegistryError> {
        let vault = self.get(id)?;
        Ok(vault.indexer.initialize())
    }

    pub fn get(&self, id: &str) -> Result<Vault, RegistryError> {
        self.vaults
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownVault(id.to_string()))
    }

    /// The indexer of a ready vault.
    pub fn indexer(&self, id: &str) -> Result<VaultIndexer, RegistryError> {
        let vault = self.get(id)?;
        match vault.status() {
            IndexStatus::Ready => Ok(vault.indexer),
            status => Err(RegistryError::VaultNotAvailable {
                id: id.to_string(),
                status,
                reason: vault.error().unwrap_or_else(|| format!("status is {status}")),
            }),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.vaults.read().keys().cloned().collect()
    }

    pub fn statuses(&self) -> Vec<(String, IndexStatus)> {
        self.vaults.read().iter().map(|(id, v)| (id.clone(), v.status())).collect()
    }

    /// Run a similarity search against a ready vault.
    pub fn similar(
        &self,
        id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SimilarityHit>, RegistryError> {
        self.indexer(id)?;
        let search = self
            .get(id)?
            .similarity
            .ok_or_else(|| RegistryError::NoSimilaritySearch(id.to_string()))?;
        search
            .search(query, limit)
            .map_err(|source| RegistryError::Similarity { id: id.to_string(), source })
    }

    /// Shut down every indexer. Vaults stay registered in the stopped state.
    pub fn shutdown(&self) {
        for vault in self.vaults.read().values() {
            vault.indexer.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexerConfig;
    use std::fs;
    use tempfile::TempDir;

    struct FixedSearch;

    impl SimilaritySearch for FixedSearch {
        fn search(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<SimilarityHit>, SimilarityError> {
            if query.is_empty() {
                return Err(SimilarityError("empty query".into()));
            }
            Ok((0..limit)
                .map(|i| SimilarityHit { path: PathBuf::from(format!("{i}.md")), score: 1.0 })
                .collect())
        }
    }

    #[test]
    fn unknown_and_duplicate_vaults() {
        let registry = VaultRegistry::new();
        assert!(matches!(registry.get("x"), Err(RegistryError::UnknownVault(_))));

        let dir = TempDir::new().unwrap();
        registry.register("a", VaultIndexer::new(IndexerConfig::new(dir.path()))).unwrap();
        assert!(matches!(
            registry.register("a", VaultIndexer::new(IndexerConfig::new(dir.path()))),
            Err(RegistryError::DuplicateVault(_))
        ));
        assert_eq!(registry.ids(), vec!["a"]);
    }

    #[test]
    fn uninitialized_vault_is_not_available() {
        let dir = TempDir::new().unwrap();
        let registry = VaultRegistry::new();
        registry.register("a", VaultIndexer::new(IndexerConfig::new(dir.path()))).unwrap();

        assert!(matches!(
            registry.indexer("a"),
            Err(RegistryError::VaultNotAvailable { status: IndexStatus::Uninitialized, .. })
        ));
    }

    #[test]
    fn similarity_is_routed_per_vault() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "").unwrap();
        let registry = VaultRegistry::new();
        registry.register("a", VaultIndexer::new(IndexerConfig::new(dir.path()))).unwrap();
        registry.init();

        assert!(matches!(
            registry.similar("a", "q", 2),
            Err(RegistryError::NoSimilaritySearch(_))
        ));

        registry.set_similarity("a", Arc::new(FixedSearch)).unwrap();
        assert_eq!(registry.similar("a", "q", 2).unwrap().len(), 2);
        assert!(matches!(registry.similar("a", "", 2), Err(RegistryError::Similarity { .. })));
        assert!(matches!(
            registry.set_similarity("b", Arc::new(FixedSearch)),
            Err(RegistryError::UnknownVault(_))
        ));
    }
}
