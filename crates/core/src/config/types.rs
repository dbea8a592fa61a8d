use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::index::IndexerConfig;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    /// Vault used when none is named on the command line.
    pub default_vault: Option<String>,
    #[serde(default)]
    pub vaults: BTreeMap<String, VaultEntry>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct VaultEntry {
    pub root: String,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub watch: bool,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Folders to exclude from indexing (relative to the vault root, or
    /// absolute via `{{vault_root}}`).
    #[serde(default)]
    pub excluded_folders: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CacheConfig {
    /// Directory for cache databases; defaults to the platform cache dir.
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_use_cache() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Clone)]
pub struct ResolvedVault {
    pub id: String,
    pub root: PathBuf,
    pub use_cache: bool,
    pub watch: bool,
    pub debounce: Duration,
    /// Excluded folders, resolved to absolute paths.
    pub excluded_folders: Vec<PathBuf>,
}

impl ResolvedVault {
    /// Indexer settings for this vault, caching under `cache_dir`.
    pub fn indexer_config(&self, cache_dir: &Path) -> IndexerConfig {
        let config = IndexerConfig::new(&self.root)
            .with_watch(self.watch)
            .with_debounce(self.debounce)
            .with_excluded_folders(self.excluded_folders.clone());
        if self.use_cache { config.with_cache(cache_dir) } else { config }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The selected vault: the override, `default_vault`, or the first id.
    pub active_vault: String,
    /// All configured vaults, sorted by id.
    pub vaults: Vec<ResolvedVault>,
    pub cache_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl ResolvedConfig {
    pub fn vault(&self, id: &str) -> Option<&ResolvedVault> {
        self.vaults.iter().find(|v| v.id == id)
    }

    pub fn active(&self) -> Option<&ResolvedVault> {
        self.vault(&self.active_vault)
    }
}
