pub mod doctor;
pub mod links;
pub mod list;
pub mod output;
pub mod query;
pub mod reindex;
pub mod stats;
pub mod tags;
pub mod watch;

use std::path::{Path, PathBuf};

use vaultdex_core::config::{ResolvedConfig, ResolvedVault};
use vaultdex_core::index::{IndexerConfig, VaultIndexer};

/// The active vault of a loaded config.
pub fn active_vault(rc: &ResolvedConfig) -> &ResolvedVault {
    match rc.active() {
        Some(vault) => vault,
        None => {
            eprintln!("Error: vault '{}' is not configured", rc.active_vault);
            std::process::exit(1);
        }
    }
}

/// Indexer settings for the active vault. One-shot commands never watch.
pub fn indexer_config(rc: &ResolvedConfig) -> IndexerConfig {
    active_vault(rc).indexer_config(&rc.cache_dir).with_watch(false)
}

/// Build the index of the active vault, reusing its cache when enabled.
pub fn open_index(rc: &ResolvedConfig) -> VaultIndexer {
    let indexer = VaultIndexer::new(indexer_config(rc));
    if let Err(e) = indexer.initialize() {
        eprintln!("Error indexing vault '{}': {e}", rc.active_vault);
        std::process::exit(1);
    }
    indexer
}

/// Resolve a page argument: absolute, relative to the vault root, or with a
/// missing `.md` extension.
pub fn resolve_page(indexer: &VaultIndexer, note: &str) -> Option<PathBuf> {
    let note = note.strip_prefix("./").unwrap_or(note);
    let root = indexer.root();
    let candidate =
        if Path::new(note).is_absolute() { PathBuf::from(note) } else { root.join(note) };

    if indexer.get(&candidate).is_some() {
        return Some(candidate);
    }
    let mut with_ext = candidate.into_os_string();
    with_ext.push(".md");
    let with_ext = PathBuf::from(with_ext);
    if indexer.get(&with_ext).is_some() {
        return Some(with_ext);
    }
    indexer.resolve_link(note)
}
