use std::path::Path;

use vaultdex_core::config::{ConfigLoader, default_config_path};
use vaultdex_core::index::{IndexStatus, VaultIndexer};
use vaultdex_core::registry::VaultRegistry;

pub fn run(config: Option<&Path>, vault: Option<&str>) {
    let rc = match ConfigLoader::load(config, vault) {
        Ok(rc) => rc,
        Err(e) => {
            println!("FAIL vdx doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    };
    crate::logging::init(&rc);

    let path = config.map_or_else(default_config_path, Path::to_path_buf);
    println!("path: {}", path.display());
    println!("default vault: {}", rc.active_vault);
    println!("cache_dir: {}", rc.cache_dir.display());

    // Doctor only checks that each vault indexes; it never watches.
    let registry = VaultRegistry::new();
    for entry in &rc.vaults {
        let config = entry.indexer_config(&rc.cache_dir).with_watch(false);
        let indexer = VaultIndexer::new(config);
        if let Err(e) = registry.register(&entry.id, indexer) {
            println!("{e}");
        }
    }
    registry.init();

    let mut failed = false;
    for (id, status) in registry.statuses() {
        let Ok(vault) = registry.get(&id) else { continue };
        let root = vault.indexer().config().root.display().to_string();
        match status {
            IndexStatus::Ready => {
                let stats = vault.indexer().get_stats();
                println!(
                    "vault {id}: ready ({} documents, {} errors) at {root}",
                    stats.total_documents, stats.indexing_errors
                );
            }
            other => {
                failed = true;
                let reason = vault.error().unwrap_or_default();
                println!("vault {id}: {other} at {root}: {reason}");
            }
        }
    }
    registry.shutdown();

    if failed {
        println!("FAIL vdx doctor");
        std::process::exit(1);
    }
    println!("OK   vdx doctor");
}
