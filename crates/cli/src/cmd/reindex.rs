//! Reindex command implementation.

use std::io::Write;
use std::thread;

use vaultdex_core::config::ResolvedConfig;
use vaultdex_core::index::{IndexEvent, PageCache, VaultIndexer};

use crate::ReindexArgs;

pub fn run(rc: &ResolvedConfig, args: ReindexArgs) {
    let config = super::indexer_config(rc);
    let cache = config.cache_dir.clone();
    let indexer = VaultIndexer::new(config);

    println!("Indexing vault: {}", indexer.config().root.display());

    let events = indexer.subscribe();
    let verbose = args.verbose;
    let progress = thread::spawn(move || {
        for event in events {
            if let IndexEvent::ScanProgress { current, total, path } = event {
                if verbose {
                    println!("[{current}/{total}] {}", path.display());
                } else if current % 50 == 0 || current == total {
                    print!("\rIndexing... {current}/{total}");
                    std::io::stdout().flush().ok();
                }
            }
        }
    });

    let result = indexer.initialize();
    let root = indexer.root();
    // Dropping the indexer's senders ends the progress thread.
    indexer.shutdown();
    progress.join().ok();

    match result {
        Ok(report) => {
            if !verbose && report.files_found > 0 {
                println!();
            }
            println!();
            println!("Indexing complete:");
            println!("  Files found:    {}", report.files_found);
            println!("  Pages indexed:  {}", report.pages_indexed);
            println!("  From cache:     {}", report.pages_from_cache);
            if report.pages_skipped > 0 {
                println!("  Pages skipped:  {}", report.pages_skipped);
            }
            println!("  Duration:       {}ms", report.duration_ms);
            if let Some(dir) = cache {
                println!();
                println!("Cache stored at: {}", PageCache::path_for(&dir, &root).display());
            }
        }
        Err(e) => {
            eprintln!("\nError during indexing: {e}");
            std::process::exit(1);
        }
    }
}
