//! Watch command implementation.

use std::path::Path;
use std::time::{Duration, Instant};

use vaultdex_core::config::ResolvedConfig;
use vaultdex_core::index::{IndexEvent, VaultIndexer};

use crate::WatchArgs;

pub fn run(rc: &ResolvedConfig, args: WatchArgs) {
    let mut config = super::indexer_config(rc).with_watch(true);
    if let Some(ms) = args.debounce_ms {
        config = config.with_debounce(Duration::from_millis(ms));
    }
    let indexer = VaultIndexer::new(config);

    match indexer.initialize() {
        Ok(_) => {
            println!("Watching vault: {} ({} pages)", indexer.root().display(), indexer.len());
        }
        Err(e) => {
            eprintln!("Error indexing vault '{}': {e}", rc.active_vault);
            std::process::exit(1);
        }
    }
    if !indexer.is_watching() {
        eprintln!("Error: file watching could not be started for {}", indexer.root().display());
        std::process::exit(1);
    }

    let events = indexer.subscribe();
    let deadline = args.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let root = indexer.root();
    let show = |p: &Path| p.strip_prefix(&root).unwrap_or(p).display().to_string();

    loop {
        let wait = match deadline {
            Some(at) => match at.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };

        match events.recv_timeout(wait) {
            Ok(IndexEvent::PageIndexed { path }) => println!("indexed  {}", show(&path)),
            Ok(IndexEvent::PageRemoved { path }) => println!("removed  {}", show(&path)),
            Ok(IndexEvent::PageFailed { path, message }) => {
                println!("failed   {}: {message}", show(&path));
            }
            Ok(IndexEvent::StatusChanged { from, to }) => {
                tracing::debug!("Status changed from {from} to {to}");
            }
            Ok(IndexEvent::ScanProgress { .. }) => {}
            Err(e) if e.is_timeout() => {}
            Err(_) => break,
        }
    }

    indexer.shutdown();
}
