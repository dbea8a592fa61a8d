//! Stats command implementation.

use serde::Serialize;
use vaultdex_core::config::ResolvedConfig;
use vaultdex_core::index::{IndexStats, IndexingError};

use super::output::print_json;
use crate::{FormatArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct StatsReport<'a> {
    vault: &'a str,
    #[serde(flatten)]
    stats: IndexStats,
    errors: Vec<IndexingError>,
}

pub fn run(rc: &ResolvedConfig, args: FormatArgs) {
    let indexer = super::open_index(rc);
    let stats = indexer.get_stats();
    let errors = indexer.get_indexing_errors();

    match args.format() {
        OutputFormat::Json => {
            print_json(&StatsReport { vault: &rc.active_vault, stats, errors });
        }
        OutputFormat::Quiet => {
            println!("{}", stats.total_documents);
        }
        OutputFormat::Table => {
            println!("Vault: {} ({})", rc.active_vault, indexer.root().display());
            println!("  Status:          {}", stats.status);
            println!("  Documents:       {}", stats.total_documents);
            println!("  Tags:            {}", stats.total_tags);
            println!("  Links:           {}", stats.total_links);
            println!("  Dangling links:  {}", stats.dangling_links);
            println!("  Indexing errors: {}", stats.indexing_errors);
            println!("  Last scan:       {}ms", stats.last_scan_ms);

            if !errors.is_empty() {
                println!();
                println!("Errors:");
                for error in &errors {
                    println!("  {}: {}", error.path.display(), error.message);
                }
            }
        }
    }
}
