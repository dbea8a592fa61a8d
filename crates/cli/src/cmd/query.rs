//! Query command implementation.

use vaultdex_core::config::ResolvedConfig;
use vaultdex_core::index::PageMetadata;
use vaultdex_core::query::{FilterCollection, parse_query};

use super::output::print_pages;
use crate::QueryArgs;

pub fn run(rc: &ResolvedConfig, args: QueryArgs) {
    let pages = match args.filters.as_deref() {
        Some(json) => run_filters(rc, json, args.limit),
        None => run_query(rc, args.query.as_deref().unwrap_or_default(), args.limit),
    };

    print_pages(&pages, args.format.format());
}

fn run_query(rc: &ResolvedConfig, input: &str, limit: Option<usize>) -> Vec<PageMetadata> {
    let query = match parse_query(input) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("Error parsing query: {e}");
            std::process::exit(1);
        }
    };

    let indexer = super::open_index(rc);
    let mut selection = indexer.select(query);
    if let Some(n) = limit {
        selection = match selection.limit(n) {
            Ok(limited) => limited,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        };
    }
    selection.materialize().iter().map(|doc| doc.metadata.clone()).collect()
}

fn run_filters(rc: &ResolvedConfig, json: &str, limit: Option<usize>) -> Vec<PageMetadata> {
    let filters = match FilterCollection::from_json_str(json) {
        Ok(filters) => filters,
        Err(e) => {
            eprintln!("Error parsing filters: {e}");
            std::process::exit(1);
        }
    };

    let mut pages = super::open_index(rc).query_filters(&filters);
    if let Some(n) = limit {
        pages.truncate(n);
    }
    pages
}
