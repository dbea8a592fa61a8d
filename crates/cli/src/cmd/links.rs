//! Links command implementation.

use std::path::Path;

use serde::Serialize;
use vaultdex_core::config::ResolvedConfig;
use vaultdex_core::index::VaultIndexer;

use super::output::{LinkOutput, print_json, print_links};
use crate::{LinksArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct LinksReport<'a> {
    page: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    backlinks: Option<Vec<LinkOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outgoing: Option<Vec<LinkOutput>>,
}

pub fn run(rc: &ResolvedConfig, args: LinksArgs) {
    let indexer = super::open_index(rc);

    let Some(path) = super::resolve_page(&indexer, &args.note) else {
        eprintln!("Page not found in vault: {}", args.note);
        eprintln!("Hint: Check the path relative to the vault root.");
        std::process::exit(1);
    };
    let page = relative(&indexer, &path);

    // Both shown by default
    let show_backlinks = args.backlinks || !args.outlinks;
    let show_outlinks = args.outlinks || !args.backlinks;

    let backlinks = show_backlinks.then(|| {
        indexer
            .backlinks(&path)
            .iter()
            .map(|source| LinkOutput {
                source: relative(&indexer, source),
                target: None,
                resolved: Some(page.clone()),
            })
            .collect::<Vec<_>>()
    });
    let outgoing = show_outlinks.then(|| {
        indexer
            .outgoing_links(&path)
            .into_iter()
            .map(|target| LinkOutput {
                source: page.clone(),
                resolved: indexer.resolve_link(&target).map(|p| relative(&indexer, &p)),
                target: Some(target),
            })
            .collect::<Vec<_>>()
    });

    let format = args.format.format();
    if let OutputFormat::Json = format {
        print_json(&LinksReport { page: &page, backlinks, outgoing });
        return;
    }

    let both = show_backlinks && show_outlinks;
    if let Some(links) = &backlinks {
        if both && matches!(format, OutputFormat::Table) {
            println!("=== Backlinks (pages linking to {page}) ===");
            println!();
        }
        print_links(links, "backlinks", format, true);
    }
    if let Some(links) = &outgoing {
        if both && matches!(format, OutputFormat::Table) {
            println!();
            println!("=== Outgoing links (pages {page} links to) ===");
            println!();
        }
        print_links(links, "outgoing links", format, false);
    }
}

fn relative(indexer: &VaultIndexer, path: &Path) -> String {
    indexer
        .get(path)
        .map(|p| p.relative_path)
        .unwrap_or_else(|| path.display().to_string())
}
