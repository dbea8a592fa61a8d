//! Tags command implementation.

use serde::Serialize;
use vaultdex_core::config::ResolvedConfig;

use super::output::print_json;
use crate::{FormatArgs, OutputFormat};

#[derive(Debug, Serialize)]
struct TagOutput<'a> {
    tag: &'a str,
    pages: usize,
}

pub fn run(rc: &ResolvedConfig, args: FormatArgs) {
    let indexer = super::open_index(rc);
    let counts = indexer.tag_counts();

    match args.format() {
        OutputFormat::Json => {
            let out: Vec<TagOutput> =
                counts.iter().map(|(tag, pages)| TagOutput { tag, pages: *pages }).collect();
            print_json(&out);
        }
        OutputFormat::Quiet => {
            for (tag, _) in &counts {
                println!("{tag}");
            }
        }
        OutputFormat::Table => {
            if counts.is_empty() {
                println!("(no tags found)");
                return;
            }
            let width = counts.iter().map(|(t, _)| t.len()).max().unwrap_or(3).clamp(3, 40);
            println!("{:<width$}  PAGES", "TAG");
            println!("{:-<width$}  {:-<5}", "", "");
            for (tag, pages) in &counts {
                println!("{tag:<width$}  {pages}");
            }
        }
    }
}
