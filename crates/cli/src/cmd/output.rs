//! Shared output formatting for page and link commands.

use serde::Serialize;
use vaultdex_core::index::PageMetadata;

use crate::OutputFormat;

/// Formatted page for JSON output.
#[derive(Debug, Serialize)]
pub struct PageOutput {
    pub path: String,
    pub title: String,
    pub tags: Vec<String>,
    pub modified: String,
    pub size: u64,
}

impl From<&PageMetadata> for PageOutput {
    fn from(page: &PageMetadata) -> Self {
        Self {
            path: page.relative_path.clone(),
            title: page.title.clone(),
            tags: page.tags.clone(),
            modified: page.modified().format("%Y-%m-%d %H:%M").to_string(),
            size: page.size,
        }
    }
}

/// Formatted link for JSON output.
#[derive(Debug, Serialize)]
pub struct LinkOutput {
    pub source: String,
    /// Raw link target as written in the source page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Vault-relative path the target resolves to, if any.
    pub resolved: Option<String>,
}

pub fn print_pages(pages: &[PageMetadata], format: OutputFormat) {
    match format {
        OutputFormat::Table => print_pages_table(pages),
        OutputFormat::Json => print_json(&pages.iter().map(PageOutput::from).collect::<Vec<_>>()),
        OutputFormat::Quiet => {
            for page in pages {
                println!("{}", page.relative_path);
            }
        }
    }
}

/// Print pages as a table.
fn print_pages_table(pages: &[PageMetadata]) {
    if pages.is_empty() {
        println!("(no pages found)");
        return;
    }

    let path_width =
        pages.iter().map(|p| p.relative_path.len()).max().unwrap_or(4).clamp(4, 50);
    let title_width = pages.iter().map(|p| p.title.len()).max().unwrap_or(5).clamp(5, 40);

    println!("{:<path_width$}  {:<title_width$}  MODIFIED", "PATH", "TITLE");
    println!("{:-<path_width$}  {:-<title_width$}  {:-<16}", "", "", "");

    for page in pages {
        println!(
            "{:<path_width$}  {:<title_width$}  {}",
            truncate(&page.relative_path, path_width),
            truncate(&page.title, title_width),
            page.modified().format("%Y-%m-%d %H:%M"),
        );
    }

    println!();
    println!("Total: {} pages", pages.len());
}

pub fn print_links(links: &[LinkOutput], label: &str, format: OutputFormat, backlinks: bool) {
    match format {
        OutputFormat::Table => {
            if links.is_empty() {
                println!("(no {label})");
                return;
            }
            for link in links {
                if backlinks {
                    println!("  {}", link.source);
                } else {
                    let target = link.target.as_deref().unwrap_or_default();
                    match &link.resolved {
                        Some(resolved) => println!("  {target} -> {resolved}"),
                        None => println!("  {target} (unresolved)"),
                    }
                }
            }
            println!();
            println!("Total: {} {label}", links.len());
        }
        OutputFormat::Json => print_json(links),
        OutputFormat::Quiet => {
            for link in links {
                if backlinks {
                    println!("{}", link.source);
                } else if let Some(resolved) = &link.resolved {
                    println!("{resolved}");
                }
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing to JSON: {e}");
            std::process::exit(1);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
