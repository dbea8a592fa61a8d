//! List command implementation.

use vaultdex_core::config::ResolvedConfig;

use super::output::print_pages;
use crate::ListArgs;

pub fn run(rc: &ResolvedConfig, args: ListArgs) {
    let indexer = super::open_index(rc);

    let mut pages = match (&args.tag, &args.folder) {
        (Some(tag), _) => indexer.documents_with_tag(tag),
        (None, Some(folder)) => indexer.documents_in_folder(folder.trim_matches('/')),
        (None, None) => indexer.get_all_documents(),
    };
    if let (Some(_), Some(folder)) = (&args.tag, &args.folder) {
        let folder = folder.trim_matches('/');
        pages.retain(|p| {
            folder.is_empty()
                || p.folder_path == folder
                || p.folder_path.starts_with(&format!("{folder}/"))
        });
    }

    pages.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    if let Some(limit) = args.limit {
        pages.truncate(limit);
    }

    print_pages(&pages, args.format.format());
}
