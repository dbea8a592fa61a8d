//! Note content extraction: frontmatter, title, tags, wiki-links.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::frontmatter::{self, Frontmatter, FrontmatterParseError};

/// Extracted information from a note file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    /// Frontmatter `title`, or the file name without extension.
    pub title: String,
    pub frontmatter: Frontmatter,
    /// Frontmatter tags followed by inline tags, without `#`, deduplicated.
    pub tags: Vec<String>,
    /// Inline hashtags as written (with `#`), deduplicated.
    pub inline_tags: Vec<String>,
    /// Raw wiki-link targets in document order.
    pub links: Vec<String>,
    /// The markdown body (everything after frontmatter).
    pub body: String,
}

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").unwrap());

static INLINE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[a-zA-Z0-9_-]+").unwrap());

/// Extract page information from raw file content.
///
/// Fails only when the frontmatter block is present but is not valid YAML.
pub fn extract_page(
    content: &str,
    file_path: &Path,
) -> Result<ExtractedPage, FrontmatterParseError> {
    let parsed = frontmatter::parse(content)?;

    let title = parsed.frontmatter.title().map(ToOwned::to_owned).unwrap_or_else(|| {
        file_path.file_stem().and_then(|s| s.to_str()).unwrap_or("Untitled").to_string()
    });

    let inline_tags = dedup(extract_inline_tags(&parsed.body));

    let tags = dedup(
        parsed
            .frontmatter
            .tags()
            .into_iter()
            .chain(inline_tags.iter().map(|t| t.trim_start_matches('#').to_string()))
            .collect(),
    );

    let links = extract_links(&parsed.body);

    Ok(ExtractedPage {
        title,
        frontmatter: parsed.frontmatter,
        tags,
        inline_tags,
        links,
        body: parsed.body,
    })
}

/// Every `[[target]]` in document order, duplicates included.
///
/// The captured text is returned raw, so `[[note|alias]]` yields `note|alias`.
pub fn extract_links(content: &str) -> Vec<String> {
    WIKILINK_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Every `#tag` in document order, with the leading `#` retained.
pub fn extract_inline_tags(content: &str) -> Vec<String> {
    INLINE_TAG_RE.find_iter(content).map(|m| m.as_str().to_string()).collect()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_wikilinks_in_order_with_duplicates() {
        let content = "See [[other-note]], [[another|with alias]] and [[other-note]].\n\
                       Also [[path/to/note]] works.";
        assert_eq!(
            extract_links(content),
            vec!["other-note", "another|with alias", "other-note", "path/to/note"]
        );
    }

    #[test]
    fn test_wikilink_with_section() {
        assert_eq!(extract_links("Link to [[note#section]] here."), vec!["note#section"]);
    }

    #[test]
    fn test_empty_wikilink_is_ignored() {
        assert!(extract_links("nothing [[]] here").is_empty());
    }

    #[test]
    fn test_extract_inline_tags_keep_hash() {
        let content = "Working on #rust and #cli-tools, again #rust.\n# Heading";
        assert_eq!(extract_inline_tags(content), vec!["#rust", "#cli-tools", "#rust"]);
    }

    #[test]
    fn test_extract_page_merges_tags() {
        let content = "---\ntitle: Merge\ntags: [project, rust]\n---\nBody #rust #idea\n";
        let page = extract_page(content, Path::new("merge.md")).unwrap();

        assert_eq!(page.title, "Merge");
        assert_eq!(page.tags, vec!["project", "rust", "idea"]);
        assert_eq!(page.inline_tags, vec!["#rust", "#idea"]);
        assert_eq!(page.body, "Body #rust #idea\n");
    }

    #[test]
    fn test_frontmatter_is_not_scanned_for_inline_tags() {
        let content = "---\ncolor: \"#ff0000\"\n---\nplain body\n";
        let page = extract_page(content, Path::new("color.md")).unwrap();
        assert!(page.inline_tags.is_empty());
        assert!(page.tags.is_empty());
    }

    #[test]
    fn test_extract_title_from_filename() {
        let page = extract_page("# Heading only", Path::new("dir/my-note.md")).unwrap();
        assert_eq!(page.title, "my-note");
    }

    #[test]
    fn test_malformed_frontmatter_fails() {
        let content = "---\ntags: [a, b\n---\nBody";
        assert!(extract_page(content, Path::new("bad.md")).is_err());
    }
}
