//! Derived lookup structures built from the page store.
//!
//! Everything here can be reconstructed from the store alone with
//! [`VaultIndex::rebuild`]. Incremental updates go through [`VaultIndex::insert`]
//! and [`VaultIndex::remove`], which touch only the entries of the page being
//! changed plus the backlink edges of pages whose links resolve through it.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::path::{Path, PathBuf};

use super::store::PageStore;
use super::types::PageMetadata;

/// Lowercased lookup key → (exact relative path → absolute path).
///
/// The inner `BTreeMap` makes ties resolve to the lexicographically first
/// relative path, independent of indexing order.
type NameTable = HashMap<String, BTreeMap<String, PathBuf>>;

#[derive(Debug, Clone, Default)]
pub struct VaultIndex {
    by_tag: HashMap<String, Vec<PathBuf>>,
    by_path: HashMap<String, Vec<PathBuf>>,
    links: HashMap<PathBuf, Vec<String>>,
    backlinks: HashMap<PathBuf, Vec<PathBuf>>,

    /// Source page → pages its links resolve to.
    resolved: HashMap<PathBuf, Vec<PathBuf>>,
    /// Normalized link target → pages linking with that target.
    link_sources: HashMap<String, HashSet<PathBuf>>,
    stems: NameTable,
    basenames: NameTable,
}

/// Order-independent view of a [`VaultIndex`], for comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSnapshot {
    pub by_tag: BTreeMap<String, BTreeSet<PathBuf>>,
    pub by_path: BTreeMap<String, BTreeSet<PathBuf>>,
    pub links: BTreeMap<PathBuf, Vec<String>>,
    pub backlinks: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
}

impl VaultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build all structures from scratch.
    pub fn rebuild(store: &PageStore) -> Self {
        let mut index = Self::new();
        for page in store.iter() {
            index.insert(page);
        }
        index
    }

    /// Add index entries for a page.
    ///
    /// Any previous version of the page must have been removed first.
    pub fn insert(&mut self, page: &PageMetadata) {
        let path = &page.path;

        for tag in &page.tags {
            push_unique(self.by_tag.entry(tag.clone()).or_default(), path);
        }
        for prefix in folder_prefixes(&page.folder_path) {
            push_unique(self.by_path.entry(prefix).or_default(), path);
        }
        self.links.insert(path.clone(), page.links.clone());

        for key in page.links.iter().filter_map(|l| normalize_link_target(l)) {
            self.link_sources.entry(key).or_default().insert(path.clone());
        }

        let (stem, basename) = name_keys(page);
        table_insert(&mut self.stems, &stem, page);
        table_insert(&mut self.basenames, &basename, page);

        self.refresh_resolution(path);

        // Pages whose links may now resolve to this page instead of nothing
        // or a different page.
        for source in self.sources_for(&[stem, basename]) {
            if source != *path {
                self.refresh_resolution(&source);
            }
        }
    }

    /// Remove every index entry for a page, including backlink edges that
    /// point at it from other pages.
    ///
    /// Other pages' forward `links` are untouched.
    pub fn remove(&mut self, page: &PageMetadata) {
        let path = &page.path;

        for tag in &page.tags {
            remove_from(&mut self.by_tag, tag, path);
        }
        for prefix in folder_prefixes(&page.folder_path) {
            remove_from(&mut self.by_path, &prefix, path);
        }
        self.links.remove(path);

        if let Some(targets) = self.resolved.remove(path) {
            for target in targets {
                remove_from(&mut self.backlinks, &target, path);
            }
        }

        for key in page.links.iter().filter_map(|l| normalize_link_target(l)) {
            if let Some(sources) = self.link_sources.get_mut(&key) {
                sources.remove(path);
                if sources.is_empty() {
                    self.link_sources.remove(&key);
                }
            }
        }

        let (stem, basename) = name_keys(page);
        table_remove(&mut self.stems, &stem, page);
        table_remove(&mut self.basenames, &basename, page);

        let mut affected: HashSet<PathBuf> =
            self.backlinks.remove(path).unwrap_or_default().into_iter().collect();
        affected.extend(self.sources_for(&[stem, basename]));

        for source in affected {
            if source != *path {
                self.refresh_resolution(&source);
            }
        }
    }

    /// Resolve a raw wiki-link target to a page path.
    ///
    /// Aliases (`|alias`) and sections (`#section`) are ignored. A target
    /// matches a page's relative path without extension first, then, if it
    /// has no `/`, a page basename. Matching is case-insensitive.
    pub fn resolve_link(&self, raw: &str) -> Option<&Path> {
        let key = normalize_link_target(raw)?;
        self.resolve_key(&key).map(PathBuf::as_path)
    }

    /// Paths carrying a tag. A leading `#` is ignored.
    pub fn paths_with_tag(&self, tag: &str) -> &[PathBuf] {
        self.by_tag.get(tag.trim_start_matches('#')).map_or(&[], Vec::as_slice)
    }

    /// Paths whose folder is `prefix` or nested below it. `""` lists all pages.
    pub fn paths_in_folder(&self, prefix: &str) -> &[PathBuf] {
        self.by_path.get(prefix.trim_matches('/')).map_or(&[], Vec::as_slice)
    }

    pub fn outgoing_links(&self, path: &Path) -> &[String] {
        self.links.get(path).map_or(&[], Vec::as_slice)
    }

    pub fn backlinks(&self, path: &Path) -> &[PathBuf] {
        self.backlinks.get(path).map_or(&[], Vec::as_slice)
    }

    /// All tags with the number of pages carrying them, sorted by tag.
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<_> =
            self.by_tag.iter().map(|(tag, paths)| (tag.clone(), paths.len())).collect();
        counts.sort();
        counts
    }

    pub fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Outgoing links that do not resolve to any page.
    pub fn dangling_link_count(&self) -> usize {
        self.links
            .values()
            .flatten()
            .filter(|raw| self.resolve_link(raw).is_none())
            .count()
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        fn sets(map: &HashMap<String, Vec<PathBuf>>) -> BTreeMap<String, BTreeSet<PathBuf>> {
            map.iter().map(|(k, v)| (k.clone(), v.iter().cloned().collect())).collect()
        }

        IndexSnapshot {
            by_tag: sets(&self.by_tag),
            by_path: sets(&self.by_path),
            links: self.links.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            backlinks: self
                .backlinks
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect(),
        }
    }

    fn resolve_key(&self, key: &str) -> Option<&PathBuf> {
        if let Some(path) = self.stems.get(key).and_then(|m| m.values().next()) {
            return Some(path);
        }
        if key.contains('/') {
            return None;
        }
        self.basenames.get(key).and_then(|m| m.values().next())
    }

    fn sources_for(&self, keys: &[String]) -> HashSet<PathBuf> {
        keys.iter()
            .filter_map(|k| self.link_sources.get(k))
            .flatten()
            .cloned()
            .collect()
    }

    /// Recompute the backlink edges contributed by one source page.
    fn refresh_resolution(&mut self, source: &Path) {
        if let Some(previous) = self.resolved.remove(source) {
            for target in previous {
                remove_from(&mut self.backlinks, &target, source);
            }
        }

        let Some(raw_links) = self.links.get(source) else {
            return;
        };

        let mut targets: Vec<PathBuf> = Vec::new();
        for raw in raw_links {
            if let Some(target) = self.resolve_link(raw)
                && !targets.iter().any(|t| t == target)
            {
                targets.push(target.to_path_buf());
            }
        }

        for target in &targets {
            push_unique(self.backlinks.entry(target.clone()).or_default(), source);
        }
        if !targets.is_empty() {
            self.resolved.insert(source.to_path_buf(), targets);
        }
    }
}

/// Normalize a raw wiki-link target into a lookup key.
///
/// Returns `None` for targets that cannot name a page, such as `[[#heading]]`.
pub fn normalize_link_target(raw: &str) -> Option<String> {
    let target = raw.split('|').next().unwrap_or(raw);
    let target = target.split('#').next().unwrap_or(target);
    let target = target.trim().trim_start_matches("./").trim_start_matches('/');

    let lower = target.to_lowercase();
    let key = lower.strip_suffix(".md").unwrap_or(&lower).trim_end_matches('/');

    if key.is_empty() { None } else { Some(key.to_string()) }
}

/// `""`, then each ancestor folder down to `folder` itself.
fn folder_prefixes(folder: &str) -> Vec<String> {
    let mut prefixes = vec![String::new()];
    if folder.is_empty() {
        return prefixes;
    }

    let mut current = String::new();
    for part in folder.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        prefixes.push(current.clone());
    }
    prefixes
}

fn name_keys(page: &PageMetadata) -> (String, String) {
    let lower = page.relative_path.to_lowercase();
    let stem = lower.strip_suffix(".md").unwrap_or(&lower).to_string();
    (stem, page.basename.to_lowercase())
}

fn table_insert(table: &mut NameTable, key: &str, page: &PageMetadata) {
    table
        .entry(key.to_string())
        .or_default()
        .insert(page.relative_path.clone(), page.path.clone());
}

fn table_remove(table: &mut NameTable, key: &str, page: &PageMetadata) {
    if let Some(entries) = table.get_mut(key) {
        entries.remove(&page.relative_path);
        if entries.is_empty() {
            table.remove(key);
        }
    }
}

fn push_unique(list: &mut Vec<PathBuf>, path: &Path) {
    if !list.iter().any(|p| p == path) {
        list.push(path.to_path_buf());
    }
}

/// Remove `path` from the list under `key`, dropping the key once empty.
fn remove_from<K, Q>(map: &mut HashMap<K, Vec<PathBuf>>, key: &Q, path: &Path)
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    if let Some(list) = map.get_mut(key) {
        list.retain(|p| p != path);
        if list.is_empty() {
            map.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Frontmatter;

    fn page(relative: &str, tags: &[&str], links: &[&str]) -> PageMetadata {
        let folder_path = relative.rsplit_once('/').map(|(f, _)| f.to_string()).unwrap_or_default();
        let basename = relative
            .rsplit('/')
            .next()
            .unwrap()
            .trim_end_matches(".md")
            .to_string();
        PageMetadata {
            path: PathBuf::from(format!("/vault/{relative}")),
            relative_path: relative.to_string(),
            folder_path,
            title: basename.clone(),
            basename,
            frontmatter: Frontmatter::default(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            inline_tags: vec![],
            links: links.iter().map(|l| l.to_string()).collect(),
            mtime: 0,
            size: 0,
        }
    }

    fn p(relative: &str) -> PathBuf {
        PathBuf::from(format!("/vault/{relative}"))
    }

    fn store(pages: &[PageMetadata]) -> PageStore {
        let mut store = PageStore::new();
        for page in pages {
            store.insert(page.clone());
        }
        store
    }

    #[test]
    fn normalizes_link_targets() {
        assert_eq!(normalize_link_target("Note"), Some("note".into()));
        assert_eq!(normalize_link_target("Note|Alias"), Some("note".into()));
        assert_eq!(normalize_link_target("dir/Note.md#Part"), Some("dir/note".into()));
        assert_eq!(normalize_link_target("./dir/note"), Some("dir/note".into()));
        assert_eq!(normalize_link_target("#heading"), None);
        assert_eq!(normalize_link_target("  "), None);
    }

    #[test]
    fn folder_prefixes_include_root_and_ancestors() {
        assert_eq!(folder_prefixes(""), vec![""]);
        assert_eq!(folder_prefixes("a/b"), vec!["", "a", "a/b"]);
    }

    #[test]
    fn tag_and_folder_lookups() {
        let index = VaultIndex::rebuild(&store(&[
            page("a.md", &["x"], &[]),
            page("posts/b.md", &["x", "y"], &[]),
            page("posts/sub/c.md", &[], &[]),
        ]));

        assert_eq!(index.paths_with_tag("x"), &[p("a.md"), p("posts/b.md")]);
        assert_eq!(index.paths_with_tag("#y"), &[p("posts/b.md")]);
        assert!(index.paths_with_tag("z").is_empty());

        assert_eq!(index.paths_in_folder("").len(), 3);
        assert_eq!(index.paths_in_folder("posts"), &[p("posts/b.md"), p("posts/sub/c.md")]);
        assert_eq!(index.paths_in_folder("/posts/sub/"), &[p("posts/sub/c.md")]);
    }

    #[test]
    fn backlinks_resolve_by_stem_then_basename() {
        let index = VaultIndex::rebuild(&store(&[
            page("a.md", &[], &["B", "notes/c|alias", "missing"]),
            page("b.md", &[], &[]),
            page("notes/c.md", &[], &["a#top"]),
        ]));

        assert_eq!(index.backlinks(&p("b.md")), &[p("a.md")]);
        assert_eq!(index.backlinks(&p("notes/c.md")), &[p("a.md")]);
        assert_eq!(index.backlinks(&p("a.md")), &[p("notes/c.md")]);
        assert_eq!(index.outgoing_links(&p("a.md")).len(), 3);
        assert_eq!(index.dangling_link_count(), 1);
    }

    #[test]
    fn ambiguous_basename_resolves_to_first_relative_path() {
        let index = VaultIndex::rebuild(&store(&[
            page("z/dup.md", &[], &[]),
            page("a/dup.md", &[], &[]),
            page("src.md", &[], &["dup"]),
        ]));
        assert_eq!(index.resolve_link("dup"), Some(p("a/dup.md").as_path()));
    }

    #[test]
    fn adding_target_resolves_dangling_links() {
        let a = page("a.md", &[], &["b"]);
        let b = page("b.md", &[], &[]);

        let mut index = VaultIndex::new();
        index.insert(&a);
        assert!(index.backlinks(&b.path).is_empty());

        index.insert(&b);
        assert_eq!(index.backlinks(&b.path), &[a.path.clone()]);
    }

    #[test]
    fn removal_purges_backlinks_but_keeps_forward_links() {
        let a = page("a.md", &[], &["b"]);
        let b = page("b.md", &["t"], &[]);
        let mut index = VaultIndex::rebuild(&store(&[a.clone(), b.clone()]));

        index.remove(&b);

        assert!(index.backlinks(&b.path).is_empty());
        assert_eq!(index.outgoing_links(&a.path), &["b".to_string()]);
        assert!(index.paths_with_tag("t").is_empty());
        assert_eq!(index.dangling_link_count(), 1);
    }

    #[test]
    fn removal_falls_back_to_remaining_duplicate() {
        let first = page("a/dup.md", &[], &[]);
        let second = page("b/dup.md", &[], &[]);
        let src = page("src.md", &[], &["dup"]);
        let mut index = VaultIndex::rebuild(&store(&[first.clone(), second.clone(), src.clone()]));

        assert_eq!(index.backlinks(&first.path), &[src.path.clone()]);
        index.remove(&first);
        assert_eq!(index.backlinks(&second.path), &[src.path.clone()]);
    }

    #[test]
    fn incremental_matches_rebuild() {
        let a = page("a.md", &["x"], &["b", "c"]);
        let b = page("dir/b.md", &["y"], &["a"]);
        let c = page("c.md", &["x"], &["dir/b"]);
        let b2 = page("dir/b.md", &["z"], &["c"]);

        let mut index = VaultIndex::new();
        index.insert(&a);
        index.insert(&b);
        index.insert(&c);
        index.remove(&b);
        index.insert(&b2);
        index.remove(&a);

        let expected = VaultIndex::rebuild(&store(&[c, b2]));
        assert_eq!(index.snapshot(), expected.snapshot());
    }

    #[test]
    fn self_links_are_backlinks() {
        let a = page("a.md", &[], &["a", "a"]);
        let index = VaultIndex::rebuild(&store(&[a.clone()]));
        assert_eq!(index.backlinks(&a.path), &[a.path.clone()]);
    }
}
