//! In-memory page store keyed by absolute path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::PageMetadata;

/// Mapping of absolute path to page record, iterated in insertion order.
///
/// Replacing an existing path keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct PageStore {
    pages: HashMap<PathBuf, PageMetadata>,
    order: Vec<PathBuf>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a page. Returns the previous record for the path.
    pub fn insert(&mut self, page: PageMetadata) -> Option<PageMetadata> {
        let path = page.path.clone();
        let previous = self.pages.insert(path.clone(), page);
        if previous.is_none() {
            self.order.push(path);
        }
        previous
    }

    pub fn remove(&mut self, path: &Path) -> Option<PageMetadata> {
        let removed = self.pages.remove(path)?;
        self.order.retain(|p| p != path);
        Some(removed)
    }

    pub fn get(&self, path: &Path) -> Option<&PageMetadata> {
        self.pages.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.pages.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Pages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PageMetadata> {
        self.order.iter().filter_map(|p| self.pages.get(p))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    /// Clone all pages in insertion order.
    pub fn to_vec(&self) -> Vec<PageMetadata> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.order.clear();
    }
}
