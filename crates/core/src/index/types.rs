//! Index data types for vault pages.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;
use crate::vault::{ExtractedPage, FileStat};

/// The indexed representation of one markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    /// Absolute filesystem path; the identity of the page.
    pub path: PathBuf,
    /// Path relative to the vault root, `/`-separated.
    pub relative_path: String,
    /// Folder relative to the vault root, `/`-separated; empty at the root.
    pub folder_path: String,
    /// File name without the `.md` extension.
    pub basename: String,
    pub title: String,
    pub frontmatter: Frontmatter,
    pub tags: Vec<String>,
    pub inline_tags: Vec<String>,
    pub links: Vec<String>,
    /// Last modification time, epoch milliseconds.
    pub mtime: i64,
    /// File size in bytes.
    pub size: u64,
}

impl PageMetadata {
    /// Build a record from extracted content and stat information.
    pub fn new(path: &Path, root: &Path, extracted: ExtractedPage, stat: FileStat) -> Self {
        let relative_path = relative_slash_path(path, root);
        let folder_path = match relative_path.rfind('/') {
            Some(idx) => relative_path[..idx].to_string(),
            None => String::new(),
        };
        let basename =
            path.file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string();

        Self {
            path: path.to_path_buf(),
            relative_path,
            folder_path,
            basename,
            title: extracted.title,
            frontmatter: extracted.frontmatter,
            tags: extracted.tags,
            inline_tags: extracted.inline_tags,
            links: extracted.links,
            mtime: stat.mtime,
            size: stat.size,
        }
    }

    /// Modification time as a UTC timestamp.
    pub fn modified(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.mtime).single().unwrap_or_default()
    }

    /// Whether stat information still matches this record.
    pub fn is_fresh(&self, stat: &FileStat) -> bool {
        self.mtime == stat.mtime && self.size == stat.size
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Operation-facing view of a page: metadata plus its body text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub path: PathBuf,
    /// Markdown body, frontmatter excluded.
    pub content: String,
    pub metadata: PageMetadata,
}

impl Document {
    pub fn new(metadata: PageMetadata, content: String) -> Self {
        Self { path: metadata.path.clone(), content, metadata }
    }

    /// File name without extension.
    pub fn name(&self) -> &str {
        &self.metadata.basename
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.metadata.modified()
    }
}

/// Lifecycle state of a vault indexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Error,
    /// Shut down; watchers stopped and the store dropped.
    Stopped,
}

impl IndexStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingError {
    pub path: PathBuf,
    pub message: String,
}

/// Statistics about the current index.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub total_documents: usize,
    /// Number of distinct tags.
    pub total_tags: usize,
    /// Number of outgoing wiki-links across all pages.
    pub total_links: usize,
    /// Outgoing links whose target does not resolve to a page.
    pub dangling_links: usize,
    pub indexing_errors: usize,
    /// Duration of the last full scan or cache load, in milliseconds.
    pub last_scan_ms: u64,
    pub status: IndexStatus,
}

/// Outcome summary of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Number of files discovered.
    pub files_found: usize,
    /// Number of files parsed and inserted.
    pub pages_indexed: usize,
    /// Number of cached records reused without re-parsing.
    pub pages_from_cache: usize,
    /// Number of files skipped due to errors.
    pub pages_skipped: usize,
    /// Whether the scan was abandoned by cancellation.
    pub cancelled: bool,
    pub duration_ms: u64,
}

/// Events published by an indexer to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEvent {
    StatusChanged { from: IndexStatus, to: IndexStatus },
    /// Progress during a scan. `current` is 1-based.
    ScanProgress { current: usize, total: usize, path: PathBuf },
    PageIndexed { path: PathBuf },
    PageRemoved { path: PathBuf },
    PageFailed { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extracted() -> ExtractedPage {
        ExtractedPage {
            title: "T".into(),
            frontmatter: Frontmatter::default(),
            tags: vec![],
            inline_tags: vec![],
            links: vec![],
            body: String::new(),
        }
    }

    fn stat() -> FileStat {
        FileStat { mtime: 1_700_000_000_000, size: 10, is_file: true, is_dir: false }
    }

    #[test]
    fn derives_relative_folder_and_basename() {
        let page = PageMetadata::new(
            Path::new("/vault/projects/rust/notes.md"),
            Path::new("/vault"),
            extracted(),
            stat(),
        );
        assert_eq!(page.relative_path, "projects/rust/notes.md");
        assert_eq!(page.folder_path, "projects/rust");
        assert_eq!(page.basename, "notes");
    }

    #[test]
    fn root_level_page_has_empty_folder() {
        let page =
            PageMetadata::new(Path::new("/vault/a.md"), Path::new("/vault"), extracted(), stat());
        assert_eq!(page.folder_path, "");
        assert_eq!(page.relative_path, "a.md");
    }

    #[test]
    fn freshness_compares_mtime_and_size() {
        let page =
            PageMetadata::new(Path::new("/vault/a.md"), Path::new("/vault"), extracted(), stat());
        assert!(page.is_fresh(&stat()));
        assert!(!page.is_fresh(&FileStat { size: 11, ..stat() }));
        assert!(!page.is_fresh(&FileStat { mtime: 1, ..stat() }));
    }

    #[test]
    fn modified_converts_millis() {
        let page =
            PageMetadata::new(Path::new("/vault/a.md"), Path::new("/vault"), extracted(), stat());
        assert_eq!(page.modified().timestamp_millis(), 1_700_000_000_000);
    }
}
