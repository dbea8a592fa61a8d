//! Markdown file discovery below a vault root.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Directory names never indexed, in addition to hidden entries.
const TOOL_DIRS: [&str; 4] = ["node_modules", "target", "__pycache__", "venv"];

#[derive(Debug, Error)]
pub enum VaultWalkerError {
    #[error("vault root does not exist: {0}")]
    MissingRoot(String),

    #[error("vault root is not a directory: {0}")]
    NotADirectory(String),

    #[error("cannot read vault root {root}: {source}")]
    Walk {
        root: String,
        #[source]
        source: walkdir::Error,
    },
}

/// Lists the markdown files of one vault, honoring folder exclusions.
#[derive(Debug)]
pub struct VaultWalker {
    root: PathBuf,
    /// Exclusions relative to `root`.
    excluded: Vec<PathBuf>,
}

impl VaultWalker {
    pub fn new(root: &Path) -> Result<Self, VaultWalkerError> {
        Self::with_exclusions(root, Vec::new())
    }

    /// `excluded_folders` may be relative to the root or absolute paths
    /// inside it.
    pub fn with_exclusions(
        root: &Path,
        excluded_folders: Vec<PathBuf>,
    ) -> Result<Self, VaultWalkerError> {
        let canonical = root
            .canonicalize()
            .map_err(|_| VaultWalkerError::MissingRoot(root.display().to_string()))?;
        if !canonical.is_dir() {
            return Err(VaultWalkerError::NotADirectory(canonical.display().to_string()));
        }

        let excluded = normalize_exclusions(&canonical, excluded_folders);
        Ok(Self { root: canonical, excluded })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths of every markdown file, ordered by relative path.
    /// Entries that cannot be read below the root are logged and skipped.
    pub fn walk(&self) -> Result<Vec<PathBuf>, VaultWalkerError> {
        let walk = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| self.keep(entry));

        let mut files = Vec::new();
        for entry in walk {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_markdown_file(entry.path()) => {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(source) if source.depth() == 0 => {
                    return Err(VaultWalkerError::Walk {
                        root: self.root.display().to_string(),
                        source,
                    });
                }
                Err(e) => tracing::warn!("Skipping unreadable vault entry: {e}"),
            }
        }

        // sort_by_file_name orders siblings, not full relative paths
        files.sort_by(|a, b| a.strip_prefix(&self.root).ok().cmp(&b.strip_prefix(&self.root).ok()));
        Ok(files)
    }

    fn keep(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        entry
            .path()
            .strip_prefix(&self.root)
            .is_ok_and(|relative| !is_excluded_relative(relative, &self.excluded))
    }
}

/// Rewrite absolute exclusions under `root` as relative paths.
pub fn normalize_exclusions(root: &Path, excluded: Vec<PathBuf>) -> Vec<PathBuf> {
    excluded
        .into_iter()
        .map(|folder| match folder.strip_prefix(root) {
            Ok(relative) if folder.is_absolute() => relative.to_path_buf(),
            _ => folder,
        })
        .collect()
}

/// True for hidden entries, tool directories, and anything inside an
/// excluded folder. `relative` is relative to the vault root.
pub fn is_excluded_relative(relative: &Path, excluded_folders: &[PathBuf]) -> bool {
    let skipped_component = relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name.starts_with('.') || TOOL_DIRS.contains(&name.as_ref())
    });

    skipped_component || excluded_folders.iter().any(|folder| relative.starts_with(folder))
}

pub fn is_markdown_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("md"))
}
