//! Filesystem access used by the indexer.
//!
//! The indexer never touches `std::fs` directly; it goes through the
//! [`FileSystem`] trait so tests and embedders can substitute their own
//! storage.

use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;

use super::walker::{VaultWalker, VaultWalkerError};

#[derive(Debug, Error)]
pub enum FsError {
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Walk(#[from] VaultWalkerError),
}

impl FsError {
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io { path: path.to_path_buf(), source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Walk(VaultWalkerError::MissingRoot(_)))
    }
}

/// Stat information for a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Last modification time in epoch milliseconds.
    pub mtime: i64,
    /// Size in bytes.
    pub size: u64,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Filesystem operations the indexer consumes.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    fn stat(&self, path: &Path) -> Result<FileStat, FsError>;

    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Names of the entries directly inside `path`.
    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// All markdown files below `root`, absolute, in a stable order.
    fn list_markdown(
        &self,
        root: &Path,
        excluded_folders: &[PathBuf],
    ) -> Result<Vec<PathBuf>, FsError>;

    /// Absolute, normalized form of `path`. Storage without symlinks can
    /// return the path unchanged.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        Ok(path.to_path_buf())
    }
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn stat(&self, path: &Path) -> Result<FileStat, FsError> {
        let metadata = std::fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX));

        Ok(FileStat {
            mtime,
            size: metadata.len(),
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
        })
    }

    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        std::fs::read_to_string(path).map_err(|e| FsError::from_io(path, e))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let entries = std::fs::read_dir(path).map_err(|e| FsError::from_io(path, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    fn list_markdown(
        &self,
        root: &Path,
        excluded_folders: &[PathBuf],
    ) -> Result<Vec<PathBuf>, FsError> {
        let walker = VaultWalker::with_exclusions(root, excluded_folders.to_vec())?;
        Ok(walker.walk()?)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        path.canonicalize().map_err(|e| FsError::from_io(path, e))
    }
}
