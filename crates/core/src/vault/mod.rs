//! Vault file discovery and content extraction.
//!
//! This module provides utilities for walking vault directories,
//! abstracting filesystem access, and extracting metadata from markdown files.

pub mod extractor;
pub mod fs;
pub mod walker;

pub use extractor::{ExtractedPage, extract_inline_tags, extract_links, extract_page};
pub use fs::{FileStat, FileSystem, FsError, LocalFileSystem};
pub use walker::{
    VaultWalker, VaultWalkerError, is_excluded_relative, is_markdown_file, normalize_exclusions,
};
