//! Frontmatter parsing for markdown documents.
//!
//! This module provides functionality to:
//! - Split a leading `---` YAML block from the markdown body
//! - Convert the YAML mapping into JSON-like values used by the index and queries

pub mod parser;
pub mod types;

pub use parser::{FrontmatterParseError, parse};
pub use types::{Frontmatter, ParsedDocument};
