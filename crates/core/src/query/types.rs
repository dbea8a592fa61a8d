//! Structured query model.
//!
//! Operators are closed enums so every operand shape is handled exhaustively
//! by the matcher.

use serde_json::Value;

use super::matcher::normalize_tag_op;
use super::pattern::{GlobPattern, RegexPattern};

/// A namespaced query. A page matches when it satisfies every predicate in
/// every namespace; an empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    pub filesystem: Vec<FilesystemPredicate>,
    pub frontmatter: Vec<FrontmatterPredicate>,
    pub content: Vec<ContentPredicate>,
    /// Predicates over the page's inline hashtags.
    pub inline: Vec<ValueOp>,
}

impl StructuredQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.filesystem.is_empty()
            && self.frontmatter.is_empty()
            && self.content.is_empty()
            && self.inline.is_empty()
    }

    /// Whether evaluation needs the page body.
    pub fn needs_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn with_path(mut self, glob: &str) -> Self {
        self.filesystem.push(FilesystemPredicate::Path(PathMatch::Glob(GlobPattern::new(glob))));
        self
    }

    pub fn with_name(mut self, op: TextOp) -> Self {
        self.filesystem.push(FilesystemPredicate::Name(op));
        self
    }

    pub fn with_frontmatter(mut self, key: impl Into<String>, op: ValueOp) -> Self {
        self.frontmatter.push(FrontmatterPredicate { key: key.into(), op });
        self
    }

    pub fn with_content(mut self, predicate: ContentPredicate) -> Self {
        self.content.push(predicate);
        self
    }

    /// Add an inline-tag predicate. A leading `#` on operands is ignored.
    pub fn with_inline_tags(mut self, op: ValueOp) -> Self {
        self.inline.push(normalize_tag_op(op));
        self
    }

    /// Combine two queries into one requiring both.
    pub fn and(mut self, other: StructuredQuery) -> Self {
        self.filesystem.extend(other.filesystem);
        self.frontmatter.extend(other.frontmatter);
        self.content.extend(other.content);
        self.inline.extend(other.inline);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilesystemPredicate {
    /// Matched against the `/`-separated path relative to the vault root.
    Path(PathMatch),
    /// Matched against the file name without extension.
    Name(TextOp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathMatch {
    Glob(GlobPattern),
    Text(TextOp),
}

/// String operators for file names and paths.
///
/// `Equals`/`NotEquals` and `Regex` are case-sensitive; the substring
/// operators ignore case.
#[derive(Debug, Clone, PartialEq)]
pub enum TextOp {
    Equals(String),
    NotEquals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(RegexPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterPredicate {
    pub key: String,
    pub op: ValueOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPredicate {
    /// Case-insensitive substring.
    Text(String),
    /// Case-sensitive regular expression.
    Regex(RegexPattern),
}

/// Operators over JSON-like values (frontmatter fields, inline tags).
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOp {
    Equals(Value),
    NotEquals(Value),
    /// Array value contains the operand; string value contains it as a
    /// substring; other scalars must equal it.
    Contains(Value),
    /// Every operand element is contained. Bare array operands parse to this.
    ContainsAll(Vec<Value>),
    ContainsAny(Vec<Value>),
    Exists(bool),
    Compare(Comparison, Value),
    Regex(RegexPattern),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Gt => ordering == Greater,
            Self::Gte => matches!(ordering, Greater | Equal),
            Self::Lt => ordering == Less,
            Self::Lte => matches!(ordering, Less | Equal),
        }
    }

    pub fn from_operator(op: &str) -> Option<Self> {
        match op.trim_start_matches('$') {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }
}
