//! Query model and evaluation over indexed pages.
//!
//! Two query surfaces share one evaluator:
//! - [`StructuredQuery`], a namespaced predicate set parsed from JSON or a
//!   compact text syntax (see [`parse_query`])
//! - [`FilterCollection`], a flat list of field/operator/value conditions
//!   joined with AND or OR
//!
//! Results are returned as a [`DocumentSet`], which supports lazy set algebra.

pub mod filter;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod selection;
pub mod types;

use thiserror::Error;

pub use filter::{
    ArrayFilter, DateFilter, DateSpec, FilterCollection, FilterCondition, FilterField, FilterOp,
    Logic, RangeFilter, TextFilter, TextFilterKind, parse_size,
};
pub use parser::{parse_json_query, parse_query, parse_text_query};
pub use pattern::{GlobPattern, RegexPattern};
pub use selection::DocumentSet;
pub use types::{
    Comparison, ContentPredicate, FilesystemPredicate, FrontmatterPredicate, PathMatch,
    StructuredQuery, TextOp, ValueOp,
};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid JSON query: {0}")]
    Json(#[from] serde_json::Error),

    #[error("query must be a JSON object")]
    NotAnObject,

    #[error("unknown query namespace: {0}")]
    UnknownNamespace(String),

    #[error("unknown field '{field}' in namespace '{namespace}'")]
    UnknownField { namespace: String, field: String },

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("invalid operand for {operator}: {reason}")]
    InvalidOperand { operator: String, reason: String },

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("invalid glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid size: {0}")]
    InvalidSize(String),

    #[error("unterminated quote in query")]
    UnterminatedQuote,

    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(usize),

    #[error("cannot parse query term: {0}")]
    InvalidTerm(String),
}
