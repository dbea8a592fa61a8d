//! Frontmatter types and data structures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed YAML frontmatter, stored as JSON values.
///
/// Keys are kept sorted so two parses of the same block compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Fields as key-value pairs.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Frontmatter {
    /// Look up a top-level field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `title` field, when it is a non-empty string.
    pub fn title(&self) -> Option<&str> {
        self.fields
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Entries of the `tags` field with any leading `#` removed.
    ///
    /// Accepts a list of strings or a single string.
    pub fn tags(&self) -> Vec<String> {
        let normalize = |s: &str| s.trim().trim_start_matches('#').to_string();

        match self.fields.get("tags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(normalize)
                .filter(|t| !t.is_empty())
                .collect(),
            Some(Value::String(s)) => {
                let tag = normalize(s);
                if tag.is_empty() { Vec::new() } else { vec![tag] }
            }
            _ => Vec::new(),
        }
    }
}

/// Result of splitting frontmatter from markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Parsed frontmatter; empty when the document has none.
    pub frontmatter: Frontmatter,
    /// The markdown body (everything after frontmatter).
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fm(value: Value) -> Frontmatter {
        match value {
            Value::Object(fields) => Frontmatter { fields },
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn tags_from_list_strip_hash() {
        let fm = fm(json!({"tags": ["rust", "#cli", "  ", 3]}));
        assert_eq!(fm.tags(), vec!["rust", "cli"]);
    }

    #[test]
    fn tags_from_single_string() {
        let fm = fm(json!({"tags": "#solo"}));
        assert_eq!(fm.tags(), vec!["solo"]);
    }

    #[test]
    fn title_ignores_blank_and_non_string() {
        assert_eq!(fm(json!({"title": "  "})).title(), None);
        assert_eq!(fm(json!({"title": 42})).title(), None);
        assert_eq!(fm(json!({"title": "Hello"})).title(), Some("Hello"));
    }
}
