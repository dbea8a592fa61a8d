//! Frontmatter parsing from markdown documents.

use serde_json::{Map, Number, Value};
use serde_yaml::Value as YamlValue;
use thiserror::Error;

use super::types::{Frontmatter, ParsedDocument};

/// Errors that can occur during frontmatter parsing.
#[derive(Debug, Error)]
pub enum FrontmatterParseError {
    #[error("invalid YAML frontmatter: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("frontmatter must be a mapping, found {0}")]
    NotAMapping(&'static str),
}

/// Parse frontmatter from markdown content.
///
/// Frontmatter is delimited by `---` at the start of the document:
/// ```markdown
/// ---
/// key: value
/// ---
/// # Document content
/// ```
///
/// A document without an opening delimiter, or with an opening delimiter but
/// no closing one, has empty frontmatter and the full text as its body.
pub fn parse(content: &str) -> Result<ParsedDocument, FrontmatterParseError> {
    let no_frontmatter =
        || ParsedDocument { frontmatter: Frontmatter::default(), body: content.to_string() };

    let trimmed = content.trim_start();

    let mut lines = trimmed.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return Ok(no_frontmatter());
    };
    if first.trim_end() != "---" {
        return Ok(no_frontmatter());
    }

    let after_opening = &trimmed[first.len()..];

    let Some((yaml_end, body_start)) = find_closing_delimiter(after_opening) else {
        return Ok(no_frontmatter());
    };

    let yaml_content = &after_opening[..yaml_end];
    let body = after_opening[body_start..].to_string();

    let frontmatter = if yaml_content.trim().is_empty() {
        Frontmatter::default()
    } else {
        parse_yaml_mapping(yaml_content)?
    };

    Ok(ParsedDocument { frontmatter, body })
}

/// Find the closing `---` line.
///
/// Returns the byte offset where the delimiter line starts and the offset of
/// the first byte after it (including its line ending).
fn find_closing_delimiter(content: &str) -> Option<(usize, usize)> {
    let mut pos = 0;
    for line in content.split_inclusive('\n') {
        if line.trim() == "---" {
            return Some((pos, pos + line.len()));
        }
        pos += line.len();
    }
    None
}

fn parse_yaml_mapping(yaml: &str) -> Result<Frontmatter, FrontmatterParseError> {
    match serde_yaml::from_str::<YamlValue>(yaml)? {
        YamlValue::Null => Ok(Frontmatter::default()),
        YamlValue::Mapping(mapping) => {
            let fields = mapping
                .into_iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_json(v)))
                .collect::<Map<_, _>>();
            Ok(Frontmatter { fields })
        }
        YamlValue::Sequence(_) => Err(FrontmatterParseError::NotAMapping("a sequence")),
        YamlValue::Tagged(_) => Err(FrontmatterParseError::NotAMapping("a tagged value")),
        _ => Err(FrontmatterParseError::NotAMapping("a scalar")),
    }
}

/// Convert a YAML value into its JSON equivalent.
///
/// Tags are dropped, and non-string mapping keys are stringified.
pub(crate) fn yaml_to_json(value: YamlValue) -> Value {
    match value {
        YamlValue::Null => Value::Null,
        YamlValue::Bool(b) => Value::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().and_then(Number::from_f64).map_or(Value::Null, Value::Number)
            }
        }
        YamlValue::String(s) => Value::String(s),
        YamlValue::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        YamlValue::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| (yaml_key_to_string(k), yaml_to_json(v)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key_to_string(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
