//! Evaluation of structured queries against indexed pages.

use std::cmp::Ordering;

use serde_json::Value;

use super::filter::parse_absolute_date;
use super::types::{
    ContentPredicate, FilesystemPredicate, PathMatch, StructuredQuery, TextOp, ValueOp,
};
use crate::index::{Document, PageMetadata};

impl StructuredQuery {
    /// Evaluate against a page. Content predicates fail when `body` is `None`.
    pub fn matches(&self, page: &PageMetadata, body: Option<&str>) -> bool {
        self.filesystem.iter().all(|p| filesystem_matches(p, page))
            && self
                .frontmatter
                .iter()
                .all(|p| value_matches(&p.op, frontmatter_field(page, &p.key)))
            && self.content.iter().all(|p| body.is_some_and(|b| content_matches(p, b)))
            && self.inline.iter().all(|op| inline_matches(op, &page.inline_tags))
    }

    pub fn matches_document(&self, document: &Document) -> bool {
        self.matches(&document.metadata, Some(&document.content))
    }
}

fn filesystem_matches(predicate: &FilesystemPredicate, page: &PageMetadata) -> bool {
    match predicate {
        FilesystemPredicate::Path(PathMatch::Glob(glob)) => glob.is_match(&page.relative_path),
        FilesystemPredicate::Path(PathMatch::Text(op)) => text_matches(op, &page.relative_path),
        FilesystemPredicate::Name(op) => text_matches(op, &page.basename),
    }
}

pub(crate) fn text_matches(op: &TextOp, text: &str) -> bool {
    match op {
        TextOp::Equals(expected) => text == expected,
        TextOp::NotEquals(expected) => text != expected,
        TextOp::Contains(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
        TextOp::StartsWith(prefix) => text.to_lowercase().starts_with(&prefix.to_lowercase()),
        TextOp::EndsWith(suffix) => text.to_lowercase().ends_with(&suffix.to_lowercase()),
        TextOp::Regex(pattern) => pattern.is_match(text),
    }
}

fn content_matches(predicate: &ContentPredicate, body: &str) -> bool {
    match predicate {
        ContentPredicate::Text(needle) => body.to_lowercase().contains(&needle.to_lowercase()),
        ContentPredicate::Regex(pattern) => pattern.is_match(body),
    }
}

/// Look up a frontmatter key, falling back to a dotted path into nested
/// mappings (`author.name`).
pub(crate) fn frontmatter_field<'a>(page: &'a PageMetadata, key: &str) -> Option<&'a Value> {
    if let Some(value) = page.frontmatter.get(key) {
        return Some(value);
    }

    let mut parts = key.split('.');
    let mut current = page.frontmatter.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn inline_matches(op: &ValueOp, inline_tags: &[String]) -> bool {
    if inline_tags.is_empty() {
        return value_matches(op, None);
    }
    let tags = Value::Array(
        inline_tags.iter().map(|t| Value::String(t.trim_start_matches('#').to_string())).collect(),
    );
    value_matches(op, Some(&tags))
}

/// Evaluate a value operator. A missing field fails every operator except
/// `$exists: false`.
pub(crate) fn value_matches(op: &ValueOp, field: Option<&Value>) -> bool {
    let Some(field) = field else {
        return matches!(op, ValueOp::Exists(false));
    };

    match op {
        ValueOp::Exists(expected) => *expected,
        ValueOp::Equals(operand) => value_equals(field, operand),
        ValueOp::NotEquals(operand) => !value_equals(field, operand),
        ValueOp::Contains(operand) => value_contains(field, operand),
        ValueOp::ContainsAll(operands) => operands.iter().all(|o| value_contains(field, o)),
        ValueOp::ContainsAny(operands) => operands.iter().any(|o| value_contains(field, o)),
        ValueOp::Compare(comparison, operand) => any_scalar(field, |item| {
            compare_values(item, operand).is_some_and(|o| comparison.holds(o))
        }),
        ValueOp::Regex(pattern) => {
            any_scalar(field, |item| scalar_text(item).is_some_and(|t| pattern.is_match(&t)))
        }
    }
}

/// Apply `test` to a scalar, or to each element of an array.
fn any_scalar(field: &Value, test: impl Fn(&Value) -> bool) -> bool {
    match field {
        Value::Array(items) => items.iter().any(test),
        _ => test(field),
    }
}

/// Equality where an array field compared with a scalar means membership.
fn value_equals(field: &Value, operand: &Value) -> bool {
    match (field, operand) {
        (Value::Array(items), operand) if !operand.is_array() => {
            items.iter().any(|item| scalars_equal(item, operand))
        }
        (Value::Array(items), Value::Array(expected)) => {
            items.len() == expected.len()
                && items.iter().zip(expected).all(|(a, b)| scalars_equal(a, b))
        }
        _ => scalars_equal(field, operand),
    }
}

fn value_contains(field: &Value, operand: &Value) -> bool {
    match (field, operand) {
        (Value::Array(items), operand) => items.iter().any(|item| scalars_equal(item, operand)),
        (Value::String(text), Value::String(needle)) => {
            text.to_lowercase().contains(&needle.to_lowercase())
        }
        _ => scalars_equal(field, operand),
    }
}

/// Strings compare equal to numbers and booleans with the same text form.
pub(crate) fn scalars_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), other @ (Value::Number(_) | Value::Bool(_)))
        | (other @ (Value::Number(_) | Value::Bool(_)), Value::String(s)) => {
            *s == other.to_string()
        }
        _ => a == b,
    }
}

/// Order two values: numerically, as dates when both parse, else as text.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }

    let (a, b) = (scalar_text(a)?, scalar_text(b)?);
    if let (Some(x), Some(y)) = (parse_absolute_date(&a), parse_absolute_date(&b)) {
        return Some(x.cmp(&y));
    }
    Some(a.cmp(&b))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Strip a leading `#` from every string operand, so `"y"` and `"#y"` name
/// the same inline tag.
pub(crate) fn normalize_tag_op(op: ValueOp) -> ValueOp {
    fn strip(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(s.trim_start_matches('#').to_string()),
            Value::Array(items) => Value::Array(items.into_iter().map(strip).collect()),
            other => other,
        }
    }

    match op {
        ValueOp::Equals(v) => ValueOp::Equals(strip(v)),
        ValueOp::NotEquals(v) => ValueOp::NotEquals(strip(v)),
        ValueOp::Contains(v) => ValueOp::Contains(strip(v)),
        ValueOp::ContainsAll(vs) => ValueOp::ContainsAll(vs.into_iter().map(strip).collect()),
        ValueOp::ContainsAny(vs) => ValueOp::ContainsAny(vs.into_iter().map(strip).collect()),
        ValueOp::Compare(c, v) => ValueOp::Compare(c, strip(v)),
        other @ (ValueOp::Exists(_) | ValueOp::Regex(_)) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Frontmatter;
    use crate::query::pattern::RegexPattern;
    use crate::query::types::Comparison;
    use rstest::rstest;
    use serde_json::json;
    use std::path::PathBuf;

    fn page(relative: &str, frontmatter: Value, inline: &[&str]) -> PageMetadata {
        let basename = relative.rsplit('/').next().unwrap().trim_end_matches(".md").to_string();
        let folder_path = relative.rsplit_once('/').map(|(f, _)| f.to_string()).unwrap_or_default();
        let fields = match frontmatter {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        PageMetadata {
            path: PathBuf::from("/vault").join(relative),
            relative_path: relative.to_string(),
            folder_path,
            basename: basename.clone(),
            title: basename,
            frontmatter: Frontmatter { fields },
            tags: vec![],
            inline_tags: inline.iter().map(|t| t.to_string()).collect(),
            links: vec![],
            mtime: 0,
            size: 0,
        }
    }

    #[test]
    fn bare_scalar_means_equality() {
        let a = page("a.md", json!({"status": "draft"}), &[]);
        let b = page("b.md", json!({"status": "published"}), &[]);
        let query =
            StructuredQuery::new().with_frontmatter("status", ValueOp::Equals(json!("draft")));

        assert!(query.matches(&a, None));
        assert!(!query.matches(&b, None));
    }

    #[test]
    fn contains_all_requires_every_element() {
        let both = page("a.md", json!({"tags": ["x", "y"]}), &[]);
        let one = page("b.md", json!({"tags": ["x"]}), &[]);
        let op = ValueOp::ContainsAll(vec![json!("x"), json!("y")]);

        assert!(value_matches(&op, frontmatter_field(&both, "tags")));
        assert!(!value_matches(&op, frontmatter_field(&one, "tags")));
    }

    #[rstest]
    #[case(ValueOp::Exists(true), false)]
    #[case(ValueOp::Exists(false), true)]
    #[case(ValueOp::Equals(json!("x")), false)]
    #[case(ValueOp::NotEquals(json!("x")), false)]
    #[case(ValueOp::Contains(json!("x")), false)]
    #[case(ValueOp::Compare(Comparison::Gt, json!(1)), false)]
    fn missing_field(#[case] op: ValueOp, #[case] expected: bool) {
        assert_eq!(value_matches(&op, None), expected);
    }

    #[rstest]
    #[case(json!(["rust", "cli"]), ValueOp::Contains(json!("cli")), true)]
    #[case(json!(["rust", "cli"]), ValueOp::Contains(json!("cl")), false)]
    #[case(json!("Hello World"), ValueOp::Contains(json!("world")), true)]
    #[case(json!(3), ValueOp::Contains(json!(3)), true)]
    #[case(json!(["a", "b"]), ValueOp::ContainsAny(vec![json!("z"), json!("b")]), true)]
    #[case(json!(["a", "b"]), ValueOp::Equals(json!("a")), true)]
    #[case(json!(["a", "b"]), ValueOp::Equals(json!(["a", "b"])), true)]
    #[case(json!(["a", "b"]), ValueOp::Equals(json!(["b", "a"])), false)]
    #[case(json!(5), ValueOp::Compare(Comparison::Gte, json!(5)), true)]
    #[case(json!("10"), ValueOp::Compare(Comparison::Gt, json!(9)), true)]
    #[case(json!("2024-03-01"), ValueOp::Compare(Comparison::Lt, json!("2024-10-01")), true)]
    #[case(json!(2024), ValueOp::Equals(json!("2024")), true)]
    #[case(json!(true), ValueOp::Equals(json!("true")), true)]
    #[case(json!("v1.2"), ValueOp::Regex(RegexPattern::new(r"^v\d")), true)]
    #[case(json!("v1.2"), ValueOp::Regex(RegexPattern::new("(unclosed")), false)]
    fn value_operators(#[case] field: Value, #[case] op: ValueOp, #[case] expected: bool) {
        assert_eq!(value_matches(&op, Some(&field)), expected);
    }

    #[test]
    fn dotted_keys_reach_nested_values() {
        let p = page("a.md", json!({"author": {"name": "Ada"}}), &[]);
        assert_eq!(frontmatter_field(&p, "author.name"), Some(&json!("Ada")));
        assert_eq!(frontmatter_field(&p, "author.email"), None);
    }

    #[test]
    fn inline_tags_ignore_hash_prefix() {
        let p = page("a.md", json!({}), &["#y", "#todo"]);
        let with_hash = StructuredQuery::new().with_inline_tags(ValueOp::Contains(json!("#y")));
        let without = StructuredQuery::new().with_inline_tags(ValueOp::Contains(json!("y")));

        assert!(with_hash.matches(&p, None));
        assert!(without.matches(&p, None));
    }

    #[test]
    fn inline_tags_do_not_see_frontmatter_tags() {
        let p = page("a.md", json!({"tags": ["y"]}), &[]);
        let query = StructuredQuery::new().with_inline_tags(ValueOp::Contains(json!("y")));
        assert!(!query.matches(&p, None));

        let absent = StructuredQuery::new().with_inline_tags(ValueOp::Exists(false));
        assert!(absent.matches(&p, None));
    }

    #[test]
    fn path_glob_and_name_operators() {
        let p = page("posts/sub/Alpha-Guide.md", json!({}), &[]);

        assert!(StructuredQuery::new().with_path("posts/**").matches(&p, None));
        assert!(!StructuredQuery::new().with_path("posts/*.md").matches(&p, None));
        assert!(
            StructuredQuery::new()
                .with_name(TextOp::Contains("alpha".into()))
                .matches(&p, None)
        );
        assert!(
            !StructuredQuery::new()
                .with_name(TextOp::Equals("alpha-guide".into()))
                .matches(&p, None)
        );
    }

    #[test]
    fn content_predicates_need_a_body() {
        let p = page("a.md", json!({}), &[]);
        let query = StructuredQuery::new().with_content(ContentPredicate::Text("HELLO".into()));

        assert!(query.matches(&p, Some("well hello there")));
        assert!(!query.matches(&p, Some("goodbye")));
        assert!(!query.matches(&p, None));
    }

    #[test]
    fn malformed_regex_matches_nothing() {
        let p = page("a.md", json!({}), &[]);
        let query = StructuredQuery::new()
            .with_content(ContentPredicate::Regex(RegexPattern::new("(unclosed")));
        assert!(!query.matches(&p, Some("(unclosed")));
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(StructuredQuery::new().matches(&page("a.md", json!({}), &[]), None));
    }
}
