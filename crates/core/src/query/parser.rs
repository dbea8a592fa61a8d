//! Parsing of structured queries from JSON and from the one-line text syntax.
//!
//! # Text syntax
//!
//! Whitespace-separated terms, all of which must match:
//!
//! - `fs:path=posts/**` glob over the relative path
//! - `fs:name=readme`, `fs:name:read`, `fs:name~^r`, `fs:name!=x`
//! - `fm:status=draft`, `fm:tags:rust`, `fm:tags:a,b`, `fm:priority>=2`,
//!   `fm:title~^Draft`, `fm:author` (field present)
//! - `content:word`, `content:text="two words"`, `content:regex=TODO\s`
//! - `inline:tags:y` or the shorthand `#y`
//! - any other word matches as a case-insensitive substring of the file name
//!
//! Values may be quoted with `"` or `'`.

use serde_json::{Map, Value};

use super::QueryError;
use super::matcher::normalize_tag_op;
use super::pattern::{GlobPattern, RegexPattern};
use super::types::{
    Comparison, ContentPredicate, FilesystemPredicate, FrontmatterPredicate, PathMatch,
    StructuredQuery, TextOp, ValueOp,
};

/// Parse either form: input starting with `{` is JSON, anything else is the
/// text syntax.
pub fn parse_query(input: &str) -> Result<StructuredQuery, QueryError> {
    if input.trim_start().starts_with('{') {
        let value: Value = serde_json::from_str(input)?;
        parse_json_query(&value)
    } else {
        parse_text_query(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Filesystem,
    Frontmatter,
    Content,
    Inline,
}

impl Namespace {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "filesystem" | "fs" => Some(Self::Filesystem),
            "frontmatter" | "fm" => Some(Self::Frontmatter),
            "content" => Some(Self::Content),
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Frontmatter => "frontmatter",
            Self::Content => "content",
            Self::Inline => "inline",
        }
    }
}

/// Parse the JSON form. Namespaces may be nested objects
/// (`{"frontmatter": {"status": "draft"}}`) or dotted keys
/// (`{"frontmatter.status": "draft"}`).
pub fn parse_json_query(value: &Value) -> Result<StructuredQuery, QueryError> {
    let object = value.as_object().ok_or(QueryError::NotAnObject)?;
    let mut query = StructuredQuery::new();

    for (key, operand) in object {
        let (namespace, field) = match key.split_once('.') {
            Some((ns, field)) => (ns, Some(field)),
            None => (key.as_str(), None),
        };
        let namespace =
            Namespace::parse(namespace).ok_or_else(|| QueryError::UnknownNamespace(key.clone()))?;

        match field {
            Some(field) => add_field(&mut query, namespace, field, operand)?,
            None => {
                let fields = operand.as_object().ok_or_else(|| QueryError::InvalidOperand {
                    operator: namespace.as_str().to_string(),
                    reason: "expected an object of fields".to_string(),
                })?;
                for (field, operand) in fields {
                    add_field(&mut query, namespace, field, operand)?;
                }
            }
        }
    }

    Ok(query)
}

fn add_field(
    query: &mut StructuredQuery,
    namespace: Namespace,
    field: &str,
    operand: &Value,
) -> Result<(), QueryError> {
    match (namespace, field) {
        (Namespace::Filesystem, "path") => {
            for m in path_ops(operand)? {
                query.filesystem.push(FilesystemPredicate::Path(m));
            }
        }
        (Namespace::Filesystem, "name") => {
            for op in text_ops("name", operand)? {
                query.filesystem.push(FilesystemPredicate::Name(op));
            }
        }
        (Namespace::Frontmatter, key) => {
            for op in value_ops(operand)? {
                query.frontmatter.push(FrontmatterPredicate { key: key.to_string(), op });
            }
        }
        (Namespace::Content, kind @ ("text" | "regex")) => {
            let patterns = match operand {
                Value::Array(items) => items.iter().map(|v| string_operand(kind, v)).collect(),
                other => vec![string_operand(kind, other)],
            };
            for pattern in patterns {
                let pattern = pattern?;
                query.content.push(if kind == "text" {
                    ContentPredicate::Text(pattern)
                } else {
                    ContentPredicate::Regex(RegexPattern::new(&pattern))
                });
            }
        }
        (Namespace::Inline, "tags") => {
            for op in value_ops(operand)? {
                query.inline.push(normalize_tag_op(op));
            }
        }
        (namespace, field) => {
            return Err(QueryError::UnknownField {
                namespace: namespace.as_str().to_string(),
                field: field.to_string(),
            });
        }
    }
    Ok(())
}

/// Operands over JSON values. Operator objects may hold several operators,
/// all of which must hold; a bare array requires every element.
fn value_ops(operand: &Value) -> Result<Vec<ValueOp>, QueryError> {
    match operand {
        Value::Object(map) if is_operator_object(map) => {
            map.iter().map(|(op, arg)| value_op(op, arg)).collect()
        }
        Value::Array(items) => Ok(vec![ValueOp::ContainsAll(items.clone())]),
        other => Ok(vec![ValueOp::Equals(other.clone())]),
    }
}

fn value_op(operator: &str, arg: &Value) -> Result<ValueOp, QueryError> {
    if let Some(comparison) = Comparison::from_operator(operator) {
        return Ok(ValueOp::Compare(comparison, arg.clone()));
    }

    match operator {
        "$eq" => Ok(ValueOp::Equals(arg.clone())),
        "$ne" => Ok(ValueOp::NotEquals(arg.clone())),
        "$contains" => Ok(ValueOp::Contains(arg.clone())),
        "$containsAll" => Ok(ValueOp::ContainsAll(list_operand(arg))),
        "$containsAny" | "$in" => Ok(ValueOp::ContainsAny(list_operand(arg))),
        "$exists" => match arg {
            Value::Bool(b) => Ok(ValueOp::Exists(*b)),
            _ => Err(QueryError::InvalidOperand {
                operator: operator.to_string(),
                reason: "expected true or false".to_string(),
            }),
        },
        "$regex" => Ok(ValueOp::Regex(RegexPattern::new(&string_operand(operator, arg)?))),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

fn text_ops(field: &str, operand: &Value) -> Result<Vec<TextOp>, QueryError> {
    match operand {
        Value::Object(map) if is_operator_object(map) => {
            map.iter().map(|(op, arg)| text_op(op, arg)).collect()
        }
        other => Ok(vec![TextOp::Equals(string_operand(field, other)?)]),
    }
}

fn text_op(operator: &str, arg: &Value) -> Result<TextOp, QueryError> {
    let text = string_operand(operator, arg)?;
    match operator {
        "$eq" => Ok(TextOp::Equals(text)),
        "$ne" => Ok(TextOp::NotEquals(text)),
        "$contains" => Ok(TextOp::Contains(text)),
        "$startsWith" => Ok(TextOp::StartsWith(text)),
        "$endsWith" => Ok(TextOp::EndsWith(text)),
        "$regex" => Ok(TextOp::Regex(RegexPattern::new(&text))),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

fn path_ops(operand: &Value) -> Result<Vec<PathMatch>, QueryError> {
    match operand {
        Value::String(glob) => Ok(vec![PathMatch::Glob(GlobPattern::new(glob))]),
        Value::Object(map) if is_operator_object(map) => map
            .iter()
            .map(|(op, arg)| match op.as_str() {
                "$glob" => Ok(PathMatch::Glob(GlobPattern::new(&string_operand(op, arg)?))),
                _ => text_op(op, arg).map(PathMatch::Text),
            })
            .collect(),
        _ => Err(QueryError::InvalidOperand {
            operator: "path".to_string(),
            reason: "expected a glob string or operator object".to_string(),
        }),
    }
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn list_operand(arg: &Value) -> Vec<Value> {
    match arg {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn string_operand(operator: &str, arg: &Value) -> Result<String, QueryError> {
    match arg {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(QueryError::InvalidOperand {
            operator: operator.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

/// Parse the one-line text syntax.
pub fn parse_text_query(input: &str) -> Result<StructuredQuery, QueryError> {
    let mut query = StructuredQuery::new();

    for term in tokenize(input)? {
        if let Some(tag) = term.strip_prefix('#')
            && !tag.is_empty()
        {
            query.inline.push(ValueOp::Contains(Value::String(tag.to_string())));
            continue;
        }

        let namespaced = term
            .split_once(':')
            .and_then(|(ns, rest)| Namespace::parse(ns).map(|ns| (ns, rest)));

        match namespaced {
            Some((namespace, rest)) => add_text_term(&mut query, namespace, rest, &term)?,
            None => query.filesystem.push(FilesystemPredicate::Name(TextOp::Contains(term))),
        }
    }

    Ok(query)
}

const TEXT_OPERATORS: [&str; 8] = ["!=", ">=", "<=", "=", ">", "<", "~", ":"];

/// Split `field<op>value` at the earliest operator.
fn split_operator(rest: &str) -> Option<(&str, &'static str, &str)> {
    let (index, op) = TEXT_OPERATORS
        .iter()
        .filter_map(|op| rest.find(op).map(|i| (i, *op)))
        .min_by_key(|(i, op)| (*i, std::cmp::Reverse(op.len())))?;
    Some((&rest[..index], op, &rest[index + op.len()..]))
}

fn add_text_term(
    query: &mut StructuredQuery,
    namespace: Namespace,
    rest: &str,
    term: &str,
) -> Result<(), QueryError> {
    let invalid = || QueryError::InvalidTerm(term.to_string());

    match namespace {
        Namespace::Content => {
            let predicate = match split_operator(rest) {
                Some(("regex", "=" | "~", pattern)) => {
                    ContentPredicate::Regex(RegexPattern::new(pattern))
                }
                Some(("text", "=" | ":", text)) => ContentPredicate::Text(text.to_string()),
                _ if rest.is_empty() => return Err(invalid()),
                _ => ContentPredicate::Text(rest.to_string()),
            };
            query.content.push(predicate);
        }
        Namespace::Filesystem => {
            let (field, op, value) = split_operator(rest).ok_or_else(invalid)?;
            let value = value.to_string();
            let predicate = match (field, op) {
                ("path", "=") => {
                    FilesystemPredicate::Path(PathMatch::Glob(GlobPattern::new(&value)))
                }
                ("path", _) => {
                    let op = text_term_op(op, value).ok_or_else(invalid)?;
                    FilesystemPredicate::Path(PathMatch::Text(op))
                }
                ("name", _) => {
                    FilesystemPredicate::Name(text_term_op(op, value).ok_or_else(invalid)?)
                }
                (field, _) => {
                    return Err(QueryError::UnknownField {
                        namespace: namespace.as_str().to_string(),
                        field: field.to_string(),
                    });
                }
            };
            query.filesystem.push(predicate);
        }
        Namespace::Frontmatter => {
            let (key, op) = match split_operator(rest) {
                Some((key, op, value)) => (key, value_term_op(op, value).ok_or_else(invalid)?),
                None if !rest.is_empty() => (rest, ValueOp::Exists(true)),
                None => return Err(invalid()),
            };
            if key.is_empty() {
                return Err(invalid());
            }
            query.frontmatter.push(FrontmatterPredicate { key: key.to_string(), op });
        }
        Namespace::Inline => {
            let op = match split_operator(rest) {
                Some(("tags", op, value)) => value_term_op(op, value).ok_or_else(invalid)?,
                Some((field, _, _)) => {
                    return Err(QueryError::UnknownField {
                        namespace: namespace.as_str().to_string(),
                        field: field.to_string(),
                    });
                }
                None if !rest.is_empty() => ValueOp::Contains(Value::String(rest.to_string())),
                None => return Err(invalid()),
            };
            query.inline.push(normalize_tag_op(op));
        }
    }
    Ok(())
}

fn text_term_op(op: &str, value: String) -> Option<TextOp> {
    match op {
        "=" => Some(TextOp::Equals(value)),
        "!=" => Some(TextOp::NotEquals(value)),
        ":" => Some(TextOp::Contains(value)),
        "~" => Some(TextOp::Regex(RegexPattern::new(&value))),
        _ => None,
    }
}

fn value_term_op(op: &str, value: &str) -> Option<ValueOp> {
    let scalar = || Value::String(value.to_string());
    if let Some(comparison) = match op {
        ">" => Some(Comparison::Gt),
        ">=" => Some(Comparison::Gte),
        "<" => Some(Comparison::Lt),
        "<=" => Some(Comparison::Lte),
        _ => None,
    } {
        return Some(ValueOp::Compare(comparison, scalar()));
    }

    match op {
        "=" => Some(ValueOp::Equals(scalar())),
        "!=" => Some(ValueOp::NotEquals(scalar())),
        "~" => Some(ValueOp::Regex(RegexPattern::new(value))),
        ":" if value.contains(',') => Some(ValueOp::ContainsAll(
            value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Value::String(v.to_string()))
                .collect(),
        )),
        ":" => Some(ValueOp::Contains(scalar())),
        _ => None,
    }
}

/// Split on whitespace outside quotes, dropping the quote characters.
fn tokenize(input: &str) -> Result<Vec<String>, QueryError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in input.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(QueryError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
