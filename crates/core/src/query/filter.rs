//! Flat, named-condition filters combined with AND/OR.
//!
//! This is the list-based query form: each condition names a field, an
//! operator, and a value. Conditions are compiled into closed operator enums
//! up front; relative dates stay relative until evaluation.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::QueryError;
use super::matcher::{frontmatter_field, scalar_text};
use super::pattern::RegexPattern;
use super::types::Comparison;
use crate::index::PageMetadata;

/// How conditions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterCollection {
    pub logic: Logic,
    pub conditions: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub name: Option<String>,
    pub field: FilterField,
    pub op: FilterOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    Name,
    Path,
    Title,
    Content,
    Modified,
    Size,
    Tags,
    Links,
    Frontmatter(String),
}

impl FilterField {
    pub fn parse(field: &str) -> Result<Self, QueryError> {
        let field = field.trim();
        if let Some(key) = field.strip_prefix("frontmatter.").or_else(|| field.strip_prefix("fm."))
        {
            return Ok(Self::Frontmatter(key.to_string()));
        }

        match field {
            "name" | "basename" => Ok(Self::Name),
            "path" => Ok(Self::Path),
            "title" => Ok(Self::Title),
            "content" => Ok(Self::Content),
            "modified" | "mtime" => Ok(Self::Modified),
            "size" => Ok(Self::Size),
            "tags" => Ok(Self::Tags),
            "links" => Ok(Self::Links),
            other => Err(QueryError::UnknownField {
                namespace: "filter".to_string(),
                field: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Text(TextFilter),
    Date(DateFilter),
    Size(RangeFilter<u64>),
    Number(RangeFilter<f64>),
    Array(ArrayFilter),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFilter {
    pub kind: TextFilterKind,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextFilterKind {
    Contains(String),
    NotContains(String),
    Equals(String),
    NotEquals(String),
    Matches(RegexPattern),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DateFilter {
    Compare(Comparison, DateSpec),
    Between(DateSpec, DateSpec),
    NotBetween(DateSpec, DateSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeFilter<T> {
    Compare(Comparison, T),
    Between(T, T),
    NotBetween(T, T),
}

/// Any-of / all-of membership over string lists. Comparison ignores case
/// and a leading `#`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayFilter {
    ContainsAny(Vec<String>),
    NotContains(Vec<String>),
    ContainsAll(Vec<String>),
}

/// A point in time as written in a filter: absolute, or an offset from the
/// moment of evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    Absolute(DateTime<Utc>),
    Relative(Duration),
    /// Midnight UTC, offset by whole days from the evaluation date.
    StartOfDay(i64),
}

static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?)(\d+)\s*([hdwmy])$").unwrap());

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([kmgt]?)(?:i?b)?$").unwrap());

impl DateSpec {
    /// Parse `-30d`, `+2w`, `12h`, `today`, `now`, `yesterday`, an RFC 3339
    /// timestamp, or a `YYYY-MM-DD` date (midnight UTC).
    ///
    /// Unsigned offsets point into the past.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let input = input.trim();
        let lower = input.to_lowercase();

        match lower.as_str() {
            "now" => return Ok(Self::Relative(Duration::zero())),
            "today" => return Ok(Self::StartOfDay(0)),
            "yesterday" => return Ok(Self::StartOfDay(-1)),
            _ => {}
        }

        if let Some(caps) = RELATIVE_DATE_RE.captures(&lower) {
            let amount: i64 =
                caps[2].parse().map_err(|_| QueryError::InvalidDate(input.to_string()))?;
            let unit = match &caps[3] {
                "h" => Duration::hours(1),
                "d" => Duration::days(1),
                "w" => Duration::weeks(1),
                "m" => Duration::days(30),
                _ => Duration::days(365),
            };
            let amount =
                i32::try_from(amount).map_err(|_| QueryError::InvalidDate(input.to_string()))?;
            let offset =
                unit.checked_mul(amount).ok_or_else(|| QueryError::InvalidDate(input.to_string()))?;
            let offset = if &caps[1] == "+" { offset } else { -offset };
            // Offsets must land inside the representable date range.
            if Utc::now().checked_add_signed(offset).is_none() {
                return Err(QueryError::InvalidDate(input.to_string()));
            }
            return Ok(Self::Relative(offset));
        }

        parse_absolute_date(input)
            .map(Self::Absolute)
            .ok_or_else(|| QueryError::InvalidDate(input.to_string()))
    }

    /// The instant this spec denotes at `now`, or `None` when it falls
    /// outside the representable date range.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Absolute(at) => Some(*at),
            Self::Relative(offset) => now.checked_add_signed(*offset),
            Self::StartOfDay(days) => {
                start_of_day(now.date_naive()).checked_add_signed(Duration::try_days(*days)?)
            }
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Parse an absolute date: RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, or `YYYY-MM-DD`.
pub(crate) fn parse_absolute_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&at));
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().map(start_of_day)
}

/// Parse a byte size such as `512`, `512b`, `10k`, `1.5mb`, or `2G`, using
/// 1024-based multipliers.
pub fn parse_size(input: &str) -> Result<u64, QueryError> {
    let caps = SIZE_RE
        .captures(input.trim())
        .ok_or_else(|| QueryError::InvalidSize(input.to_string()))?;

    let amount: f64 = caps[1].parse().map_err(|_| QueryError::InvalidSize(input.to_string()))?;
    let exponent = match caps[2].to_ascii_lowercase().as_str() {
        "k" => 1,
        "m" => 2,
        "g" => 3,
        "t" => 4,
        _ => 0,
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (amount * 1024_f64.powi(exponent)).round() as u64;
    Ok(bytes)
}

/// Wire form of a filter collection.
#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    logic: Logic,
    #[serde(default, alias = "filters")]
    conditions: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
    #[serde(default)]
    name: Option<String>,
    field: String,
    operator: String,
    #[serde(default)]
    value: Value,
    #[serde(default, alias = "case_sensitive")]
    case_sensitive: bool,
}

impl FilterCollection {
    pub fn new(logic: Logic) -> Self {
        Self { logic, conditions: Vec::new() }
    }

    pub fn from_json(value: &Value) -> Result<Self, QueryError> {
        let raw = RawCollection::deserialize(value)?;
        let conditions = raw
            .conditions
            .into_iter()
            .map(|c| {
                FilterCondition::compile(c.name, &c.field, &c.operator, &c.value, c.case_sensitive)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { logic: raw.logic, conditions })
    }

    pub fn from_json_str(input: &str) -> Result<Self, QueryError> {
        let value: Value = serde_json::from_str(input)?;
        Self::from_json(&value)
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Whether evaluation needs the page body.
    pub fn needs_content(&self) -> bool {
        self.conditions.iter().any(|c| c.field == FilterField::Content)
    }

    /// Evaluate against a page. An empty collection matches everything.
    pub fn matches(&self, page: &PageMetadata, body: Option<&str>, now: DateTime<Utc>) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let mut results = self.conditions.iter().map(|c| c.matches(page, body, now));
        match self.logic {
            Logic::And => results.all(|r| r),
            Logic::Or => results.any(|r| r),
        }
    }
}

impl FilterCondition {
    /// Compile one condition. Which operators are valid depends on the field;
    /// frontmatter fields pick their kind from the operator and value.
    pub fn compile(
        name: Option<String>,
        field: &str,
        operator: &str,
        value: &Value,
        case_sensitive: bool,
    ) -> Result<Self, QueryError> {
        let field = FilterField::parse(field)?;
        let operator = operator.trim().to_lowercase();

        let op = match &field {
            FilterField::Name | FilterField::Path | FilterField::Title | FilterField::Content => {
                FilterOp::Text(text_filter(&operator, value, case_sensitive)?)
            }
            FilterField::Modified => FilterOp::Date(date_filter(&operator, value)?),
            FilterField::Size => FilterOp::Size(range_filter(&operator, value, size_operand)?),
            FilterField::Tags | FilterField::Links => {
                FilterOp::Array(array_filter(&operator, value)?)
            }
            FilterField::Frontmatter(_) => frontmatter_filter(&operator, value, case_sensitive)?,
        };

        Ok(Self { name, field, op })
    }

    pub fn matches(&self, page: &PageMetadata, body: Option<&str>, now: DateTime<Utc>) -> bool {
        match (&self.field, &self.op) {
            (FilterField::Name, FilterOp::Text(f)) => f.matches(&page.basename),
            (FilterField::Path, FilterOp::Text(f)) => f.matches(&page.relative_path),
            (FilterField::Title, FilterOp::Text(f)) => f.matches(&page.title),
            (FilterField::Content, FilterOp::Text(f)) => body.is_some_and(|b| f.matches(b)),
            (FilterField::Modified, FilterOp::Date(f)) => f.matches(page.modified(), now),
            (FilterField::Size, FilterOp::Size(f)) => f.matches(page.size),
            (FilterField::Tags, FilterOp::Array(f)) => f.matches(&page.tags),
            (FilterField::Links, FilterOp::Array(f)) => f.matches(&page.links),
            (FilterField::Frontmatter(key), op) => {
                frontmatter_field(page, key).is_some_and(|v| frontmatter_matches(op, v, now))
            }
            _ => false,
        }
    }
}

fn frontmatter_matches(op: &FilterOp, value: &Value, now: DateTime<Utc>) -> bool {
    match (op, value) {
        (FilterOp::Array(f), Value::Array(items)) => {
            f.matches(&items.iter().filter_map(scalar_text).collect::<Vec<_>>())
        }
        (FilterOp::Array(f), scalar) => scalar_text(scalar).is_some_and(|s| f.matches(&[s])),
        // Text operators on a list apply to its elements: contains/equals
        // need one element to match, the negations need none to.
        (FilterOp::Text(f), Value::Array(items)) => {
            let texts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            if f.is_negation() {
                texts.iter().all(|t| f.matches(t))
            } else {
                texts.iter().any(|t| f.matches(t))
            }
        }
        (FilterOp::Text(f), scalar) => scalar_text(scalar).is_some_and(|s| f.matches(&s)),
        (FilterOp::Date(f), scalar) => scalar_text(scalar)
            .and_then(|s| parse_absolute_date(&s))
            .is_some_and(|at| f.matches(at, now)),
        (FilterOp::Number(f), scalar) => match scalar {
            Value::Number(n) => n.as_f64().is_some_and(|n| f.matches(n)),
            Value::String(s) => s.trim().parse::<f64>().is_ok_and(|n| f.matches(n)),
            _ => false,
        },
        (FilterOp::Size(f), scalar) => match scalar {
            Value::Number(n) => n.as_u64().is_some_and(|n| f.matches(n)),
            Value::String(s) => parse_size(s).is_ok_and(|n| f.matches(n)),
            _ => false,
        },
    }
}

impl TextFilter {
    pub fn matches(&self, text: &str) -> bool {
        let fold = |s: &str| if self.case_sensitive { s.to_string() } else { s.to_lowercase() };
        match &self.kind {
            TextFilterKind::Contains(needle) => fold(text).contains(&fold(needle)),
            TextFilterKind::NotContains(needle) => !fold(text).contains(&fold(needle)),
            TextFilterKind::Equals(expected) => fold(text) == fold(expected),
            TextFilterKind::NotEquals(expected) => fold(text) != fold(expected),
            TextFilterKind::Matches(pattern) => pattern.is_match(text),
        }
    }

    fn is_negation(&self) -> bool {
        matches!(self.kind, TextFilterKind::NotContains(_) | TextFilterKind::NotEquals(_))
    }
}

impl DateFilter {
    /// A bound that cannot be resolved matches nothing.
    pub fn matches(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Self::Compare(comparison, spec) => {
                spec.resolve(now).is_some_and(|bound| comparison.holds(at.cmp(&bound)))
            }
            Self::Between(from, to) => match (from.resolve(now), to.resolve(now)) {
                (Some(from), Some(to)) => in_range(at, from, to),
                _ => false,
            },
            Self::NotBetween(from, to) => match (from.resolve(now), to.resolve(now)) {
                (Some(from), Some(to)) => !in_range(at, from, to),
                _ => false,
            },
        }
    }
}

impl<T: PartialOrd + Copy> RangeFilter<T> {
    pub fn matches(&self, value: T) -> bool {
        match self {
            Self::Compare(comparison, bound) => {
                value.partial_cmp(bound).is_some_and(|o| comparison.holds(o))
            }
            Self::Between(from, to) => in_range(value, *from, *to),
            Self::NotBetween(from, to) => !in_range(value, *from, *to),
        }
    }
}

impl ArrayFilter {
    pub fn matches(&self, items: &[String]) -> bool {
        let has = |wanted: &String| items.iter().any(|item| tag_eq(item, wanted));
        match self {
            Self::ContainsAny(wanted) => wanted.iter().any(has),
            Self::NotContains(wanted) => !wanted.iter().any(has),
            Self::ContainsAll(wanted) => wanted.iter().all(has),
        }
    }
}

fn tag_eq(a: &str, b: &str) -> bool {
    a.trim_start_matches('#').eq_ignore_ascii_case(b.trim_start_matches('#'))
}

/// Inclusive on both ends; bounds may be given in either order.
fn in_range<T: PartialOrd>(value: T, a: T, b: T) -> bool {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    value >= low && value <= high
}

fn text_filter(
    operator: &str,
    value: &Value,
    case_sensitive: bool,
) -> Result<TextFilter, QueryError> {
    let text = || scalar_text(value).ok_or_else(|| invalid(operator, "expected a string value"));
    let kind = match operator {
        "contains" => TextFilterKind::Contains(text()?),
        "not_contains" => TextFilterKind::NotContains(text()?),
        "equals" | "eq" => TextFilterKind::Equals(text()?),
        "not_equals" | "ne" => TextFilterKind::NotEquals(text()?),
        "matches" | "regex" => TextFilterKind::Matches(if case_sensitive {
            RegexPattern::new(&text()?)
        } else {
            RegexPattern::case_insensitive(&text()?)
        }),
        other => return Err(QueryError::UnknownOperator(other.to_string())),
    };
    Ok(TextFilter { kind, case_sensitive })
}

fn date_filter(operator: &str, value: &Value) -> Result<DateFilter, QueryError> {
    if let Some(comparison) = Comparison::from_operator(operator) {
        return Ok(DateFilter::Compare(comparison, date_operand(value)?));
    }
    let (from, to) = range_operand(operator, value)?;
    let (from, to) = (date_operand(from)?, date_operand(to)?);
    match operator {
        "between" => Ok(DateFilter::Between(from, to)),
        "not_between" => Ok(DateFilter::NotBetween(from, to)),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

fn range_filter<T>(
    operator: &str,
    value: &Value,
    operand: fn(&Value) -> Result<T, QueryError>,
) -> Result<RangeFilter<T>, QueryError> {
    if let Some(comparison) = Comparison::from_operator(operator) {
        return Ok(RangeFilter::Compare(comparison, operand(value)?));
    }
    let (from, to) = range_operand(operator, value)?;
    let (from, to) = (operand(from)?, operand(to)?);
    match operator {
        "between" => Ok(RangeFilter::Between(from, to)),
        "not_between" => Ok(RangeFilter::NotBetween(from, to)),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

fn array_filter(operator: &str, value: &Value) -> Result<ArrayFilter, QueryError> {
    let values = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        scalar => vec![
            scalar_text(scalar).ok_or_else(|| invalid(operator, "expected a string or list"))?,
        ],
    };
    match operator {
        "contains" | "contains_any" => Ok(ArrayFilter::ContainsAny(values)),
        "not_contains" => Ok(ArrayFilter::NotContains(values)),
        "contains_all" => Ok(ArrayFilter::ContainsAll(values)),
        other => Err(QueryError::UnknownOperator(other.to_string())),
    }
}

fn frontmatter_filter(
    operator: &str,
    value: &Value,
    case_sensitive: bool,
) -> Result<FilterOp, QueryError> {
    match operator {
        "contains_all" | "contains_any" => Ok(FilterOp::Array(array_filter(operator, value)?)),
        "contains" | "not_contains" if value.is_array() => {
            Ok(FilterOp::Array(array_filter(operator, value)?))
        }
        "gt" | "gte" | "lt" | "lte" | "between" | "not_between" => {
            let sample = match value {
                Value::Object(map) => map.get("from").unwrap_or(&Value::Null),
                other => other,
            };
            if sample.is_number() {
                Ok(FilterOp::Number(range_filter(operator, value, number_operand)?))
            } else {
                Ok(FilterOp::Date(date_filter(operator, value)?))
            }
        }
        _ => Ok(FilterOp::Text(text_filter(operator, value, case_sensitive)?)),
    }
}

fn range_operand<'a>(
    operator: &str,
    value: &'a Value,
) -> Result<(&'a Value, &'a Value), QueryError> {
    match value {
        Value::Object(map) => match (map.get("from"), map.get("to")) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(invalid(operator, "expected {from, to}")),
        },
        Value::Array(items) if items.len() == 2 => Ok((&items[0], &items[1])),
        _ => Err(invalid(operator, "expected {from, to}")),
    }
}

fn date_operand(value: &Value) -> Result<DateSpec, QueryError> {
    match value {
        Value::String(s) => DateSpec::parse(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(DateSpec::Absolute)
            .ok_or_else(|| QueryError::InvalidDate(n.to_string())),
        other => Err(QueryError::InvalidDate(other.to_string())),
    }
}

fn size_operand(value: &Value) -> Result<u64, QueryError> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| QueryError::InvalidSize(n.to_string())),
        Value::String(s) => parse_size(s),
        other => Err(QueryError::InvalidSize(other.to_string())),
    }
}

fn number_operand(value: &Value) -> Result<f64, QueryError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid("number", "not representable")),
        Value::String(s) => s.trim().parse().map_err(|_| invalid("number", "expected a number")),
        _ => Err(invalid("number", "expected a number")),
    }
}

fn invalid(operator: &str, reason: &str) -> QueryError {
    QueryError::InvalidOperand { operator: operator.to_string(), reason: reason.to_string() }
}
