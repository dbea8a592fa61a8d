//! Compiled text patterns used by query predicates.

use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};

use super::QueryError;

/// A regular expression operand.
///
/// An operand that fails to compile never matches. The failure is logged once,
/// here, and the query that carries it still evaluates.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    source: String,
    regex: Option<Regex>,
}

impl RegexPattern {
    /// Case-sensitive pattern.
    pub fn new(source: &str) -> Self {
        Self::build(source, false)
    }

    pub fn case_insensitive(source: &str) -> Self {
        Self::build(source, true)
    }

    fn build(source: &str, case_insensitive: bool) -> Self {
        let regex = match RegexBuilder::new(source).case_insensitive(case_insensitive).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                let err = QueryError::InvalidRegex {
                    pattern: source.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!("{err}; predicate will match nothing");
                None
            }
        };
        Self { source: source.to_string(), regex }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
    }
}

/// A path glob matched against `/`-separated relative paths.
///
/// `*` and `?` stay within one path segment, `**` crosses segments, and
/// `**/` also matches zero segments. `[...]` and `[!...]` classes follow
/// [`glob::Pattern`]. On top of that, `{a,b}` expands to alternatives and
/// `\` escapes the next character. A glob that fails to compile never
/// matches.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobPattern {
    source: String,
    alternatives: Vec<Pattern>,
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl GlobPattern {
    pub fn new(glob: &str) -> Self {
        let compiled: Result<Vec<Pattern>, _> =
            expand_braces(glob).iter().map(|alt| Pattern::new(&escape_to_classes(alt))).collect();

        let alternatives = match compiled {
            Ok(alternatives) => alternatives,
            Err(e) => {
                let err =
                    QueryError::InvalidGlob { pattern: glob.to_string(), reason: e.to_string() };
                tracing::warn!("{err}; predicate will match nothing");
                Vec::new()
            }
        };
        Self { source: glob.to_string(), alternatives }
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.alternatives.iter().any(|p| p.matches_with(path, GLOB_OPTIONS))
    }

    pub fn is_valid(&self) -> bool {
        !self.alternatives.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Expand the first top-level `{a,b}` group, recursively. Escaped braces and
/// unbalanced groups stay literal.
fn expand_braces(glob: &str) -> Vec<String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut open = None;
    let mut depth = 0usize;
    let mut splits = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                if depth == 0 {
                    open = Some(i);
                    splits.clear();
                }
                depth += 1;
            }
            ',' if depth == 1 => splits.push(i),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(start) = open
                {
                    let prefix: String = chars[..start].iter().collect();
                    let suffix: String = chars[i + 1..].iter().collect();
                    let mut bounds = vec![start];
                    bounds.extend(&splits);
                    bounds.push(i);

                    return bounds
                        .windows(2)
                        .flat_map(|w| {
                            let alt: String = chars[w[0] + 1..w[1]].iter().collect();
                            expand_braces(&format!("{prefix}{alt}{suffix}"))
                        })
                        .collect();
                }
            }
            _ => {}
        }
        i += 1;
    }
    vec![escape_braces(glob)]
}

/// Mark leftover braces as escaped so they match literally.
fn escape_braces(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len());
    let mut escaped = false;
    for c in glob.chars() {
        if !escaped && matches!(c, '{' | '}') {
            out.push('\\');
        }
        escaped = !escaped && c == '\\';
        out.push(c);
    }
    out
}

/// Drop `\` escapes, rewriting escaped glob metacharacters as single-member
/// classes such as `[*]`. Backslashes inside a class are left alone.
fn escape_to_classes(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => match chars.get(i + 1) {
                Some(&next) if matches!(next, '*' | '?' | '[' | ']') => {
                    out.push('[');
                    out.push(next);
                    out.push(']');
                    i += 2;
                    continue;
                }
                Some(&next) => {
                    out.push(next);
                    i += 2;
                    continue;
                }
                None => out.push('\\'),
            },
            '[' => {
                let end = class_end(&chars, i);
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
            c => out.push(c),
        }
        i += 1;
    }
    out
}

/// Index just past the class starting at `start`, or `start + 1` when the
/// bracket is unclosed. A `]` right after `[` or `[!` is a member.
fn class_end(chars: &[char], start: usize) -> usize {
    let mut i = start + 1;
    if chars.get(i) == Some(&'!') {
        i += 1;
    }
    i += 1;
    while i < chars.len() {
        if chars[i] == ']' {
            return i + 1;
        }
        i += 1;
    }
    start + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("posts/**", "posts/x.md", true)]
    #[case("posts/**", "posts/sub/y.md", true)]
    #[case("posts/**", "postscript/z.md", false)]
    #[case("*.md", "a.md", true)]
    #[case("*.md", "dir/a.md", false)]
    #[case("**/*.md", "a.md", true)]
    #[case("**/*.md", "x/y/a.md", true)]
    #[case("notes/*/index.md", "notes/2024/index.md", true)]
    #[case("notes/*/index.md", "notes/2024/01/index.md", false)]
    #[case("draft?.md", "draft1.md", true)]
    #[case("draft?.md", "draft/.md", false)]
    #[case("[ab]*.md", "beta.md", true)]
    #[case("[!ab]*.md", "beta.md", false)]
    #[case("{posts,pages}/*.md", "pages/about.md", true)]
    #[case("{posts,pages}/*.md", "drafts/about.md", false)]
    #[case("a+b (1).md", "a+b (1).md", true)]
    #[case(r"\*.md", "*.md", true)]
    #[case(r"\*.md", "a.md", false)]
    #[case(r"why\?.md", "why?.md", true)]
    #[case(r"why\?.md", "whyx.md", false)]
    #[case("[[]x].md", "[x].md", true)]
    #[case("[!]]*.md", "a].md", true)]
    #[case("[!]]*.md", "]a.md", false)]
    #[case(r"\{a,b}.md", "{a,b}.md", true)]
    #[case(r"\{a,b}.md", "a.md", false)]
    #[case("{a,b/{c,d}}.md", "b/d.md", true)]
    #[case("{a,b/{c,d}}.md", "b.md", false)]
    #[case("{open.md", "{open.md", true)]
    #[case(r"\!note.md", "!note.md", true)]
    fn glob_matching(#[case] glob: &str, #[case] path: &str, #[case] expected: bool) {
        assert_eq!(GlobPattern::new(glob).is_match(path), expected, "{glob} vs {path}");
    }

    #[test]
    fn invalid_glob_never_matches() {
        let pattern = GlobPattern::new("a**b/*.md");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("a**b/x.md"));
        assert!(!pattern.is_match("ab/x.md"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let pattern = RegexPattern::new("(unclosed");
        assert!(!pattern.is_valid());
        assert!(!pattern.is_match("(unclosed"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn regex_case_sensitivity() {
        assert!(!RegexPattern::new("todo").is_match("TODO: write"));
        assert!(RegexPattern::case_insensitive("todo").is_match("TODO: write"));
    }
}
