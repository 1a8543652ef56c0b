//! Glob-style resource name patterns.

use std::iter::Peekable;
use std::str::Chars;

use regex::Regex;

use crate::error::CallError;

/// A compiled glob matched against whole names.
///
/// Supports `*`, `?`, `[abc]`, `[a-z]` and `[!abc]`; every other character
/// matches itself.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(glob: &str) -> Result<Self, CallError> {
        let regex = Regex::new(&translate(glob)).map_err(|e| {
            CallError::configuration(vec![format!("pattern '{glob}' is invalid: {e}")])
        })?;
        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn translate(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut lookahead = chars.clone();
                match translate_class(&mut lookahead) {
                    Some(class) => {
                        out.push_str(&class);
                        chars = lookahead;
                    }
                    None => out.push_str(r"\["),
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

/// The regex class for a bracket expression whose `[` was just consumed, or
/// `None` when it never closes. A `]` right after `[` or `[!` is a member.
fn translate_class(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut out = String::from("[");
    if chars.next_if_eq(&'!').is_some() {
        out.push('^');
    }

    let mut members = Vec::new();
    loop {
        let c = chars.next()?;
        if c == ']' && !members.is_empty() {
            break;
        }
        members.push(c);
    }

    let mut i = 0;
    while i < members.len() {
        if i + 2 < members.len() && members[i + 1] == '-' {
            push_member(&mut out, members[i]);
            out.push('-');
            push_member(&mut out, members[i + 2]);
            i += 3;
        } else {
            push_member(&mut out, members[i]);
            i += 1;
        }
    }
    out.push(']');
    Some(out)
}

fn push_member(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_extension() {
        let pattern = Pattern::new("*.txt").unwrap();
        assert!(pattern.matches("test1.txt"));
        assert!(!pattern.matches("test1.txt.bak"));
        assert!(!pattern.matches("test1.xml"));
    }

    #[test]
    fn dots_are_literal() {
        let pattern = Pattern::new("a.b").unwrap();
        assert!(pattern.matches("a.b"));
        assert!(!pattern.matches("axb"));
    }

    #[test]
    fn question_mark_and_classes() {
        let pattern = Pattern::new("test?.[tx]xt").unwrap();
        assert!(pattern.matches("test1.txt"));
        assert!(pattern.matches("test2.xxt"));
        assert!(!pattern.matches("test10.txt"));
    }

    #[test]
    fn negated_class() {
        let pattern = Pattern::new("[!a]*").unwrap();
        assert!(pattern.matches("b.txt"));
        assert!(!pattern.matches("a.txt"));
    }

    #[test]
    fn plain_name_matches_only_itself() {
        let pattern = Pattern::new("report.csv").unwrap();
        assert!(pattern.matches("report.csv"));
        assert!(!pattern.matches("old-report.csv"));
    }

    #[test]
    fn unclosed_class_is_literal() {
        let pattern = Pattern::new("a[b").unwrap();
        assert!(pattern.matches("a[b"));
        assert!(Pattern::new("[]").unwrap().matches("[]"));
        assert!(Pattern::new("[!]").unwrap().matches("[!]"));
    }

    #[test]
    fn leading_bracket_is_a_member() {
        let pattern = Pattern::new("[]a].txt").unwrap();
        assert!(pattern.matches("].txt"));
        assert!(pattern.matches("a.txt"));
        assert!(!Pattern::new("[!]]").unwrap().matches("]"));
    }

    #[test]
    fn class_operators_are_literal() {
        let pattern = Pattern::new("[a&&b~~]").unwrap();
        assert!(pattern.matches("&"));
        assert!(pattern.matches("~"));
        assert!(pattern.matches("b"));
        assert!(!pattern.matches("c"));

        let dashes = Pattern::new("[-x-]").unwrap();
        assert!(dashes.matches("-"));
        assert!(dashes.matches("x"));
        assert!(Pattern::new("[a-c]").unwrap().matches("b"));
    }
}
