//! Heading shapes as named rules.
//!
//! A heading starts with a word character and continues with word
//! characters, spaces and `( ) & , ' ’ -`. Two rules use that body:
//!
//! * `Full`: the whole line is the body, optionally closed by a
//!   parenthetical and a single `:` or `;`.
//! * `Fragment`: the body runs up to a `:` and inline text follows it.
//!
//! `Full` is always tried first; `Fragment` only for lines not ending in `.`.

use std::sync::LazyLock;

use regex::Regex;

static FULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\w[\w ()&,'’-]+(?:\(\w*\))?[:;]?$").unwrap());
static FRAGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\w[\w ()&,'’-]+:").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Full,
    Fragment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch<'a> {
    pub shape: Shape,
    pub text: &'a str,
}

pub fn match_full(line: &str) -> Option<&str> {
    FULL_RE.find(line).map(|m| m.as_str())
}

pub fn match_fragment(line: &str) -> Option<&str> {
    FRAGMENT_RE.find(line).map(|m| m.as_str())
}

/// Apply the rules in precedence order to an already trimmed line.
pub fn match_heading(line: &str) -> Option<HeadingMatch<'_>> {
    if let Some(text) = match_full(line) {
        return Some(HeadingMatch {
            shape: Shape::Full,
            text,
        });
    }
    if line.is_empty() || line.ends_with('.') {
        return None;
    }
    match_fragment(line).map(|text| HeadingMatch {
        shape: Shape::Fragment,
        text,
    })
}
