//! Small text helpers shared across the analysis and parser passes.

use regex::Regex;
use std::sync::OnceLock;

/// Word delimiter used for every "how long is this heading" question.
/// Deliberately a single space, not general whitespace: calibrated
/// thresholds are measured with this split, so the detector must use it too.
pub const WORD_DELIM: char = ' ';

/// Sentence delimiter for sentence-unit extraction.
pub const SENTENCE_DELIM: &str = ". ";

/// Number of words in `text` under the single-space split. Empty text has zero words.
pub fn word_count(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split(WORD_DELIM).count()
    }
}

/// Strip surrounding punctuation from a token, keeping inner hyphens and apostrophes.
pub fn normalize_token(token: &str) -> String {
    token
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
        .to_string()
}

/// Replace tabs/newlines with spaces and squeeze runs of whitespace.
pub fn collapse_whitespace(text: &str) -> String {
    static CONTROL_RE: OnceLock<Regex> = OnceLock::new();
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();
    let control = CONTROL_RE.get_or_init(|| Regex::new(r"[\n\t\r]").unwrap());
    let space = SPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let flat = control.replace_all(text, " ");
    space.replace_all(&flat, " ").into_owned()
}

/// First `n` characters of `text` (not bytes).
pub fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

pub fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_uses_single_spaces() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("management fee"), 2);
        // a double space yields an empty piece, as the calibration split does
        assert_eq!(word_count("management  fee"), 3);
    }

    #[test]
    fn normalize_strips_edges_only() {
        assert_eq!(normalize_token("agreement:"), "agreement");
        assert_eq!(normalize_token("(sub-advisory)"), "sub-advisory");
        assert_eq!(normalize_token("-"), "");
        assert_eq!(normalize_token("adviser's"), "adviser's");
    }

    #[test]
    fn collapse_flattens_layout() {
        assert_eq!(collapse_whitespace("a\tb\n\nc   d"), "a b c d");
    }

    #[test]
    fn take_chars_respects_char_boundaries() {
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("abc", 10), "abc");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("Termination", 4), "Term...");
        assert_eq!(truncate("Fee", 4), "Fee");
    }
}
