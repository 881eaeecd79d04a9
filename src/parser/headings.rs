use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::grammar::match_heading;
use crate::analysis::calibrate::CalibrationConstants;
use crate::analysis::keywords::KeywordModel;
use crate::utils::{collapse_whitespace, normalize_token, word_count, WORD_DELIM};

static NO_EDGE_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\D.*\D$").unwrap());

/// Corpus-specific knobs for the repetition and numeric filters.
#[derive(Debug, Clone, Default)]
pub struct HeadingRules {
    /// Keywords allowed to repeat inside a heading block.
    pub repeatable: HashSet<String>,
    /// Lowercase phrases removed before counting repeats.
    pub special_phrases: Vec<String>,
    pub reject_numeric_edges: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingCandidate {
    pub text: String,
    pub block_index: usize,
    /// Block exactly as it appears in the document, for locating it later.
    pub raw_line: String,
}

/// A document block: normalized text for matching plus the untouched original.
#[derive(Debug, Clone)]
pub struct Block<'a> {
    pub text: String,
    pub raw: &'a str,
}

/// Structured documents have one paragraph per line; otherwise paragraphs
/// are separated by blank lines and internal layout is flattened.
pub fn split_blocks(text: &str, structured: bool) -> Vec<Block<'_>> {
    if structured {
        text.split('\n')
            .map(|raw| Block {
                text: raw.to_string(),
                raw,
            })
            .collect()
    } else {
        text.split("\n\n")
            .map(|raw| Block {
                text: collapse_whitespace(raw),
                raw,
            })
            .collect()
    }
}

/// Coarse pass: every block that structurally looks like a heading, in document order.
pub fn detect_candidates(
    text: &str,
    structured: bool,
    constants: &CalibrationConstants,
    model: &KeywordModel,
    rules: &HeadingRules,
) -> Vec<HeadingCandidate> {
    split_blocks(text, structured)
        .into_iter()
        .enumerate()
        .filter_map(|(block_index, block)| {
            heading_of(&block.text, constants, model, rules).map(|text| HeadingCandidate {
                text,
                block_index,
                raw_line: block.raw.to_string(),
            })
        })
        .collect()
}

/// The heading carried by `block`, if it passes every filter.
pub fn heading_of(
    block: &str,
    constants: &CalibrationConstants,
    model: &KeywordModel,
    rules: &HeadingRules,
) -> Option<String> {
    let section = block.trim();
    let title = match_heading(section)?.text.trim();

    if word_count(title) >= constants.max_heading_words {
        return None;
    }
    if title.ends_with(['.', ',', '-']) {
        return None;
    }
    if rules.reject_numeric_edges && !NO_EDGE_DIGIT_RE.is_match(title) {
        return None;
    }
    if has_repeated_keyword(title, section, model, rules) {
        return None;
    }
    Some(title.to_string())
}

/// Running headers and boilerplate repeat their keywords within one block;
/// real headings rarely do.
fn has_repeated_keyword(title: &str, block: &str, model: &KeywordModel, rules: &HeadingRules) -> bool {
    let mut lowered = block.to_lowercase();
    for phrase in &rules.special_phrases {
        lowered = lowered.replace(phrase.as_str(), "");
    }
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for word in lowered.split_whitespace() {
        *occurrences.entry(normalize_token(word)).or_default() += 1;
    }

    title
        .split(WORD_DELIM)
        .map(|w| normalize_token(w).to_lowercase())
        .filter(|w| !w.is_empty())
        .any(|w| {
            occurrences.get(&w).copied().unwrap_or(0) > 1
                && model.contains(&w)
                && !rules.repeatable.contains(&w)
        })
}
