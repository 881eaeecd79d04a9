use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::analysis::calibrate::CalibrationConstants;
use crate::error::PipelineError;
use crate::utils::{take_chars, SENTENCE_DELIM};

/// Three leading words, then words or hyphen continuations.
static MIN_SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+\s\w+\s\w+\s?)((\w+|-)\s?)*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractUnit {
    /// `max_section_units` blocks of `unit_chars` characters.
    #[default]
    Line,
    /// `max_section_units` qualifying sentences.
    Sentence,
}

/// Cut the section that starts at the first occurrence of `raw_line`.
pub fn extract<'a>(
    text: &'a str,
    raw_line: &str,
    constants: &CalibrationConstants,
    unit: ExtractUnit,
    unit_chars: usize,
) -> Result<&'a str, PipelineError> {
    let start = text
        .find(raw_line)
        .filter(|_| !raw_line.is_empty())
        .ok_or_else(|| PipelineError::HeadingNotLocated {
            heading: raw_line.to_string(),
        })?;
    let rest = &text[start..];

    Ok(match unit {
        ExtractUnit::Line => take_chars(rest, unit_chars * constants.max_section_units),
        ExtractUnit::Sentence => take_sentences(rest, constants.max_section_units),
    })
}

/// Prefix of `text` as long as the first `limit` sentence-shaped chunks
/// plus one character each. Chunks that are too short to count add nothing
/// to the length, so the cut can fall before the last counted sentence.
fn take_sentences(text: &str, limit: usize) -> &str {
    let mut counted = 0;
    let mut span = 0;
    for chunk in text.split(SENTENCE_DELIM) {
        if counted == limit {
            break;
        }
        if MIN_SENTENCE_RE.is_match(chunk) {
            counted += 1;
            span += chunk.chars().count() + 1;
        }
    }
    take_chars(text, span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constants(units: usize) -> CalibrationConstants {
        CalibrationConstants {
            max_heading_words: 14,
            max_section_units: units,
        }
    }

    #[test]
    fn line_mode_takes_fixed_characters() {
        let text = format!("preamble\nManagement Fee\n{}", "x".repeat(500));
        let excerpt = extract(&text, "Management Fee", &constants(3), ExtractUnit::Line, 100).unwrap();
        assert_eq!(excerpt.chars().count(), 300);
        assert!(excerpt.starts_with("Management Fee"));
    }

    #[test]
    fn line_mode_clips_at_document_end() {
        let text = "Termination\nEither party may terminate.";
        let excerpt = extract(text, "Termination", &constants(3), ExtractUnit::Line, 100).unwrap();
        assert_eq!(excerpt, text);
        assert!(excerpt.chars().count() <= 300);
    }

    #[test]
    fn first_occurrence_wins() {
        let text = "Fees\nfirst body\nFees\nsecond body";
        let excerpt = extract(text, "Fees", &constants(1), ExtractUnit::Line, 10).unwrap();
        assert_eq!(excerpt, "Fees\nfirst");
    }

    #[test]
    fn sentence_mode_counts_qualifying_sentences() {
        let text = "Fees. The fund pays monthly. Rates vary. The adviser waives fees. Tail text here.";
        let excerpt = extract(text, "The fund", &constants(2), ExtractUnit::Sentence, 100).unwrap();
        // 21 + 1 for the first sentence, 23 + 1 for the third; "Rates vary" adds nothing
        assert_eq!(excerpt.chars().count(), 46);
        assert_eq!(excerpt, "The fund pays monthly. Rates vary. The adviser");
    }

    #[test]
    fn short_chunks_do_not_lengthen_the_excerpt() {
        let text = "Heading line here. Short. The fund pays monthly. More words here ok.";
        let excerpt = extract(text, "Heading", &constants(2), ExtractUnit::Sentence, 100).unwrap();
        assert_eq!(excerpt, "Heading line here. Short. The fund pays ");
    }

    #[test]
    fn sentence_mode_runs_to_end_when_short() {
        let text = "The fund pays monthly. The adviser waives fees";
        let excerpt = extract(text, "The fund", &constants(5), ExtractUnit::Sentence, 100).unwrap();
        assert_eq!(excerpt, text);
    }

    #[test]
    fn missing_heading_is_reported() {
        let err = extract("body text", "Advisory Agreement", &constants(3), ExtractUnit::Line, 100).unwrap_err();
        assert!(matches!(err, PipelineError::HeadingNotLocated { .. }));
    }
}
