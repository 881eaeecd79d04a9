pub mod grammar;
pub mod headings;
pub mod ranking;
pub mod section;

use crate::analysis::calibrate::CalibrationConstants;
use crate::analysis::keywords::KeywordModel;
use crate::analysis::CorpusProfile;
use crate::corpus::Document;
use crate::error::PipelineError;
use crate::settings::Settings;
use headings::{HeadingCandidate, HeadingRules};
use ranking::ScoredCandidate;
use section::ExtractUnit;

/// Per-run extraction options, fixed for the whole batch.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub rules: HeadingRules,
    pub top_n: usize,
    pub unit: ExtractUnit,
    pub unit_chars: usize,
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        PipelineOptions {
            rules: settings.heading_rules(),
            top_n: settings.top_n,
            unit: settings.unit,
            unit_chars: settings.unit_chars,
        }
    }
}

/// Coarse candidates in document order plus the ranked top-N.
#[derive(Debug, Clone)]
pub struct Detection {
    pub candidates: Vec<HeadingCandidate>,
    pub ranked: Vec<ScoredCandidate>,
}

impl Detection {
    pub fn texts(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub chosen_heading: String,
    pub heading_score: f64,
    pub block_index: usize,
    pub section_text: String,
}

pub fn detect(
    text: &str,
    structured: bool,
    constants: &CalibrationConstants,
    model: &KeywordModel,
    rules: &HeadingRules,
    top_n: usize,
) -> Detection {
    let candidates = headings::detect_candidates(text, structured, constants, model, rules);
    let ranked = ranking::score_and_rank(candidates.clone(), model, top_n);
    Detection { candidates, ranked }
}

/// detect → rank → select → extract for one document.
pub fn process_document(
    doc: &Document,
    profile: &CorpusProfile,
    opts: &PipelineOptions,
) -> Result<(ExtractionResult, Detection), PipelineError> {
    let detection = detect(
        &doc.text,
        doc.structured,
        &profile.constants,
        &profile.model,
        &opts.rules,
        opts.top_n,
    );
    let winner = ranking::select_winner(&detection.ranked)?;
    let section_text = section::extract(
        &doc.text,
        &winner.candidate.raw_line,
        &profile.constants,
        opts.unit,
        opts.unit_chars,
    )?;

    let result = ExtractionResult {
        chosen_heading: winner.candidate.text.clone(),
        heading_score: winner.score,
        block_index: winner.candidate.block_index,
        section_text: section_text.to_string(),
    };
    Ok((result, detection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::keywords::KeywordStat;

    fn profile(units: usize) -> CorpusProfile {
        CorpusProfile {
            constants: CalibrationConstants {
                max_heading_words: 8,
                max_section_units: units,
            },
            model: [
                ("agreement".to_string(), KeywordStat(4, 1.6)),
                ("advisory".to_string(), KeywordStat(3, 1.2)),
                ("investment".to_string(), KeywordStat(2, 0.8)),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn options() -> PipelineOptions {
        PipelineOptions {
            rules: Settings::default().heading_rules(),
            top_n: 20,
            unit: ExtractUnit::Line,
            unit_chars: 100,
        }
    }

    fn document(text: &str, structured: bool) -> Document {
        Document {
            id: "doc".into(),
            text: text.into(),
            structured,
        }
    }

    #[test]
    fn earliest_of_tied_headings_is_extracted() {
        let text = "Table of Contents\n\
                    Investment Advisory Agreement:\n\
                    The Adviser furnishes a continuous investment program.\n\
                    Custodian\n\
                    Investment Advisory Agreement:\n\
                    A copy is on file.";
        let (result, detection) = process_document(&document(text, true), &profile(1), &options()).unwrap();
        let tied: Vec<_> = detection
            .candidates
            .iter()
            .filter(|c| c.text == "Investment Advisory Agreement:")
            .collect();
        assert_eq!(tied.len(), 2);
        assert_eq!(result.block_index, 1);
        assert_eq!(result.chosen_heading, "Investment Advisory Agreement:");
        assert!(result.section_text.starts_with("Investment Advisory Agreement:\nThe Adviser"));
        assert_eq!(result.section_text.chars().count(), 100);
    }

    #[test]
    fn document_without_headings_is_skipped() {
        let text = "The fund pays fees.\n\nThe adviser is paid monthly.";
        let err = process_document(&document(text, false), &profile(1), &options()).unwrap_err();
        assert!(matches!(err, PipelineError::NoCandidateFound));
    }

    #[test]
    fn detection_keeps_normalized_and_raw_text() {
        let text = "Advisory\n  Agreement\n\nbody text here.";
        let d = detect(text, false, &profile(1).constants, &profile(1).model, &options().rules, 20);
        assert_eq!(d.texts(), vec!["Advisory Agreement"]);
        assert_eq!(d.candidates[0].raw_line, "Advisory\n  Agreement");
    }

    #[test]
    fn fixture_filing_finds_advisory_section() {
        let raw = std::fs::read_to_string("tests/fixtures/advisory_filing.txt").unwrap();
        let doc = Document::prepare("advisory_filing", &raw, 0);
        let (result, _) = process_document(&doc, &profile(4), &options()).unwrap();
        assert_eq!(result.chosen_heading, "Investment Advisory Agreement");
        assert!(result.section_text.starts_with("Investment Advisory Agreement\n\nThe Adviser"));
        assert!(result.section_text.contains("Board of Trustees"));
    }
}
