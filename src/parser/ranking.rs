use itertools::Itertools;

use super::headings::HeadingCandidate;
use crate::analysis::keywords::KeywordModel;
use crate::error::PipelineError;
use crate::utils::{normalize_token, WORD_DELIM};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: HeadingCandidate,
    pub score: f64,
}

/// Sum of keyword weight times occurrences, over heading words the model knows.
///
/// Words are looked up with edge punctuation stripped, so `Agreement:` in a
/// fragment heading earns the same weight as a plain `Agreement`.
pub fn score(title: &str, model: &KeywordModel) -> f64 {
    let total: f64 = title
        .split(WORD_DELIM)
        .filter(|w| !matches!(w.trim(), "-" | "."))
        .map(|w| normalize_token(w).to_lowercase())
        .filter(|w| model.contains(w))
        .counts()
        .into_iter()
        .filter_map(|(word, count)| model.get(&word).map(|stat| stat.weight() * count as f64))
        .sum();
    (total * 100.0).round() / 100.0
}

/// Fine-grain pass: score, sort best first (stable, so earlier blocks win
/// ties), keep the top `top_n`.
pub fn score_and_rank(
    candidates: Vec<HeadingCandidate>,
    model: &KeywordModel,
    top_n: usize,
) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let score = score(&candidate.text, model);
            ScoredCandidate { candidate, score }
        })
        .sorted_by(|a, b| b.score.total_cmp(&a.score))
        .take(top_n)
        .collect()
}

/// Highest score wins; on a tie the earliest block wins, since later
/// repeats tend to be table-of-contents or cross-reference echoes.
pub fn select_winner(ranked: &[ScoredCandidate]) -> Result<&ScoredCandidate, PipelineError> {
    ranked
        .iter()
        .max_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(b.candidate.block_index.cmp(&a.candidate.block_index))
        })
        .ok_or(PipelineError::NoCandidateFound)
}
