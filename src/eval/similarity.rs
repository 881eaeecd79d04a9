//! Text similarity between a ground-truth label and an extracted excerpt.
//!
//! `overlap_score` is the metric success rates are reported with. It is
//! recall against the label: extra text in the prediction costs nothing.
//! The other metrics are symmetric alternatives for comparison runs.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::error::PipelineError;
use crate::utils::collapse_whitespace;

pub const DEFAULT_NGRAM: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Metric {
    /// Share of label sentences found in the prediction.
    #[default]
    Overlap,
    Jaccard,
    Dice,
    Tfidf,
    CharNgram,
}

impl Metric {
    pub fn compute(self, label: &str, predicted: &str) -> Result<f64, PipelineError> {
        ensure_label(label)?;
        Ok(match self {
            Metric::Overlap => overlap_score(label, predicted)?,
            Metric::Jaccard => jaccard(&word_set(label), &word_set(predicted)),
            Metric::Dice => dice(&word_set(label), &word_set(predicted)),
            Metric::Tfidf => tfidf_cosine(label, predicted),
            Metric::CharNgram => char_ngram_jaccard(label, predicted, DEFAULT_NGRAM),
        })
    }
}

fn ensure_label(label: &str) -> Result<(), PipelineError> {
    if label.trim().is_empty() {
        Err(PipelineError::EvaluationInput("label text is empty".to_string()))
    } else {
        Ok(())
    }
}

/// Whitespace-normalized text split on `.`, each chunk trimmed.
pub fn sentence_chunks(text: &str) -> Vec<String> {
    collapse_whitespace(text)
        .split('.')
        .map(|s| s.trim().to_string())
        .collect()
}

/// `|label ∩ predicted| / |label|` over sentence-chunk sets.
pub fn overlap_score(label: &str, predicted: &str) -> Result<f64, PipelineError> {
    ensure_label(label)?;
    let label_chunks: HashSet<String> = sentence_chunks(label).into_iter().collect();
    let predicted_chunks: HashSet<String> = sentence_chunks(predicted).into_iter().collect();
    let shared = label_chunks.intersection(&predicted_chunks).count();
    Ok(shared as f64 / label_chunks.len() as f64)
}

pub fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Sørensen–Dice coefficient.
pub fn dice(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * a.intersection(b).count() as f64 / total as f64
}

/// Cosine similarity of TF-IDF vectors, the two texts forming the corpus.
/// Uses smoothed idf, `ln((1 + n) / (1 + df)) + 1`.
pub fn tfidf_cosine(a: &str, b: &str) -> f64 {
    let tf_a = term_counts(a);
    let tf_b = term_counts(b);
    let n_docs = 2.0;

    let idf = |term: &str| {
        let df = [&tf_a, &tf_b].iter().filter(|tf| tf.contains_key(term)).count() as f64;
        ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
    };

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for term in tf_a.keys().chain(tf_b.keys()).unique() {
        let w = idf(term);
        let x = *tf_a.get(term).unwrap_or(&0) as f64 * w;
        let y = *tf_b.get(term).unwrap_or(&0) as f64 * w;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .counts()
}

/// Jaccard similarity of character n-gram sets.
pub fn char_ngram_jaccard(a: &str, b: &str, n: usize) -> f64 {
    jaccard(&char_ngrams(a, n), &char_ngrams(b, n))
}

fn char_ngrams(text: &str, n: usize) -> HashSet<String> {
    let chars: Vec<char> = collapse_whitespace(text).to_lowercase().chars().collect();
    if n == 0 || chars.len() < n {
        return HashSet::new();
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}
