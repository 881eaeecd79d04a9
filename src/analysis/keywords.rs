use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::calibrate::median;
use super::dataset::LabeledExample;
use super::tagger::Tagger;
use crate::utils::word_count;

const PUNCT_TOKENS: &[&str] = &[".", ",", ":", ";", "-"];

/// `[count, relative_frequency]`, stored as a two-element JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeywordStat(pub usize, pub f64);

impl KeywordStat {
    pub fn count(&self) -> usize {
        self.0
    }

    pub fn weight(&self) -> f64 {
        self.1
    }
}

/// Heading vocabulary of a labeled corpus. Built once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordModel {
    words: BTreeMap<String, KeywordStat>,
}

impl KeywordModel {
    pub fn build(examples: &[LabeledExample], tagger: &dyn Tagger, blacklist: &[String]) -> Self {
        let blacklist: HashSet<String> = blacklist.iter().map(|w| w.to_lowercase()).collect();

        // Two different splits on purpose: space-split word counts feed the
        // median (same split as calibration); tagger tokens feed the tallies.
        let n_words: Vec<f64> = examples
            .iter()
            .map(|ex| word_count(&ex.heading_line) as f64)
            .collect();

        let tallies = examples
            .iter()
            .flat_map(|ex| tagger.tag(&ex.heading_line))
            .filter(|(_, role)| role.is_keyword_role())
            .map(|(token, _)| token.to_lowercase())
            .filter(|token| !PUNCT_TOKENS.contains(&token.as_str()))
            .filter(|token| !blacklist.contains(token))
            .filter(|token| is_keyword_shape(token))
            .counts();

        let median_words = median(&n_words).filter(|m| *m > 0.0).unwrap_or(1.0);
        let words = tallies
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(word, count)| {
                let rel = round2(count as f64 / median_words);
                (word, KeywordStat(count, rel))
            })
            .collect();

        KeywordModel { words }
    }

    pub fn get(&self, word: &str) -> Option<&KeywordStat> {
        self.words.get(word)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeywordStat)> {
        self.words.iter()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let model = serde_json::from_str(&raw).with_context(|| format!("Invalid keyword model {:?}", path))?;
        Ok(model)
    }
}

impl FromIterator<(String, KeywordStat)> for KeywordModel {
    fn from_iter<I: IntoIterator<Item = (String, KeywordStat)>>(iter: I) -> Self {
        KeywordModel {
            words: iter.into_iter().collect(),
        }
    }
}

/// Letters and hyphens only, with at least one letter.
fn is_keyword_shape(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic()) && token.chars().all(|c| c.is_alphabetic() || c == '-')
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
