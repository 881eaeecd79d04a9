use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::analysis::calibrate::{CalibrationConstants, IqrFactors};
use crate::parser::headings::HeadingRules;
use crate::parser::section::ExtractUnit;

pub const DEFAULT_CONFIG_FILE: &str = "filing_sections.toml";

/// Every tunable of the pipeline. Defaults mirror the corpus the tool was
/// first tuned on; calibration replaces the two size thresholds per corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_heading_words: usize,
    pub max_section_units: usize,
    pub heading_iqr_factor: f64,
    pub section_iqr_factor: f64,
    pub top_n: usize,
    pub success_threshold: f64,
    pub toc_skip_chars: usize,
    pub unit_chars: usize,
    pub unit: ExtractUnit,
    pub blacklist: Vec<String>,
    pub repeatable_keywords: Vec<String>,
    pub special_phrases: Vec<String>,
    pub reject_numeric_edges: bool,
    pub label_word: String,
    pub extensions: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_heading_words: 14,
            max_section_units: 673,
            heading_iqr_factor: 2.5,
            section_iqr_factor: 3.5,
            top_n: 20,
            success_threshold: 0.7,
            toc_skip_chars: 10_000,
            unit_chars: 100,
            unit: ExtractUnit::Line,
            blacklist: strings(&["continue", "cont.", "continued"]),
            repeatable_keywords: strings(&["advisory", "agreement", "agreements", "management"]),
            special_phrases: strings(&["investment advisory", "investment sub-advisory"]),
            reject_numeric_edges: true,
            label_word: "Extracted".to_string(),
            extensions: strings(&[".txt"]),
        }
    }
}

impl Settings {
    /// Defaults, then the optional config file, then `TEA_*` environment overrides.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let env = Environment::with_prefix("TEA")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("blacklist")
            .with_list_parse_key("repeatable_keywords")
            .with_list_parse_key("special_phrases")
            .with_list_parse_key("extensions");

        let settings: Settings = Config::builder()
            .add_source(file_source)
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings)
    }

    /// Constants used when no calibration has been persisted yet.
    pub fn default_constants(&self) -> CalibrationConstants {
        CalibrationConstants {
            max_heading_words: self.max_heading_words,
            max_section_units: self.max_section_units,
        }
    }

    pub fn iqr_factors(&self) -> IqrFactors {
        IqrFactors {
            heading: self.heading_iqr_factor,
            section: self.section_iqr_factor,
        }
    }

    pub fn heading_rules(&self) -> HeadingRules {
        HeadingRules {
            repeatable: self.repeatable_keywords.iter().map(|w| w.to_lowercase()).collect(),
            special_phrases: self.special_phrases.iter().map(|p| p.to_lowercase()).collect(),
            reject_numeric_edges: self.reject_numeric_edges,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_tuned_corpus() {
        let s = Settings::default();
        assert_eq!(s.top_n, 20);
        assert_eq!(s.max_heading_words, 14);
        assert_eq!(s.max_section_units, 673);
        assert!(s.repeatable_keywords.contains(&"agreement".to_string()));
        assert_eq!(s.success_threshold, 0.7);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "top_n = 5\nunit = \"sentence\"\nspecial_phrases = [\"sub-advisory agreement\"]").unwrap();
        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.top_n, 5);
        assert_eq!(s.unit, ExtractUnit::Sentence);
        assert_eq!(s.special_phrases, vec!["sub-advisory agreement".to_string()]);
        // untouched keys keep their defaults
        assert_eq!(s.toc_skip_chars, 10_000);
    }
}
