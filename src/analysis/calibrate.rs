//! Corpus-derived size thresholds.
//!
//! Statistics get noisy below roughly ten labeled examples; calibration
//! still returns a value, it is just less trustworthy.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::dataset::LabeledExample;
use crate::utils::word_count;

/// Characters per section unit.
pub const SECTION_UNIT_CHARS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    /// Headings must have strictly fewer words than this.
    pub max_heading_words: usize,
    /// Section size limit, in 100-character units (or sentences in sentence mode).
    pub max_section_units: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFactors {
    pub heading: f64,
    pub section: f64,
}

impl Default for IqrFactors {
    fn default() -> Self {
        IqrFactors {
            heading: 2.5,
            section: 3.5,
        }
    }
}

/// Derive both thresholds from the corpus. `None` only for an empty corpus,
/// where there is no distribution to measure.
pub fn calibrate_with(examples: &[LabeledExample], factors: IqrFactors) -> Option<CalibrationConstants> {
    if examples.is_empty() {
        warn!("calibration requested on an empty corpus");
        return None;
    }
    if examples.len() < 10 {
        warn!(examples = examples.len(), "small corpus, calibrated thresholds may be unstable");
    }

    let heading_words: Vec<f64> = examples
        .iter()
        .map(|ex| word_count(&ex.heading_line) as f64)
        .collect();
    let body_chars: Vec<f64> = examples
        .iter()
        .map(|ex| ex.body_text.chars().count() as f64)
        .collect();

    let heading_bound = upper_bound(&heading_words, factors.heading)?;
    let section_bound = upper_bound(&body_chars, factors.section)?;

    Some(CalibrationConstants {
        // counts are compared with `<`, so ceil keeps the exact float cut-off
        max_heading_words: heading_bound.max(0.0).ceil() as usize,
        max_section_units: (section_bound.max(0.0) / SECTION_UNIT_CHARS).round() as usize,
    })
}

/// Outlier-trimmed maximum: `Q3 + factor * (Q3 - Q1)`.
pub fn upper_bound(values: &[f64], factor: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    Some(q3 + factor * (q3 - q1))
}

/// Linear-interpolated quantile over already sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile(&sorted, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(heading: &str, body_len: usize) -> LabeledExample {
        LabeledExample {
            file_id: heading.to_string(),
            heading_line: heading.to_string(),
            closing_line: None,
            body_text: "x".repeat(body_len),
        }
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&v, 0.75), Some(3.25));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
    }

    #[test]
    fn three_heading_corpus() {
        let corpus = vec![
            example("investment advisory agreement", 500),
            example("management fee", 1000),
            example("termination", 2000),
        ];
        let c = calibrate_with(&corpus, IqrFactors::default()).unwrap();
        // words 1,2,3: Q1=1.5 Q3=2.5 -> 2.5 + 2.5 * 1 = 5
        assert_eq!(c.max_heading_words, 5);
        // chars 500,1000,2000: Q1=750 Q3=1500 -> 1500 + 3.5 * 750 = 4125
        assert_eq!(c.max_section_units, 41);
        assert!(c.max_heading_words >= 3);
        assert!(c.max_section_units >= 5);
    }

    #[test]
    fn empty_headings_count_as_zero_words() {
        let corpus = vec![example("", 100), example("", 100), example("fee", 100)];
        let heading_words: Vec<f64> = corpus.iter().map(|e| word_count(&e.heading_line) as f64).collect();
        assert_eq!(heading_words, vec![0.0, 0.0, 1.0]);
        assert!(calibrate_with(&corpus, IqrFactors::default()).is_some());
    }

    #[test]
    fn thresholds_grow_with_factor() {
        let corpus: Vec<_> = (1..12)
            .map(|i| example(&"word ".repeat(i).trim().to_string(), i * 173))
            .collect();
        let mut prev = CalibrationConstants {
            max_heading_words: 0,
            max_section_units: 0,
        };
        for factor in [0.0, 0.5, 1.5, 2.5, 3.5, 6.0] {
            let c = calibrate_with(&corpus, IqrFactors { heading: factor, section: factor }).unwrap();
            assert!(c.max_heading_words >= prev.max_heading_words);
            assert!(c.max_section_units >= prev.max_section_units);
            prev = c;
        }
    }

    #[test]
    fn empty_corpus_has_no_constants() {
        assert_eq!(calibrate_with(&[], IqrFactors::default()), None);
    }
}
