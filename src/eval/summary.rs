use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::analysis::calibrate::quantile;

/// Headline bar reported next to the configured threshold.
pub const HIGH_BAR: f64 = 0.9;

/// Distribution of per-document similarity scores for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
    /// Percent of documents scoring at least 0.9.
    pub pct_high: f64,
    /// Percent of documents scoring at least `threshold`.
    pub pct_threshold: f64,
    pub threshold: f64,
}

impl ScoreSummary {
    /// `None` when no document was scored.
    pub fn from_scores(scores: &[f64], threshold: f64) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let sorted: Vec<f64> = scores.iter().copied().sorted_by(|a, b| a.total_cmp(b)).collect();
        let count = sorted.len();
        Some(ScoreSummary {
            count,
            mean: sorted.iter().sum::<f64>() / count as f64,
            median: quantile(&sorted, 0.5)?,
            mode: mode(&sorted)?,
            q1: quantile(&sorted, 0.25)?,
            q3: quantile(&sorted, 0.75)?,
            min: sorted[0],
            max: sorted[count - 1],
            pct_high: percent(sorted.iter().filter(|s| **s >= HIGH_BAR).count(), count),
            pct_threshold: percent(sorted.iter().filter(|s| **s >= threshold).count(), count),
            threshold,
        })
    }

    /// Documents below the threshold, on the same 0..1 scale the scores use.
    pub fn failing<'a, T: 'a>(scored: &'a [(T, f64)], threshold: f64) -> impl Iterator<Item = &'a T> + 'a {
        scored.iter().filter(move |(_, s)| *s < threshold).map(|(id, _)| id)
    }
}

/// Most frequent value; the smallest one wins ties.
fn mode(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let run = sorted[i..].iter().take_while(|v| **v == sorted[i]).count().max(1);
        if best.map_or(true, |(_, n)| run > n) {
            best = Some((sorted[i], run));
        }
        i += run;
    }
    best.map(|(value, _)| value)
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SUMMARY STATISTICS ({} scored, 0-100 scale)", self.count)?;
        writeln!(f, "  mean     {:.2}", self.mean * 100.0)?;
        writeln!(f, "  median   {:.2}", self.median * 100.0)?;
        writeln!(f, "  mode     {:.2}", self.mode * 100.0)?;
        writeln!(f, "  q1       {:.2}", self.q1 * 100.0)?;
        writeln!(f, "  q3       {:.2}", self.q3 * 100.0)?;
        writeln!(f, "  min      {:.2}", self.min * 100.0)?;
        writeln!(f, "  max      {:.2}", self.max * 100.0)?;
        writeln!(f, "  success >= {:.0}%: {:.2}%", HIGH_BAR * 100.0, self.pct_high)?;
        write!(f, "  success >= {:.0}%: {:.2}%", self.threshold * 100.0, self.pct_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_run_has_no_summary() {
        assert!(ScoreSummary::from_scores(&[], 0.7).is_none());
    }

    #[test]
    fn summary_of_mixed_scores() {
        let scores = [1.0, 0.5, 1.0, 0.8, 0.2];
        let s = ScoreSummary::from_scores(&scores, 0.7).unwrap();
        assert_eq!(s.count, 5);
        assert!((s.mean - 0.7).abs() < 1e-9);
        assert_eq!(s.median, 0.8);
        assert_eq!(s.mode, 1.0);
        assert_eq!(s.q1, 0.5);
        assert_eq!(s.q3, 1.0);
        assert_eq!(s.min, 0.2);
        assert_eq!(s.max, 1.0);
        assert_eq!(s.pct_high, 40.0);
        assert_eq!(s.pct_threshold, 60.0);
    }

    #[test]
    fn mode_prefers_smallest_on_tie() {
        assert_eq!(mode(&[0.1, 0.1, 0.5, 0.5, 0.9]), Some(0.1));
        assert_eq!(mode(&[0.3]), Some(0.3));
    }

    #[test]
    fn failures_compare_on_unit_scale() {
        let scored = vec![("a", 0.69), ("b", 0.7), ("c", 0.95)];
        let failing: Vec<_> = ScoreSummary::failing(&scored, 0.7).collect();
        assert_eq!(failing, vec![&"a"]);
    }

    #[test]
    fn display_lists_both_bars() {
        let s = ScoreSummary::from_scores(&[0.95, 0.75], 0.7).unwrap();
        let text = s.to_string();
        assert!(text.contains("success >= 90%: 50.00%"));
        assert!(text.contains("success >= 70%: 100.00%"));
    }
}
