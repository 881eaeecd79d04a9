//! Scoring extracted sections against hand-labeled ground truth.

pub mod similarity;
pub mod summary;

pub use similarity::Metric;
pub use summary::ScoreSummary;
