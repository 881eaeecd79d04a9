use std::path::PathBuf;

use thiserror::Error;

/// Per-document failures. These never abort a batch: the caller records
/// them against the document and moves on.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed labeled example {file:?}: {reason}")]
    CalibrationData { file: PathBuf, reason: String },

    #[error("no heading candidates found")]
    NoCandidateFound,

    #[error("heading not located in document: {heading:?}")]
    HeadingNotLocated { heading: String },

    #[error("cannot evaluate: {0}")]
    EvaluationInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Short machine-friendly tag stored in the run ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::CalibrationData { .. } => "calibration_data",
            PipelineError::NoCandidateFound => "no_candidate",
            PipelineError::HeadingNotLocated { .. } => "heading_not_located",
            PipelineError::EvaluationInput(_) => "evaluation_input",
            PipelineError::Io(_) => "io",
        }
    }
}
