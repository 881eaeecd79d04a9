//! Runs the per-document pipeline over a corpus directory.
//!
//! Every failure stays inside its document: the batch always returns one
//! report per input path, in input order.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::analysis::CorpusProfile;
use crate::corpus::{self, Document};
use crate::db::DocumentRow;
use crate::error::PipelineError;
use crate::eval::{Metric, ScoreSummary};
use crate::parser::ranking::ScoredCandidate;
use crate::parser::{self, PipelineOptions};
use crate::utils::truncate;

const CHUNK_SIZE: usize = 500;

/// Read-only inputs shared by every worker.
pub struct ExtractJob<'a> {
    pub profile: &'a CorpusProfile,
    pub options: &'a PipelineOptions,
    pub output_dir: &'a Path,
    /// Set when excerpts should be scored against ground-truth labels.
    pub labels_dir: Option<&'a Path>,
    pub label_word: &'a str,
    pub toc_skip_chars: usize,
    pub metric: Metric,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Extracted {
        heading: String,
        score: f64,
        block_index: usize,
        excerpt_len: usize,
        similarity: Option<f64>,
        /// Why scoring was skipped, when it was requested but failed.
        eval_error: Option<String>,
    },
    Skipped {
        kind: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub doc_id: String,
    pub outcome: DocumentOutcome,
    pub ranked: Vec<ScoredCandidate>,
}

impl DocumentReport {
    pub fn similarity(&self) -> Option<f64> {
        match &self.outcome {
            DocumentOutcome::Extracted { similarity, .. } => *similarity,
            DocumentOutcome::Skipped { .. } => None,
        }
    }

    pub fn to_row(&self) -> DocumentRow {
        match &self.outcome {
            DocumentOutcome::Extracted {
                heading,
                score,
                block_index,
                excerpt_len,
                similarity,
                eval_error,
            } => DocumentRow {
                doc_id: self.doc_id.clone(),
                status: "extracted",
                heading: Some(heading.clone()),
                heading_score: Some(*score),
                block_index: Some(*block_index),
                excerpt_len: Some(*excerpt_len),
                similarity: *similarity,
                error_kind: eval_error.as_ref().map(|_| "evaluation_input"),
                reason: eval_error.clone(),
            },
            DocumentOutcome::Skipped { kind, reason } => DocumentRow {
                doc_id: self.doc_id.clone(),
                status: "skipped",
                heading: None,
                heading_score: None,
                block_index: None,
                excerpt_len: None,
                similarity: None,
                error_kind: Some(*kind),
                reason: Some(reason.clone()),
            },
        }
    }

    /// Ranked candidate table, best first.
    pub fn print_candidates(&self) {
        println!("\n{} ({} ranked candidates)", self.doc_id, self.ranked.len());
        for (i, c) in self.ranked.iter().enumerate() {
            println!(
                "{:>3} | {:>6.2} | {:>5} | {}",
                i + 1,
                c.score,
                c.candidate.block_index,
                truncate(&c.candidate.text, 80)
            );
        }
    }
}

pub fn run(paths: &[PathBuf], job: &ExtractJob) -> Vec<DocumentReport> {
    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut reports = Vec::with_capacity(paths.len());
    for chunk in paths.chunks(CHUNK_SIZE) {
        reports.extend(process_chunk(chunk, job));
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    reports
}

#[cfg(feature = "rayon")]
fn process_chunk(chunk: &[PathBuf], job: &ExtractJob) -> Vec<DocumentReport> {
    chunk.par_iter().map(|p| process_path(p, job)).collect()
}

#[cfg(not(feature = "rayon"))]
fn process_chunk(chunk: &[PathBuf], job: &ExtractJob) -> Vec<DocumentReport> {
    chunk.iter().map(|p| process_path(p, job)).collect()
}

pub fn process_path(path: &Path, job: &ExtractJob) -> DocumentReport {
    let doc_id = corpus::file_stem(path);
    match extract_one(path, job) {
        Ok((outcome, ranked)) => DocumentReport {
            doc_id,
            outcome,
            ranked,
        },
        Err(err) => {
            warn!(doc = %doc_id, reason = %err, "document skipped");
            DocumentReport {
                doc_id,
                outcome: DocumentOutcome::Skipped {
                    kind: err.kind(),
                    reason: err.to_string(),
                },
                ranked: Vec::new(),
            }
        }
    }
}

fn extract_one(
    path: &Path,
    job: &ExtractJob,
) -> Result<(DocumentOutcome, Vec<ScoredCandidate>), PipelineError> {
    let doc = Document::load(path, job.toc_skip_chars)?;
    let (result, detection) = parser::process_document(&doc, job.profile, job.options)?;
    debug!(doc = %doc.id, candidates = ?detection.texts(), "coarse candidates");

    let out = job.output_dir.join(corpus::excerpt_name(&doc.id, job.label_word));
    fs::write(&out, &result.section_text)?;
    debug!(doc = %doc.id, heading = %result.chosen_heading, score = result.heading_score, "excerpt written");

    let (similarity, eval_error) = match job.labels_dir {
        None => (None, None),
        Some(dir) => match score_against_label(dir, &doc.id, &result.section_text, job) {
            Ok(score) => (Some(score), None),
            Err(err) => {
                warn!(doc = %doc.id, reason = %err, "scoring skipped");
                (None, Some(err.to_string()))
            }
        },
    };

    let outcome = DocumentOutcome::Extracted {
        excerpt_len: result.section_text.chars().count(),
        heading: result.chosen_heading,
        score: result.heading_score,
        block_index: result.block_index,
        similarity,
        eval_error,
    };
    Ok((outcome, detection.ranked))
}

fn score_against_label(
    labels_dir: &Path,
    doc_id: &str,
    predicted: &str,
    job: &ExtractJob,
) -> Result<f64, PipelineError> {
    let path = labels_dir.join(corpus::excerpt_name(doc_id, job.label_word));
    let label = fs::read_to_string(&path)
        .map_err(|e| PipelineError::EvaluationInput(format!("no label at {:?}: {}", path, e)))?;
    job.metric.compute(&label, predicted)
}

/// Counts and score distribution for a finished batch.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub documents: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub scores: Vec<(String, f64)>,
    pub summary: Option<ScoreSummary>,
    pub threshold: f64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[DocumentReport], threshold: f64) -> Self {
        let extracted = reports
            .iter()
            .filter(|r| matches!(r.outcome, DocumentOutcome::Extracted { .. }))
            .count();
        let scores: Vec<(String, f64)> = reports
            .iter()
            .filter_map(|r| r.similarity().map(|s| (r.doc_id.clone(), s)))
            .collect();
        let values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
        BatchSummary {
            documents: reports.len(),
            extracted,
            skipped: reports.len() - extracted,
            summary: ScoreSummary::from_scores(&values, threshold),
            scores,
            threshold,
        }
    }

    pub fn failing(&self) -> Vec<&String> {
        ScoreSummary::failing(&self.scores, self.threshold).collect()
    }

    pub fn print(&self) {
        println!(
            "Processed {} documents: {} extracted, {} skipped.",
            self.documents, self.extracted, self.skipped
        );
        if let Some(summary) = &self.summary {
            println!("{}", summary);
            let failing = self.failing();
            if !failing.is_empty() {
                println!("{} below {:.2}:", failing.len(), self.threshold);
                for id in failing {
                    println!("  {}", id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calibrate::CalibrationConstants;
    use crate::analysis::keywords::KeywordStat;
    use crate::parser::section::ExtractUnit;
    use crate::settings::Settings;

    const FILING: &str = "SEC_HTML\nManagement Fee\nThe Fund pays the Adviser a monthly fee. The fee accrues daily.\nTermination\nThe agreement may be terminated.";
    const LABEL: &str = "Management Fee\nThe Fund pays the Adviser a monthly fee. The fee accrues daily.\n";

    fn profile() -> CorpusProfile {
        CorpusProfile {
            constants: CalibrationConstants {
                max_heading_words: 6,
                max_section_units: 2,
            },
            model: [("fee".to_string(), KeywordStat(3, 1.5))].into_iter().collect(),
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

    struct Dirs {
        _root: tempfile::TempDir,
        texts: PathBuf,
        labels: PathBuf,
        output: PathBuf,
    }

    fn dirs() -> Dirs {
        let root = tempfile::tempdir().unwrap();
        let texts = root.path().join("texts");
        let labels = root.path().join("labels");
        let output = root.path().join("out");
        for d in [&texts, &labels, &output] {
            fs::create_dir_all(d).unwrap();
        }
        Dirs {
            _root: root,
            texts,
            labels,
            output,
        }
    }

    #[test]
    fn batch_extracts_scores_and_skips() {
        let d = dirs();
        fs::write(d.texts.join("fund-a.txt"), FILING).unwrap();
        fs::write(d.texts.join("fund-b.txt"), "no heading here.\nnor here.").unwrap();
        fs::write(d.labels.join("fund-a_Extracted.txt"), LABEL).unwrap();

        let profile = profile();
        let options = options();
        let job = ExtractJob {
            profile: &profile,
            options: &options,
            output_dir: &d.output,
            labels_dir: Some(&d.labels),
            label_word: "Extracted",
            toc_skip_chars: 0,
            metric: Metric::Overlap,
        };
        let paths = corpus::list_texts(&d.texts, "Extracted", &[".txt".to_string()]).unwrap();
        let reports = run(&paths, &job);

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].doc_id, "fund-a");
        match &reports[0].outcome {
            DocumentOutcome::Extracted { heading, similarity, .. } => {
                assert_eq!(heading, "Management Fee");
                assert_eq!(*similarity, Some(1.0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        let excerpt = fs::read_to_string(d.output.join("fund-a_Extracted.txt")).unwrap();
        assert!(excerpt.starts_with("Management Fee\n"));
        assert!(excerpt.ends_with("terminated."));

        assert_eq!(
            reports[1].outcome,
            DocumentOutcome::Skipped {
                kind: "no_candidate",
                reason: "no heading candidates found".to_string(),
            }
        );
        assert_eq!(reports[1].to_row().status, "skipped");

        let summary = BatchSummary::from_reports(&reports, 0.7);
        assert_eq!((summary.documents, summary.extracted, summary.skipped), (2, 1, 1));
        assert_eq!(summary.summary.as_ref().map(|s| s.count), Some(1));
        assert!(summary.failing().is_empty());
    }

    #[test]
    fn missing_label_keeps_the_excerpt() {
        let d = dirs();
        let path = d.texts.join("fund-c.txt");
        fs::write(&path, FILING).unwrap();

        let profile = profile();
        let options = options();
        let job = ExtractJob {
            profile: &profile,
            options: &options,
            output_dir: &d.output,
            labels_dir: Some(&d.labels),
            label_word: "Extracted",
            toc_skip_chars: 0,
            metric: Metric::Overlap,
        };
        let report = process_path(&path, &job);
        assert!(d.output.join("fund-c_Extracted.txt").exists());
        let row = report.to_row();
        assert_eq!(row.status, "extracted");
        assert_eq!(row.similarity, None);
        assert_eq!(row.error_kind, Some("evaluation_input"));
    }

    #[test]
    fn unreadable_document_is_an_io_skip() {
        let d = dirs();
        let profile = profile();
        let options = options();
        let job = ExtractJob {
            profile: &profile,
            options: &options,
            output_dir: &d.output,
            labels_dir: None,
            label_word: "Extracted",
            toc_skip_chars: 0,
            metric: Metric::Overlap,
        };
        let report = process_path(&d.texts.join("missing.txt"), &job);
        assert!(matches!(report.outcome, DocumentOutcome::Skipped { kind: "io", .. }));
    }
}
