pub mod calibrate;
pub mod dataset;
pub mod keywords;
pub mod tagger;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::settings::Settings;
use calibrate::CalibrationConstants;
use dataset::LabeledExample;
use keywords::KeywordModel;
use tagger::Tagger;

pub const DATASET_FILE: &str = "roi_dataset.csv";
pub const KEYWORDS_FILE: &str = "title_keywords.json";
pub const CONSTANTS_FILE: &str = "constants.json";

/// Everything the extraction pass needs from a labeled corpus.
#[derive(Debug, Clone)]
pub struct CorpusProfile {
    pub constants: CalibrationConstants,
    pub model: KeywordModel,
}

pub struct AnalysisReport {
    pub profile: CorpusProfile,
    pub examples: usize,
    pub skipped: Vec<PipelineError>,
}

/// Read labels, calibrate thresholds, build the keyword model, and persist
/// all three artifacts into `metrics_dir`.
pub fn analyze(
    labels_dir: &Path,
    metrics_dir: &Path,
    settings: &Settings,
    tagger: &dyn Tagger,
) -> Result<AnalysisReport> {
    let (mut examples, skipped) = dataset::load_labels(
        labels_dir,
        &settings.label_word,
        &settings.extensions,
        settings.max_heading_words,
    )?;
    if examples.is_empty() {
        bail!("No labeled examples found in {:?}", labels_dir);
    }
    fs::create_dir_all(metrics_dir).with_context(|| format!("Cannot create {:?}", metrics_dir))?;

    let profile = profile_corpus(&examples, settings, tagger);
    // loading used the configured limit; closing lines follow the calibrated one
    dataset::recompute_closing_lines(&mut examples, profile.constants.max_heading_words);
    dataset::write_csv(&metrics_dir.join(DATASET_FILE), &examples)?;
    save_constants(&metrics_dir.join(CONSTANTS_FILE), &profile.constants)?;
    profile.model.save(&metrics_dir.join(KEYWORDS_FILE))?;

    info!(
        examples = examples.len(),
        skipped = skipped.len(),
        keywords = profile.model.len(),
        "corpus analysed"
    );
    Ok(AnalysisReport {
        profile,
        examples: examples.len(),
        skipped,
    })
}

/// Pure part of the analysis: no filesystem access.
pub fn profile_corpus(examples: &[LabeledExample], settings: &Settings, tagger: &dyn Tagger) -> CorpusProfile {
    let constants = calibrate::calibrate_with(examples, settings.iqr_factors()).unwrap_or_else(|| {
        warn!("falling back to configured thresholds");
        settings.default_constants()
    });
    let model = KeywordModel::build(examples, tagger, &settings.blacklist);
    if model.is_empty() {
        warn!("no heading word occurs twice, every candidate will score zero");
    }
    CorpusProfile { constants, model }
}

/// True when the metrics directory lacks the dataset or the keyword model.
pub fn artifacts_missing(metrics_dir: &Path) -> bool {
    !metrics_dir.join(DATASET_FILE).exists() || !metrics_dir.join(KEYWORDS_FILE).exists()
}

/// Load a previously analysed corpus. Without `constants.json` the thresholds
/// are recomputed from the persisted dataset.
pub fn load_profile(metrics_dir: &Path, settings: &Settings) -> Result<CorpusProfile> {
    let model = KeywordModel::load(&metrics_dir.join(KEYWORDS_FILE))?;
    let constants_path = metrics_dir.join(CONSTANTS_FILE);
    let constants = if constants_path.exists() {
        let raw = fs::read_to_string(&constants_path)?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid constants {:?}", constants_path))?
    } else {
        recalibrate(&metrics_dir.join(DATASET_FILE), settings)?
    };
    Ok(CorpusProfile { constants, model })
}

fn recalibrate(dataset_path: &Path, settings: &Settings) -> Result<CalibrationConstants> {
    let examples = dataset::read_csv(dataset_path)?;
    Ok(calibrate::calibrate_with(&examples, settings.iqr_factors()).unwrap_or_else(|| {
        warn!(path = %dataset_path.display(), "empty dataset, using configured thresholds");
        settings.default_constants()
    }))
}

fn save_constants(path: &Path, constants: &CalibrationConstants) -> Result<()> {
    let json = serde_json::to_string_pretty(constants)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
