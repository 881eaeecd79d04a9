mod analysis;
mod batch;
mod corpus;
mod db;
mod error;
mod eval;
mod parser;
mod settings;
mod utils;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use tracing::info;

use analysis::tagger::RuleTagger;
use analysis::{AnalysisReport, CorpusProfile};
use batch::{BatchSummary, ExtractJob};
use eval::Metric;
use parser::section::ExtractUnit;
use parser::PipelineOptions;
use settings::Settings;
use utils::{format_duration, truncate};

#[derive(Parser)]
#[command(name = "filing_sections", about = "Locate and extract headed sections from regulatory filings")]
struct Cli {
    /// Configuration file (TOML/JSON); defaults to ./filing_sections.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate thresholds and build the keyword model from labeled examples
    Analyze {
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        metrics: PathBuf,
        /// Label word in ground-truth file names
        #[arg(long)]
        word: Option<String>,
    },
    /// Extract the section of interest from every filing in a directory
    Extract {
        #[arg(long)]
        texts: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        metrics: PathBuf,
        #[arg(long)]
        word: Option<String>,
        /// Re-run the analysis before extracting
        #[arg(long)]
        analyze: bool,
        /// Score each excerpt against its ground-truth label
        #[arg(long)]
        test: bool,
        /// Print the ranked candidate table of every document
        #[arg(long)]
        log: bool,
        #[arg(long, value_enum)]
        unit: Option<ExtractUnit>,
    },
    /// Compare one label file with one prediction
    Score {
        #[arg(long)]
        label: PathBuf,
        #[arg(long)]
        pred: PathBuf,
        #[arg(long, value_enum, default_value_t = Metric::Overlap)]
        metric: Metric,
    },
    /// Show recent extraction runs and the failures of the latest one
    Stats {
        #[arg(long)]
        metrics: PathBuf,
        /// Max runs to display
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Analyze {
            labels,
            metrics,
            word,
        } => {
            if let Some(word) = word {
                settings.label_word = word;
            }
            let report = analysis::analyze(&labels, &metrics, &settings, &RuleTagger::new())?;
            print_analysis(&report);
            Ok(())
        }
        Commands::Extract {
            texts,
            labels,
            output,
            metrics,
            word,
            analyze,
            test,
            log,
            unit,
        } => {
            if let Some(word) = word {
                settings.label_word = word;
            }
            if let Some(unit) = unit {
                settings.unit = unit;
            }
            let dirs = ExtractDirs {
                texts: &texts,
                labels: &labels,
                output: &output,
                metrics: &metrics,
            };
            run_extract(&settings, dirs, analyze, test, log)
        }
        Commands::Score { label, pred, metric } => {
            let label_text =
                fs::read_to_string(&label).with_context(|| format!("Failed to read {:?}", label))?;
            let pred_text =
                fs::read_to_string(&pred).with_context(|| format!("Failed to read {:?}", pred))?;
            let score = metric.compute(&label_text, &pred_text)?;
            println!("{:?}: {:.4}", metric, score);
            Ok(())
        }
        Commands::Stats { metrics, limit } => show_stats(&metrics, limit),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ExtractDirs<'a> {
    texts: &'a Path,
    labels: &'a Path,
    output: &'a Path,
    metrics: &'a Path,
}

fn run_extract(settings: &Settings, dirs: ExtractDirs, reanalyze: bool, test: bool, log: bool) -> Result<()> {
    let profile = prepare_profile(settings, &dirs, reanalyze)?;

    let paths = corpus::list_texts(dirs.texts, &settings.label_word, &settings.extensions)?;
    if paths.is_empty() {
        bail!("No documents found in {:?}", dirs.texts);
    }
    fs::create_dir_all(dirs.output).with_context(|| format!("Cannot create {:?}", dirs.output))?;

    let options = PipelineOptions::from_settings(settings);
    let job = ExtractJob {
        profile: &profile,
        options: &options,
        output_dir: dirs.output,
        labels_dir: test.then_some(dirs.labels),
        label_word: &settings.label_word,
        toc_skip_chars: settings.toc_skip_chars,
        metric: Metric::Overlap,
    };

    println!("Extracting from {} documents...", paths.len());
    let reports = batch::run(&paths, &job);
    if log {
        for report in &reports {
            report.print_candidates();
        }
    }

    let summary = BatchSummary::from_reports(&reports, settings.success_threshold);
    summary.print();

    let conn = db::connect(&dirs.metrics.join(db::DB_FILE))?;
    db::init_schema(&conn)?;
    let run_id = db::new_run_id();
    let unit = format!("{:?}", settings.unit).to_lowercase();
    let run = db::RunRow::new(&run_id, &unit, summary.documents, summary.extracted, settings.success_threshold)
        .with_summary(summary.summary.as_ref());
    db::insert_run(&conn, &run)?;
    let rows: Vec<db::DocumentRow> = reports.iter().map(|r| r.to_row()).collect();
    db::save_results(&conn, &run_id, &rows)?;
    info!(run = %run_id, documents = summary.documents, skipped = summary.skipped, "run recorded");
    Ok(())
}

/// Analyse when asked to or when the metrics directory is incomplete,
/// otherwise reuse the persisted model and constants.
fn prepare_profile(settings: &Settings, dirs: &ExtractDirs, reanalyze: bool) -> Result<CorpusProfile> {
    if reanalyze || analysis::artifacts_missing(dirs.metrics) {
        let report = analysis::analyze(dirs.labels, dirs.metrics, settings, &RuleTagger::new())?;
        print_analysis(&report);
        Ok(report.profile)
    } else {
        analysis::load_profile(dirs.metrics, settings)
    }
}

fn print_analysis(report: &AnalysisReport) {
    println!("Analysed {} labeled examples ({} skipped).", report.examples, report.skipped.len());
    for err in &report.skipped {
        println!("  skipped: {}", err);
    }
    println!("MAX_TITLE_SIZE:   {}", report.profile.constants.max_heading_words);
    println!("MAX_SECTION_SIZE: {}", report.profile.constants.max_section_units);
    println!("Keywords:         {}", report.profile.model.len());
    let top = report
        .profile
        .model
        .iter()
        .sorted_by(|a, b| b.1.count().cmp(&a.1.count()).then(a.0.cmp(b.0)))
        .take(10);
    for (word, stat) in top {
        println!("  {:<20} {:>4} {:>6.2}", word, stat.count(), stat.weight());
    }
}

fn show_stats(metrics: &Path, limit: usize) -> Result<()> {
    let conn = db::connect(&metrics.join(db::DB_FILE))?;
    db::init_schema(&conn)?;
    let runs = db::fetch_runs(&conn, limit)?;
    if runs.is_empty() {
        println!("No runs recorded. Run 'extract' first.");
        return Ok(());
    }

    println!(
        "{:<26} | {:<19} | {:<8} | {:>5} | {:>5} | {:>5} | {:>6} | {:>6} | {:>6} | {:>13} | {:>7}",
        "Run", "Started", "Unit", "Docs", "Ok", "Skip", "Scored", "Mean", "Median", "Q1-Q3", "Success"
    );
    println!("{}", "-".repeat(138));
    for r in &runs {
        let pct = |v: Option<f64>| v.map(|x| format!("{:.2}", x * 100.0)).unwrap_or_else(|| "-".into());
        let iqr = match (r.q1, r.q3) {
            (Some(q1), Some(q3)) => format!("{:.1}-{:.1}", q1 * 100.0, q3 * 100.0),
            _ => "-".into(),
        };
        let success = r.pct_threshold.map(|p| format!("{:.1}%", p)).unwrap_or_else(|| "-".into());
        println!(
            "{:<26} | {:<19} | {:<8} | {:>5} | {:>5} | {:>5} | {:>6} | {:>6} | {:>6} | {:>13} | {:>7}",
            truncate(&r.run_id, 26),
            r.started_at.chars().take(19).collect::<String>(),
            r.unit,
            r.documents,
            r.extracted,
            r.skipped,
            r.scored,
            pct(r.mean),
            pct(r.median),
            iqr,
            success
        );
        if let Some(high) = r.pct_high {
            println!("{:>28} {:.1}% at or above 90", "", high);
        }
    }

    let latest = &runs[0];
    let failed = db::failures(&conn, &latest.run_id, latest.threshold)?;
    if !failed.is_empty() {
        println!("\n--- Failures in {} ---", latest.run_id);
        for f in &failed {
            match (f.similarity, &f.reason) {
                (Some(s), _) => println!("  {}: {:.2}", f.doc_id, s),
                (None, Some(reason)) => println!("  {}: {}", f.doc_id, truncate(reason, 60)),
                (None, None) => println!("  {}", f.doc_id),
            }
        }
    }
    Ok(())
}
