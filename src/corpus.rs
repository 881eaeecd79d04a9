//! Locating corpus files and preparing raw filings for heading detection.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::PipelineError;

/// Marker the ingestion layer leaves at the top of files that kept their
/// paragraph tags (one paragraph per line).
const STRUCTURED_MARKER: &str = "SEC_HTML";
const STRUCTURED_MARKER_WINDOW: usize = 100;
const GRAPHIC_MARKER: &str = "GRAPHIC";
const PAGE_MARKER: &str = "<PAGE>";

/// A filing ready for detection.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    /// True when blocks are single lines rather than blank-line separated chunks.
    pub structured: bool,
}

impl Document {
    /// Apply the loader conventions: detect structure, skip the leading
    /// table-of-contents window, cut trailing graphics, drop page markers.
    pub fn prepare(id: &str, raw: &str, toc_skip_chars: usize) -> Self {
        let head: String = raw.chars().take(STRUCTURED_MARKER_WINDOW).collect();
        let structured = head.contains(STRUCTURED_MARKER);

        let mut text: String = raw.chars().skip(toc_skip_chars).collect();
        if let Some(idx) = text.find(GRAPHIC_MARKER) {
            text.truncate(idx);
        }
        let text = text.replace(PAGE_MARKER, "");

        Document {
            id: id.to_string(),
            text,
            structured,
        }
    }

    pub fn load(path: &Path, toc_skip_chars: usize) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path)?;
        Ok(Document::prepare(&file_stem(path), &raw, toc_skip_chars))
    }
}

/// Documents to extract from: accepted extensions, name without the label word.
pub fn list_texts(dir: &Path, label_word: &str, extensions: &[String]) -> Result<Vec<PathBuf>> {
    list_files(dir, extensions, |name| !name.contains(label_word))
}

/// Ground-truth label files: accepted extensions, name containing the label word.
pub fn list_labels(dir: &Path, label_word: &str, extensions: &[String]) -> Result<Vec<PathBuf>> {
    list_files(dir, extensions, |name| name.contains(label_word))
}

fn list_files<F>(dir: &Path, extensions: &[String], keep: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&str) -> bool + Copy,
{
    let mut files = Vec::new();
    walk(dir, extensions, keep, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk<F>(dir: &Path, extensions: &[String], keep: F, out: &mut Vec<PathBuf>) -> Result<()>
where
    F: Fn(&str) -> bool + Copy,
{
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read directory {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, extensions, keep, out)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if keep(name) && extensions.iter().any(|ext| name.ends_with(ext.as_str())) {
            out.push(path);
        }
    }
    Ok(())
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Document id a label belongs to: its stem without `_<label_word>`.
pub fn label_id(path: &Path, label_word: &str) -> String {
    file_stem(path).replace(&format!("_{}", label_word), "")
}

/// Deterministic excerpt/label file name for a document.
pub fn excerpt_name(doc_id: &str, label_word: &str) -> String {
    format!("{}_{}.txt", doc_id, label_word)
}
