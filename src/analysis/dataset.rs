use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus;
use crate::error::PipelineError;
use crate::utils::word_count;

/// One hand-labeled section: its heading line plus the body that follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledExample {
    #[serde(rename = "File")]
    pub file_id: String,
    #[serde(rename = "Start_Title")]
    pub heading_line: String,
    #[serde(rename = "End_Title", with = "null_string")]
    pub closing_line: Option<String>,
    #[serde(rename = "Text")]
    pub body_text: String,
}

impl LabeledExample {
    /// Build from a label file's contents: first line is the heading, the
    /// rest is the body. Both are lowercased.
    pub fn from_label(
        file_id: &str,
        contents: &str,
        max_heading_words: usize,
    ) -> Result<Self, PipelineError> {
        let (first, rest) = contents.split_once('\n').unwrap_or((contents, ""));
        let heading_line = first.trim().to_lowercase();
        if heading_line.is_empty() {
            return Err(PipelineError::CalibrationData {
                file: PathBuf::from(file_id),
                reason: "missing heading line".to_string(),
            });
        }
        let body_text = rest.to_lowercase().trim().replace('"', "'");
        let closing_line = closing_line(&body_text, max_heading_words);
        Ok(LabeledExample {
            file_id: file_id.to_string(),
            heading_line,
            closing_line,
            body_text,
        })
    }
}

/// The body's last line, when it is short and unterminated enough to be a
/// closing heading rather than prose.
fn closing_line(body: &str, max_heading_words: usize) -> Option<String> {
    let last = body.split('\n').next_back()?.trim();
    if last.is_empty() || last.ends_with('.') {
        return None;
    }
    if word_count(last) < max_heading_words {
        Some(last.to_string())
    } else {
        None
    }
}

/// Re-derive every closing line against a new heading-length limit, such
/// as the calibrated one.
pub fn recompute_closing_lines(examples: &mut [LabeledExample], max_heading_words: usize) {
    for ex in examples {
        ex.closing_line = closing_line(&ex.body_text, max_heading_words);
    }
}

/// Read every label file under `dir`. Malformed files are returned as
/// diagnostics instead of failing the whole load.
pub fn load_labels(
    dir: &Path,
    label_word: &str,
    extensions: &[String],
    max_heading_words: usize,
) -> Result<(Vec<LabeledExample>, Vec<PipelineError>)> {
    let files = corpus::list_labels(dir, label_word, extensions)?;
    let mut examples = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();

    for path in files {
        let file_id = corpus::label_id(&path, label_word);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(file = %path.display(), "unreadable label: {}", e);
                skipped.push(PipelineError::CalibrationData {
                    file: path.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match LabeledExample::from_label(&file_id, &contents, max_heading_words) {
            Ok(ex) => examples.push(ex),
            Err(PipelineError::CalibrationData { reason, .. }) => {
                warn!(file = %path.display(), "skipping label: {}", reason);
                skipped.push(PipelineError::CalibrationData { file: path, reason });
            }
            Err(other) => skipped.push(other),
        }
    }
    debug!(loaded = examples.len(), skipped = skipped.len(), "labels read");
    Ok((examples, skipped))
}

pub fn write_csv(path: &Path, examples: &[LabeledExample]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for ex in examples {
        writer.serialize(ex)?;
    }
    writer.flush()?;
    Ok(())
}

/// Load a persisted dataset. Rows that fail to parse, or whose heading and
/// body are both empty, are skipped with a warning. An empty heading alone
/// is kept and calibrates as zero words.
pub fn read_csv(path: &Path) -> Result<Vec<LabeledExample>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<LabeledExample>().enumerate() {
        match record {
            Ok(ex) if ex.heading_line.trim().is_empty() && ex.body_text.is_empty() => {
                warn!(row = line + 1, "skipping empty dataset row");
            }
            Ok(ex) => rows.push(ex),
            Err(e) => warn!(row = line + 1, "skipping malformed dataset row: {}", e),
        }
    }
    Ok(rows)
}

mod null_string {
    use serde::{Deserialize, Deserializer, Serializer};

    const NULL: &str = "null";

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(NULL))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() || raw == NULL {
            Ok(None)
        } else {
            Ok(Some(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_and_body_split() {
        let ex = LabeledExample::from_label(
            "0001",
            "Investment Advisory Agreement\nThe \"Adviser\" shall manage the fund.\nManagement Fee",
            14,
        )
        .unwrap();
        assert_eq!(ex.heading_line, "investment advisory agreement");
        assert_eq!(ex.body_text, "the 'adviser' shall manage the fund.\nmanagement fee");
        assert_eq!(ex.closing_line.as_deref(), Some("management fee"));
    }

    #[test]
    fn closing_line_rejects_sentences_and_long_lines() {
        let ex = LabeledExample::from_label("a", "Fee\nThe fee is paid monthly.", 14).unwrap();
        assert_eq!(ex.closing_line, None);
        let ex = LabeledExample::from_label("b", "Fee\none two three four", 4).unwrap();
        assert_eq!(ex.closing_line, None);
    }

    #[test]
    fn closing_lines_follow_a_new_limit() {
        let mut rows = vec![LabeledExample::from_label("a", "Fee
body
one two three four", 14).unwrap()];
        assert_eq!(rows[0].closing_line.as_deref(), Some("one two three four"));
        recompute_closing_lines(&mut rows, 4);
        assert_eq!(rows[0].closing_line, None);
        recompute_closing_lines(&mut rows, 5);
        assert_eq!(rows[0].closing_line.as_deref(), Some("one two three four"));
    }

    #[test]
    fn csv_rows_with_empty_heading_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi_dataset.csv");
        fs::write(&path, "File,Start_Title,End_Title,Text
a,,null,body text
b,,null,
").unwrap();
        let back = read_csv(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].file_id, "a");
        assert_eq!(back[0].heading_line, "");
    }

    #[test]
    fn missing_heading_is_calibration_error() {
        let err = LabeledExample::from_label("c", "\nbody only", 14).unwrap_err();
        assert!(matches!(err, PipelineError::CalibrationData { .. }));
    }

    #[test]
    fn load_labels_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0001_Extracted.txt"), "Termination\nEither party may end it.").unwrap();
        fs::write(dir.path().join("0002_Extracted.txt"), "\n\nno heading").unwrap();
        fs::write(dir.path().join("0003.txt"), "Not a label\nbody").unwrap();

        let (examples, skipped) =
            load_labels(dir.path(), "Extracted", &[".txt".to_string()], 14).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].file_id, "0001");
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn csv_keeps_null_closing_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi_dataset.csv");
        let rows = vec![
            LabeledExample::from_label("x", "Management Fee\nPaid monthly.", 14).unwrap(),
            LabeledExample::from_label("y", "Termination\nbody\nsigned by", 14).unwrap(),
        ];
        write_csv(&path, &rows).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("File,Start_Title,End_Title,Text"));
        assert!(text.contains(",null,"));

        let back = read_csv(&path).unwrap();
        assert_eq!(back, rows);
    }
}
