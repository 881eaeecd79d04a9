use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::eval::ScoreSummary;

pub const DB_FILE: &str = "runs.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS runs (
            run_id        TEXT PRIMARY KEY,
            started_at    TEXT NOT NULL,
            unit          TEXT NOT NULL,
            documents     INTEGER NOT NULL,
            extracted     INTEGER NOT NULL,
            skipped       INTEGER NOT NULL,
            scored        INTEGER NOT NULL DEFAULT 0,
            mean          REAL,
            median        REAL,
            q1            REAL,
            q3            REAL,
            pct_high      REAL,
            pct_threshold REAL,
            threshold     REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document_results (
            id            INTEGER PRIMARY KEY,
            run_id        TEXT NOT NULL REFERENCES runs(run_id),
            doc_id        TEXT NOT NULL,
            status        TEXT NOT NULL CHECK(status IN ('extracted','skipped')),
            heading       TEXT,
            heading_score REAL,
            block_index   INTEGER,
            excerpt_len   INTEGER,
            similarity    REAL,
            error_kind    TEXT,
            reason        TEXT,
            UNIQUE(run_id, doc_id)
        );
        CREATE INDEX IF NOT EXISTS idx_results_run ON document_results(run_id);
        ",
    )?;
    Ok(())
}

pub fn new_run_id() -> String {
    format!("run-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f"))
}

// ── Runs ──

#[derive(Debug, Clone, PartialEq)]
pub struct RunRow {
    pub run_id: String,
    pub started_at: String,
    pub unit: String,
    pub documents: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub scored: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub pct_high: Option<f64>,
    pub pct_threshold: Option<f64>,
    pub threshold: f64,
}

impl RunRow {
    pub fn new(run_id: &str, unit: &str, documents: usize, extracted: usize, threshold: f64) -> Self {
        RunRow {
            run_id: run_id.to_string(),
            started_at: Utc::now().to_rfc3339(),
            unit: unit.to_string(),
            documents,
            extracted,
            skipped: documents.saturating_sub(extracted),
            scored: 0,
            mean: None,
            median: None,
            q1: None,
            q3: None,
            pct_high: None,
            pct_threshold: None,
            threshold,
        }
    }

    pub fn with_summary(mut self, summary: Option<&ScoreSummary>) -> Self {
        if let Some(s) = summary {
            self.scored = s.count;
            self.mean = Some(s.mean);
            self.median = Some(s.median);
            self.q1 = Some(s.q1);
            self.q3 = Some(s.q3);
            self.pct_high = Some(s.pct_high);
            self.pct_threshold = Some(s.pct_threshold);
        }
        self
    }
}

pub fn insert_run(conn: &Connection, run: &RunRow) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO runs
         (run_id, started_at, unit, documents, extracted, skipped, scored,
          mean, median, q1, q3, pct_high, pct_threshold, threshold)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            run.run_id, run.started_at, run.unit, run.documents, run.extracted, run.skipped,
            run.scored, run.mean, run.median, run.q1, run.q3, run.pct_high, run.pct_threshold,
            run.threshold,
        ],
    )?;
    Ok(())
}

/// Most recent runs first.
pub fn fetch_runs(conn: &Connection, limit: usize) -> Result<Vec<RunRow>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, started_at, unit, documents, extracted, skipped, scored,
                mean, median, q1, q3, pct_high, pct_threshold, threshold
         FROM runs ORDER BY started_at DESC, run_id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit], |row| {
            Ok(RunRow {
                run_id: row.get(0)?,
                started_at: row.get(1)?,
                unit: row.get(2)?,
                documents: row.get(3)?,
                extracted: row.get(4)?,
                skipped: row.get(5)?,
                scored: row.get(6)?,
                mean: row.get(7)?,
                median: row.get(8)?,
                q1: row.get(9)?,
                q3: row.get(10)?,
                pct_high: row.get(11)?,
                pct_threshold: row.get(12)?,
                threshold: row.get(13)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ── Per-document results ──

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub doc_id: String,
    pub status: &'static str,
    pub heading: Option<String>,
    pub heading_score: Option<f64>,
    pub block_index: Option<usize>,
    pub excerpt_len: Option<usize>,
    pub similarity: Option<f64>,
    pub error_kind: Option<&'static str>,
    pub reason: Option<String>,
}

pub fn save_results(conn: &Connection, run_id: &str, rows: &[DocumentRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO document_results
             (run_id, doc_id, status, heading, heading_score, block_index, excerpt_len,
              similarity, error_kind, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for r in rows {
            stmt.execute(params![
                run_id, r.doc_id, r.status, r.heading, r.heading_score, r.block_index,
                r.excerpt_len, r.similarity, r.error_kind, r.reason,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// A document that either was skipped or scored below the run's threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub doc_id: String,
    pub similarity: Option<f64>,
    pub reason: Option<String>,
}

/// Failures of one run: skipped documents and scored documents under `threshold`.
pub fn failures(conn: &Connection, run_id: &str, threshold: f64) -> Result<Vec<Failure>> {
    let mut stmt = conn.prepare(
        "SELECT doc_id, similarity, reason FROM document_results
         WHERE run_id = ?1 AND (status = 'skipped' OR similarity < ?2)
         ORDER BY doc_id",
    )?;
    let rows = stmt
        .query_map(params![run_id, threshold], |row| {
            Ok(Failure {
                doc_id: row.get(0)?,
                similarity: row.get(1)?,
                reason: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
