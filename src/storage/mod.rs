//! Flat-file export of a crawl for the cleaning and geocoding stages.
//!
//! File names and the trailing `idx` / `Page` join columns are what the
//! cleaning stage reads; everything else is the portal's own column text.

use crate::aggregate::CrawlResult;
use crate::models::Record;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARIES_FILE: &str = "establishments.csv";
pub const DETAILS_FILE: &str = "establishment_details.csv";
pub const INSPECTIONS_FILE: &str = "inspection_details.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

// ── Manifest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureNote {
    pub position: String,
    pub message: String,
}

/// Summary of one run, written next to the tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pages_requested: u32,
    pub with_detail: bool,
    pub establishments: usize,
    pub details: usize,
    pub inspections: usize,
    pub tables_written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureNote>,
}

// ── Exporter ──────────────────────────────────────────────────────────────────

pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Could not create output dir {:?}", dir))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_tables(&self, result: &CrawlResult) -> Result<()> {
        write_table(&self.dir.join(SUMMARIES_FILE), result.summaries.rows())?;
        write_table(&self.dir.join(DETAILS_FILE), result.details.rows())?;
        write_table(&self.dir.join(INSPECTIONS_FILE), result.inspections.rows())?;
        info!(
            "Wrote {} establishments, {} details, {} inspections to {:?}",
            result.summaries.len(),
            result.details.len(),
            result.inspections.len(),
            self.dir
        );
        Ok(())
    }

    pub fn write_manifest(&self, manifest: &RunManifest) -> Result<()> {
        let path = self.dir.join(MANIFEST_FILE);
        let file = File::create(&path).with_context(|| format!("Could not create {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), manifest)
            .with_context(|| format!("Could not write {:?}", path))?;
        Ok(())
    }
}

/// Column names in first-seen order across all rows.
fn column_union<R: Record>(rows: &[R]) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for col in row.fields().columns() {
            if !columns.contains(&col) {
                columns.push(col);
            }
        }
    }
    columns
}

fn write_table<R: Record>(path: &Path, rows: &[R]) -> Result<()> {
    let columns = column_union(rows);
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Could not create {:?}", path))?;

    writer.write_record(columns.iter().copied().chain(["idx", "Page"]))?;

    for row in rows {
        let key = row.key();
        let mut record: Vec<String> = columns
            .iter()
            .map(|col| row.fields().get(col).unwrap_or_default().to_string())
            .collect();
        record.push(key.label());
        record.push(key.page.to_string());
        writer.write_record(&record)?;
    }

    writer.flush().with_context(|| format!("Could not flush {:?}", path))?;
    Ok(())
}
