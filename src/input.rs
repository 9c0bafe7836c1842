//! Snapshot loading.
//!
//! A snapshot is either a bare JSON array of project rows or an object
//! carrying a `fiscalYear` and a `projects` array. Rows are decoded one at
//! a time so a single bad row is reported instead of failing the load.

use crate::engine::validate::RejectedRecord;
use crate::error::RecordError;
use crate::models::{FiscalYear, ProjectRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotDocument {
    Rows(Vec<Value>),
    Batch {
        #[serde(rename = "fiscalYear", default)]
        fiscal_year: Option<String>,
        projects: Vec<Value>,
    },
}

/// Decoded snapshot plus the rows that could not be decoded.
#[derive(Debug, Clone, Default)]
pub struct LoadedSnapshot {
    /// Fiscal year declared by the document, if any.
    pub fiscal_year: Option<FiscalYear>,
    pub records: Vec<ProjectRecord>,
    pub rejected: Vec<RejectedRecord>,
}

impl LoadedSnapshot {
    /// Total rows seen, decoded or not.
    pub fn row_count(&self) -> usize {
        self.records.len() + self.rejected.len()
    }
}

/// Parse snapshot text.
///
/// Rows without a fiscal year inherit the document's `fiscalYear`.
pub fn parse_snapshot(text: &str) -> Result<LoadedSnapshot> {
    let document: SnapshotDocument =
        serde_json::from_str(text).context("Snapshot is not a JSON array or project batch")?;

    let (fiscal_year, rows) = match document {
        SnapshotDocument::Rows(rows) => (None, rows),
        SnapshotDocument::Batch {
            fiscal_year,
            projects,
        } => (
            fiscal_year
                .filter(|fy| !fy.trim().is_empty())
                .map(FiscalYear::new),
            projects,
        ),
    };

    let mut snapshot = LoadedSnapshot {
        fiscal_year,
        ..LoadedSnapshot::default()
    };

    for (index, row) in rows.into_iter().enumerate() {
        match decode_row(&row) {
            Ok(mut record) => {
                if record.fiscal_year.trim().is_empty() {
                    if let Some(ref fy) = snapshot.fiscal_year {
                        record.fiscal_year = fy.to_string();
                    }
                }
                snapshot.records.push(record);
            }
            Err(e) => {
                warn!("Skipping row {}: {}", index, e);
                snapshot.rejected.push(RejectedRecord {
                    index,
                    id: row.get("id").and_then(Value::as_u64),
                    project_name: row
                        .get("projectName")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        "Decoded {} of {} rows",
        snapshot.records.len(),
        snapshot.row_count()
    );
    Ok(snapshot)
}

fn decode_row(row: &Value) -> std::result::Result<ProjectRecord, RecordError> {
    ProjectRecord::deserialize(row).map_err(|e| RecordError::Undecodable(e.to_string()))
}

/// Read and parse a snapshot file.
pub async fn load_snapshot(path: &Path) -> Result<LoadedSnapshot> {
    info!("Loading snapshot from {}", path.display());

    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

    parse_snapshot(&text).with_context(|| format!("Failed to parse snapshot: {}", path.display()))
}
