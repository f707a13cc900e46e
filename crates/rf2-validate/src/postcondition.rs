//! Checks run on the packaged release files.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use rf2_ingest::read_tsv_path;
use rf2_model::{CheckStage, ReleaseKind, ValidationIssue, ValidationReport};
use serde::Serialize;
use tracing::debug;

/// One file written to the release package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagedFile {
    /// Input delta the file was built from.
    pub table: String,
    pub kind: ReleaseKind,
    pub path: PathBuf,
}

struct Loaded {
    header: Vec<String>,
    rows: usize,
}

pub fn check_postconditions(effective_time: &str, files: &[PackagedFile]) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(CheckStage::Postcondition);
    let mut by_table: BTreeMap<&str, Vec<&PackagedFile>> = BTreeMap::new();
    for file in files {
        by_table.entry(file.table.as_str()).or_default().push(file);
    }

    for (table, files) in by_table {
        let mut loaded: BTreeMap<ReleaseKind, Loaded> = BTreeMap::new();
        for file in files {
            let label = file.path.display().to_string();
            if !file.path.is_file() {
                report.add(
                    ValidationIssue::error(
                        "POST_MISSING_OUTPUT",
                        format!("{} file was not written", file.kind),
                    )
                    .with_table(label),
                );
                continue;
            }
            let content = read_tsv_path(&file.path).with_context(|| format!("read {label}"))?;
            match file.kind {
                ReleaseKind::Delta => {
                    let stale = content
                        .rows
                        .iter()
                        .filter(|row| row.get(1).map(String::as_str) != Some(effective_time))
                        .count();
                    if stale > 0 {
                        report.add(
                            ValidationIssue::error(
                                "POST_DELTA_EFFECTIVE_TIME",
                                format!("delta rows not stamped with {effective_time}"),
                            )
                            .with_table(label.clone())
                            .with_count(stale as u64),
                        );
                    }
                }
                ReleaseKind::Snapshot => {
                    let mut ids = HashSet::with_capacity(content.rows.len());
                    let duplicates = content
                        .rows
                        .iter()
                        .filter_map(|row| row.first())
                        .filter(|id| !ids.insert(id.as_str()))
                        .count();
                    if duplicates > 0 {
                        report.add(
                            ValidationIssue::error(
                                "POST_SNAPSHOT_DUPLICATE_ID",
                                "snapshot holds more than one row for an id",
                            )
                            .with_table(label.clone())
                            .with_count(duplicates as u64),
                        );
                    }
                }
                ReleaseKind::Full => {}
            }
            loaded.insert(
                file.kind,
                Loaded {
                    header: content.headers,
                    rows: content.rows.len(),
                },
            );
        }

        let mut headers = loaded.values().map(|file| &file.header);
        if let Some(first) = headers.next() {
            if headers.any(|header| header != first) {
                report.add(
                    ValidationIssue::error(
                        "POST_HEADER_MISMATCH",
                        "full, snapshot and delta headers differ",
                    )
                    .with_table(table),
                );
            }
        }
        if let (Some(full), Some(snapshot)) = (
            loaded.get(&ReleaseKind::Full),
            loaded.get(&ReleaseKind::Snapshot),
        ) {
            if snapshot.rows > full.rows {
                report.add(
                    ValidationIssue::error(
                        "POST_SNAPSHOT_LARGER_THAN_FULL",
                        format!(
                            "snapshot has {} rows, full only {}",
                            snapshot.rows, full.rows
                        ),
                    )
                    .with_table(table),
                );
            }
        }
    }

    debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "postconditions checked"
    );
    Ok(report)
}
