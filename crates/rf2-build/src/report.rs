//! Build report written next to the release package.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rf2_config::sha256_file;
use rf2_model::{BuildStatus, ReleaseKind, ValidationReport};
use rf2_validate::PackagedFile;
use serde::Serialize;

use crate::release::TableOutcome;

pub const BUILD_REPORT_FILE_NAME: &str = "build_report.json";

#[derive(Debug, Clone, Serialize)]
pub struct FileChecksum {
    pub file: String,
    pub kind: ReleaseKind,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub build_id: String,
    pub product: String,
    pub user: String,
    pub effective_time: String,
    pub status: BuildStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub model_concepts: Option<usize>,
    pub tables: Vec<TableOutcome>,
    pub files: Vec<FileChecksum>,
    pub validation: Vec<ValidationReport>,
    /// Where the package ended up.
    pub package: Option<PathBuf>,
    pub published: Option<PathBuf>,
}

impl BuildReport {
    pub fn table_rows(&self, kind: ReleaseKind) -> usize {
        self.tables
            .iter()
            .map(|table| match kind {
                ReleaseKind::Full => table.full_rows,
                ReleaseKind::Snapshot => table.snapshot_rows,
                ReleaseKind::Delta => table.delta_rows,
            })
            .sum()
    }
}

/// sha256 of every packaged file, in package order.
pub fn checksum_files(files: &[PackagedFile]) -> Result<Vec<FileChecksum>> {
    files
        .iter()
        .map(|file| {
            let sha256 = sha256_file(&file.path)
                .with_context(|| format!("checksum {}", file.path.display()))?;
            let name = file
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(FileChecksum {
                file: name,
                kind: file.kind,
                sha256,
            })
        })
        .collect()
}

pub fn write_build_report_json(dir: &Path, report: &BuildReport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(BUILD_REPORT_FILE_NAME);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
