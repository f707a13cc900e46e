//! Release gates.
//!
//! Preconditions look at the manifest and the input deltas before a build
//! transforms anything; postconditions look at the packaged files. Both
//! produce a [`ValidationReport`]; [`gate_release`] decides whether the
//! build may go on.

mod postcondition;
mod precondition;

pub use postcondition::{PackagedFile, check_postconditions};
pub use precondition::check_preconditions;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use rf2_model::{CheckStage, IssueSeverity, ValidationReport};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatingDecision {
    pub block_release: bool,
    pub blocking_stages: Vec<CheckStage>,
}

/// Block when any report has errors, unless errors are explicitly allowed.
pub fn gate_release(reports: &[ValidationReport], allow_errors: bool) -> GatingDecision {
    if allow_errors {
        return GatingDecision::default();
    }
    let blocking: Vec<CheckStage> = reports
        .iter()
        .filter(|report| report.has_errors())
        .map(|report| report.stage)
        .collect();
    GatingDecision {
        block_release: !blocking.is_empty(),
        blocking_stages: blocking,
    }
}

pub fn has_validation_errors(reports: &[ValidationReport]) -> bool {
    reports.iter().any(ValidationReport::has_errors)
}

#[derive(Debug, Serialize)]
pub struct ValidationReportPayload {
    pub schema: &'static str,
    pub schema_version: u32,
    pub generated_at: String,
    pub product: String,
    pub effective_time: String,
    pub reports: Vec<ValidationReportSummary>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReportSummary {
    pub stage: CheckStage,
    pub error_count: usize,
    pub warning_count: usize,
    pub issues: Vec<ValidationIssueJson>,
}

#[derive(Debug, Serialize)]
pub struct ValidationIssueJson {
    pub severity: IssueSeverity,
    pub code: String,
    pub table: Option<String>,
    pub message: String,
    pub count: Option<u64>,
}

const REPORT_SCHEMA: &str = "rf2-release-builder.validation-report";
const REPORT_SCHEMA_VERSION: u32 = 1;
pub const REPORT_FILE_NAME: &str = "validation_report.json";

pub fn write_validation_report_json(
    output_dir: &Path,
    product: &str,
    effective_time: &str,
    reports: &[ValidationReport],
) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join(REPORT_FILE_NAME);
    let payload = ValidationReportPayload {
        schema: REPORT_SCHEMA,
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        product: product.to_string(),
        effective_time: effective_time.to_string(),
        reports: reports
            .iter()
            .map(|report| ValidationReportSummary {
                stage: report.stage,
                error_count: report.error_count(),
                warning_count: report.warning_count(),
                issues: report
                    .issues
                    .iter()
                    .map(|issue| ValidationIssueJson {
                        severity: issue.severity,
                        code: issue.code.clone(),
                        table: issue.table.clone(),
                        message: issue.message.clone(),
                        count: issue.count,
                    })
                    .collect(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&payload)?;
    std::fs::write(&output_path, format!("{json}\n"))?;
    Ok(output_path)
}
