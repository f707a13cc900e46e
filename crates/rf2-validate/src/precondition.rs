//! Checks run on the manifest and input files before anything is transformed.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use rf2_config::BuildConfiguration;
use rf2_ingest::{IngestError, Rf2FileName, list_rf2_files, read_header, recognise};
use rf2_model::{CheckStage, ValidationIssue, ValidationReport};
use tracing::debug;

pub fn check_preconditions(config: &BuildConfiguration, input_dir: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::new(CheckStage::Precondition);

    if config.tables.is_empty() {
        report.add(ValidationIssue::error(
            "PRE_NO_TABLES",
            "manifest does not list any table",
        ));
    }

    if config.derivative {
        check_derivative(config, &mut report);
    }

    let mut seen = BTreeSet::new();
    for table in &config.tables {
        if !seen.insert(table.input.as_str()) {
            report.add(
                ValidationIssue::error("PRE_DUPLICATE_INPUT", "input listed more than once")
                    .with_table(&table.input),
            );
            continue;
        }
        check_input(config, input_dir, &table.input, &mut report);
    }

    let present = list_rf2_files(input_dir)
        .with_context(|| format!("list inputs in {}", input_dir.display()))?;
    for path in present {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !seen.contains(name) {
            report.add(
                ValidationIssue::warning(
                    "PRE_UNLISTED_INPUT",
                    "input file is not in the manifest and will not be released",
                )
                .with_table(name),
            );
        }
    }

    debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "preconditions checked"
    );
    Ok(report)
}

/// A derivative product releases under its own namespace and module.
fn check_derivative(config: &BuildConfiguration, report: &mut ValidationReport) {
    let namespace = config.namespace.as_deref().map(str::trim).unwrap_or_default();
    if namespace.is_empty() {
        report.add(ValidationIssue::error(
            "PRE_DERIVATIVE_NAMESPACE",
            "derivative product has no namespace",
        ));
    }
    if config.module_id.is_none() {
        report.add(ValidationIssue::error(
            "PRE_DERIVATIVE_MODULE",
            "derivative product has no module id",
        ));
    }
}

fn check_input(
    config: &BuildConfiguration,
    input_dir: &Path,
    input: &str,
    report: &mut ValidationReport,
) {
    match Rf2FileName::parse(input) {
        Ok(name) if name.version_date != config.effective_time.as_str() => {
            report.add(
                ValidationIssue::error(
                    "PRE_FILE_DATE",
                    format!(
                        "file date {} does not match release date {}",
                        name.version_date,
                        config.effective_time.as_str()
                    ),
                )
                .with_table(input),
            );
        }
        Ok(_) => {}
        Err(err) => {
            report.add(ValidationIssue::error("PRE_UNRECOGNISED_INPUT", err.to_string()).with_table(input));
            return;
        }
    }

    let path = input_dir.join(input);
    if !path.is_file() {
        report.add(
            ValidationIssue::error("PRE_MISSING_INPUT", "input delta file not found").with_table(input),
        );
        return;
    }
    let outcome = read_header(&path).and_then(|header| recognise(input, &header));
    let issue = match outcome {
        Ok(_) => return,
        Err(IngestError::EmptyFile { .. }) => {
            ValidationIssue::error("PRE_EMPTY_INPUT", "input file has no header row")
        }
        Err(err @ IngestError::TooFewColumns { .. }) => {
            ValidationIssue::error("PRE_HEADER_WIDTH", err.to_string())
        }
        Err(err @ IngestError::UnrecognisedFileName { .. }) => {
            ValidationIssue::error("PRE_UNRECOGNISED_INPUT", err.to_string())
        }
        Err(err) => ValidationIssue::error("PRE_UNREADABLE_INPUT", err.to_string()),
    };
    report.add(issue.with_table(input));
}
