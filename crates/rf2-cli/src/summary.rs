use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use rf2_build::{BuildOutcome, TableOutcome};
use rf2_model::{BuildStatus, CheckStage, IdType, IssueSeverity, ValidationIssue};

use crate::types::{BuildResult, InspectedFile};

pub fn print_build_summary(result: &BuildResult) {
    let outcome = &result.outcome;
    let report = &outcome.report;
    println!("Manifest: {}", result.manifest.display());
    println!("Build: {} ({})", outcome.build_id, report.product);
    println!("Effective time: {}", report.effective_time);
    println!("Status: {}", outcome.status);
    if let Some(count) = report.model_concepts {
        println!("Model module concepts: {count}");
    }
    if let Some(path) = &report.package {
        println!("Package: {}", path.display());
    }
    if let Some(path) = &report.published {
        println!("Published: {}", path.display());
    }
    if !report.tables.is_empty() {
        println!("{}", tables_table(outcome));
    }
    if let Some(table) = issue_table(outcome) {
        println!();
        println!("Issues:");
        println!("{table}");
    }
    if let Some(failure) = &outcome.failure {
        eprintln!("error: {failure}");
    }
}

/// Per-table row counts with a total row.
pub fn tables_table(outcome: &BuildOutcome) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Component"),
        header_cell("First"),
        header_cell("Input"),
        header_cell("Delta"),
        header_cell("Full"),
        header_cell("Snapshot"),
        header_cell("Reused"),
        header_cell("Discarded"),
        header_cell("ms"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..10 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 2, CellAlignment::Center);

    let tables = &outcome.report.tables;
    for summary in tables {
        table.add_row(vec![
            Cell::new(&summary.input)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(summary.component),
            first_release_cell(summary.first_release),
            Cell::new(summary.transformed_rows),
            Cell::new(summary.delta_rows),
            Cell::new(summary.full_rows),
            Cell::new(summary.snapshot_rows),
            reused_cell(summary),
            count_cell(summary.discarded, Color::Yellow),
            dim_cell(summary.duration_ms),
        ]);
    }
    let total = |rows: fn(&TableOutcome) -> usize| tables.iter().map(rows).sum::<usize>();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} tables", tables.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total(|t| t.transformed_rows)).add_attribute(Attribute::Bold),
        Cell::new(total(|t| t.delta_rows)).add_attribute(Attribute::Bold),
        Cell::new(total(|t| t.full_rows)).add_attribute(Attribute::Bold),
        Cell::new(total(|t| t.snapshot_rows)).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total(|t| t.discarded), Color::Yellow).add_attribute(Attribute::Bold),
        status_cell(outcome.status),
    ]);
    table
}

/// Validation issues, errors first; `None` when the build raised none.
pub fn issue_table(outcome: &BuildOutcome) -> Option<Table> {
    let mut issues: Vec<(CheckStage, &ValidationIssue)> = outcome
        .report
        .validation
        .iter()
        .flat_map(|report| report.issues.iter().map(move |issue| (report.stage, issue)))
        .collect();
    if issues.is_empty() {
        return None;
    }
    issues.sort_by_key(|(_, issue)| severity_rank(issue.severity));

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Table"),
        header_cell("Count"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    for (stage, issue) in issues {
        table.add_row(vec![
            Cell::new(stage_label(stage)),
            severity_cell(issue.severity),
            Cell::new(&issue.code),
            issue
                .table
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            issue.count.map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    Some(table)
}

pub fn print_inspection(files: &[InspectedFile]) {
    println!("{}", inspection_table(files));
    let unrecognised = files.iter().filter(|file| file.problem.is_some()).count();
    if unrecognised > 0 {
        eprintln!("{unrecognised} file(s) not recognised");
    }
}

pub fn inspection_table(files: &[InspectedFile]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Component"),
        header_cell("Kind"),
        header_cell("Id"),
        header_cell("Columns"),
        header_cell("Problem"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 4, CellAlignment::Right);
    for file in files {
        table.add_row(vec![
            Cell::new(&file.name),
            file.component.map_or_else(|| dim_cell("-"), Cell::new),
            file.kind.map_or_else(|| dim_cell("-"), Cell::new),
            file.id_type
                .map_or_else(|| dim_cell("-"), |id_type| Cell::new(id_label(id_type))),
            if file.columns > 0 {
                Cell::new(file.columns)
            } else {
                dim_cell("-")
            },
            file.problem
                .as_deref()
                .map_or_else(|| dim_cell("-"), |problem| Cell::new(problem).fg(Color::Red)),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(165);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn first_release_cell(first: bool) -> Cell {
    if first {
        Cell::new("yes").fg(Color::Yellow)
    } else {
        dim_cell("no")
    }
}

fn reused_cell(summary: &TableOutcome) -> Cell {
    match &summary.reconcile {
        Some(reconcile) => Cell::new(reconcile.reused()),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn status_cell(status: BuildStatus) -> Cell {
    let color = match status {
        BuildStatus::Completed => Color::Green,
        BuildStatus::Failed => Color::Red,
        _ => Color::Yellow,
    };
    Cell::new(status).fg(color).add_attribute(Attribute::Bold)
}

fn stage_label(stage: CheckStage) -> &'static str {
    match stage {
        CheckStage::Precondition => "pre",
        CheckStage::Postcondition => "post",
    }
}

fn id_label(id_type: IdType) -> &'static str {
    match id_type {
        IdType::Sctid => "SCTID",
        IdType::Uuid => "UUID",
        IdType::SctidOrUuid => "SCTID/UUID",
    }
}

fn severity_rank(severity: IssueSeverity) -> u8 {
    match severity {
        IssueSeverity::Error => 0,
        IssueSeverity::Warning => 1,
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
