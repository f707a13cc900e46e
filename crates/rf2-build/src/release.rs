//! Release files for one input table.
//!
//! A transformed delta is loaded into a table and repaired against the
//! previous release when workbench fixes are on. Once classification has
//! been merged in, the table is written out as the new Delta, merged with the
//! previous Full and written out again as Full and Snapshot.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use rf2_config::{BuildConfiguration, TableRequest};
use rf2_core::{
    ExportRequest, MemberIdReconciler, MemoryTableStore, ModuleResolver, ReconcileSummary,
    RepairSummary, TableStore, is_attribute_value_table, repair_empty_value_ids,
    write_table_file,
};
use rf2_ingest::{ContentKind, Rf2FileName, find_by_stem, read_header, read_tsv_path, recognise};
use rf2_model::{ComponentType, ReleaseKind, Row, TableSchema};
use rf2_transform::{TransformationFactory, published_relationship_ids};
use rf2_validate::PackagedFile;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

/// What happened to one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub input: String,
    pub component: ComponentType,
    pub first_release: bool,
    pub transformed_rows: usize,
    /// Identical input rows dropped while transforming.
    pub duplicates_dropped: usize,
    /// Rows added by the classifier.
    pub classified_rows: usize,
    pub delta_rows: usize,
    pub full_rows: usize,
    pub snapshot_rows: usize,
    pub reconcile: Option<ReconcileSummary>,
    pub repair: Option<RepairSummary>,
    pub discarded: usize,
    pub duration_ms: u128,
    #[serde(skip)]
    pub files: Vec<PackagedFile>,
}

/// Previous release files of one table.
#[derive(Debug, Default)]
struct PreviousFiles {
    full: Option<PathBuf>,
    snapshot: Option<PathBuf>,
}

/// A table loaded and repaired, waiting for its files to be written.
#[derive(Debug)]
pub struct PreparedTable {
    request: TableRequest,
    name: Rf2FileName,
    schema: TableSchema,
    store: MemoryTableStore,
    previous_full: Option<PathBuf>,
    outcome: TableOutcome,
    started: Instant,
}

impl PreparedTable {
    pub fn input(&self) -> &str {
        &self.request.input
    }

    pub fn component(&self) -> ComponentType {
        self.schema.component_type
    }
}

pub struct TableRelease<'a> {
    config: &'a BuildConfiguration,
    factory: &'a TransformationFactory,
    previous_release: Option<&'a Path>,
    transformed_dir: &'a Path,
    output_dir: &'a Path,
}

impl<'a> TableRelease<'a> {
    pub fn new(
        config: &'a BuildConfiguration,
        factory: &'a TransformationFactory,
        previous_release: Option<&'a Path>,
        transformed_dir: &'a Path,
        output_dir: &'a Path,
    ) -> Self {
        Self {
            config,
            factory,
            previous_release,
            transformed_dir,
            output_dir,
        }
    }

    /// Transform and load one input delta, then repair it against the
    /// previous release. Nothing is written to the output folder yet.
    pub fn prepare(&self, input: &Path, request: &TableRequest) -> Result<PreparedTable> {
        let started = Instant::now();
        let input_name = request.input.as_str();
        let span = info_span!("table", table = %input_name);
        let _guard = span.enter();

        let name = Rf2FileName::parse(input_name)?;
        let header = read_header(input)?;
        let schema = recognise(input_name, &header)?;

        let transformed = self.transformed_dir.join(input_name);
        let stats = self
            .factory
            .pipeline_for(&schema)
            .transform_file(input, &transformed)
            .with_context(|| format!("transform {input_name}"))?;

        let mut store = MemoryTableStore::new();
        store
            .create_table(input_name, &mut open(&transformed)?, true)
            .with_context(|| format!("load {input_name}"))?;

        let previous = self.previous_files(&name)?;
        let first_release = match (&previous.full, self.previous_release) {
            (Some(_), _) => false,
            (None, Some(dir)) => {
                warn!(
                    previous_release = %dir.display(),
                    "no previous full file, releasing table for the first time"
                );
                true
            }
            (None, None) => true,
        };

        let mut outcome = TableOutcome {
            input: input_name.to_string(),
            component: schema.component_type,
            first_release,
            transformed_rows: stats.rows,
            duplicates_dropped: stats.duplicates,
            classified_rows: 0,
            delta_rows: 0,
            full_rows: 0,
            snapshot_rows: 0,
            reconcile: None,
            repair: None,
            discarded: 0,
            duration_ms: 0,
            files: Vec::new(),
        };

        if self.config.workbench_data_fixes && !first_release {
            match &previous.snapshot {
                Some(path) => {
                    let previous_rows = read_tsv_path(path)
                        .with_context(|| format!("read previous snapshot {}", path.display()))?
                        .rows;
                    self.apply_workbench_fixes(&mut store, &schema, &previous_rows, &mut outcome)?;
                }
                None => warn!("no previous snapshot file, workbench fixes skipped"),
            }
        }

        debug!(rows = store.row_count(input_name)?, "table prepared");
        Ok(PreparedTable {
            request: request.clone(),
            name,
            schema,
            store,
            previous_full: previous.full,
            outcome,
            started,
        })
    }

    /// Add classifier output to a prepared table. Rows pass through the
    /// table's own pipeline first, so blank ids, moduleIds and
    /// effectiveTimes are filled the way input rows are.
    pub fn merge_classified(&self, table: &mut PreparedTable, rows: Vec<Row>) -> Result<usize> {
        let span = info_span!("table", table = %table.request.input);
        let _guard = span.enter();

        let pipeline = self.factory.pipeline_for(&table.schema);
        let mut seen = HashSet::new();
        let mut transformed = Vec::with_capacity(rows.len());
        for (index, mut row) in rows.into_iter().enumerate() {
            if row.len() != table.schema.column_count() {
                bail!(
                    "classified row {} has {} columns, {} has {}",
                    index + 1,
                    row.len(),
                    table.request.input,
                    table.schema.column_count()
                );
            }
            pipeline
                .transform_row(&mut row)
                .with_context(|| format!("transform classified row {}", index + 1))?;
            if seen.insert(row.clone()) {
                transformed.push(row);
            }
        }

        let merged = table
            .store
            .insert_or_merge(&table.request.input, transformed)
            .with_context(|| format!("merge classification into {}", table.request.input))?;
        table.outcome.classified_rows += merged;
        info!(rows = merged, "classified relationships merged");
        Ok(merged)
    }

    /// Write the Delta, fold in the previous Full and write Full and
    /// Snapshot.
    pub fn finish(&self, table: PreparedTable) -> Result<TableOutcome> {
        let PreparedTable {
            request,
            name,
            mut store,
            previous_full,
            mut outcome,
            started,
            ..
        } = table;
        let input_name = request.input.as_str();
        let span = info_span!("table", table = %input_name);
        let _guard = span.enter();

        if request.wants(ReleaseKind::Delta) {
            let (rows, file) = self.export(&store, &name, input_name, ReleaseKind::Delta)?;
            outcome.delta_rows = rows;
            outcome.files.push(file);
        }

        if let Some(full) = &previous_full {
            let appended = store
                .append(input_name, &mut open(full)?)
                .with_context(|| format!("append previous full {}", full.display()))?;
            debug!(rows = appended, "previous full appended");
        }

        if request.wants(ReleaseKind::Full) {
            let (rows, file) = self.export(&store, &name, input_name, ReleaseKind::Full)?;
            outcome.full_rows = rows;
            outcome.files.push(file);
        }
        if request.wants(ReleaseKind::Snapshot) {
            let (rows, file) = self.export(&store, &name, input_name, ReleaseKind::Snapshot)?;
            outcome.snapshot_rows = rows;
            outcome.files.push(file);
        }

        outcome.duration_ms = started.elapsed().as_millis();
        info!(
            rows = outcome.transformed_rows,
            delta_rows = outcome.delta_rows,
            full_rows = outcome.full_rows,
            snapshot_rows = outcome.snapshot_rows,
            duration_ms = outcome.duration_ms,
            "table released"
        );
        Ok(outcome)
    }

    fn apply_workbench_fixes(
        &self,
        store: &mut MemoryTableStore,
        schema: &TableSchema,
        previous_rows: &[Row],
        outcome: &mut TableOutcome,
    ) -> Result<()> {
        let table = schema.filename.as_str();
        let effective_time = self.config.effective_time.as_str();
        let mut delta: Option<Vec<Row>> = None;

        if schema.component_type == ComponentType::Refset && self.config.reconciliation.enabled {
            let rows = store.take_effective_time(table, effective_time)?;
            let reconciled =
                MemberIdReconciler::new(schema, &self.config.composite_keys, effective_time)
                    .reconcile(Some(previous_rows), rows)?;
            outcome.reconcile = Some(reconciled.summary);
            delta = Some(reconciled.rows);
        }

        if is_attribute_value_table(table) {
            let rows = match delta.take() {
                Some(rows) => rows,
                None => store.take_effective_time(table, effective_time)?,
            };
            let (rows, summary) = repair_empty_value_ids(previous_rows, rows);
            info!(filled = summary.filled, dropped = summary.dropped, "empty value ids repaired");
            outcome.repair = Some(summary);
            delta = Some(rows);
        }

        if let Some(rows) = delta {
            store.insert_or_merge(table, rows)?;
        }

        if self.config.reconciliation.discard_already_published {
            outcome.discarded =
                store.discard_already_published(table, previous_rows, effective_time)?;
            if outcome.discarded > 0 {
                info!(rows = outcome.discarded, "already published states discarded");
            }
        }
        Ok(())
    }

    fn export(
        &self,
        store: &MemoryTableStore,
        name: &Rf2FileName,
        table: &str,
        kind: ReleaseKind,
    ) -> Result<(usize, PackagedFile)> {
        let output = Rf2FileName {
            beta: self.config.beta_release,
            ..name.derive(kind)
        };
        let path = self.output_dir.join(output.to_string());
        let request = ExportRequest {
            kind,
            effective_time: self.config.effective_time.as_str(),
            snapshot_active_only: self.config.reconciliation.snapshot_active_only,
        };
        let rows = write_table_file(store, table, request, &path)
            .with_context(|| format!("write {}", path.display()))?;
        let file = PackagedFile {
            table: table.to_string(),
            kind,
            path,
        };
        Ok((rows, file))
    }

    fn previous_files(&self, name: &Rf2FileName) -> Result<PreviousFiles> {
        let Some(dir) = self.previous_release else {
            return Ok(PreviousFiles::default());
        };
        let find = |kind: ReleaseKind| -> Result<Option<PathBuf>> {
            let stem = name.derive(kind).without_beta().release_independent_stem();
            let found = find_previous(dir, kind, &stem)
                .with_context(|| format!("search previous release {}", dir.display()))?;
            debug!(%stem, found = ?found, "previous release file");
            Ok(found)
        };
        Ok(PreviousFiles {
            full: find(ReleaseKind::Full)?,
            snapshot: find(ReleaseKind::Snapshot)?,
        })
    }
}

/// Look in the `Full`/`Snapshot` folder of a packaged release first, then in
/// `dir` itself.
fn find_previous(dir: &Path, kind: ReleaseKind, stem: &str) -> Result<Option<PathBuf>> {
    let packaged = dir.join(kind.as_str());
    if packaged.is_dir() {
        if let Some(found) = find_by_stem(&packaged, stem)? {
            return Ok(Some(found));
        }
    }
    Ok(find_by_stem(dir, stem)?)
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Model module concepts for the moduleId correction: seeded from the
/// previous stated relationship Snapshot, extended with the stated delta.
pub fn resolve_model_concepts(
    config: &BuildConfiguration,
    previous_release: Option<&Path>,
    input_dir: &Path,
) -> Result<BTreeSet<String>> {
    let resolver = ModuleResolver::new(&config.module_ids);
    let stated = config.tables.iter().find_map(|table| {
        Rf2FileName::parse(&table.input)
            .ok()
            .filter(|name| name.content_kind() == Some(ContentKind::StatedRelationship))
            .map(|name| (table.input.as_str(), name))
    });
    let Some((input_name, name)) = stated else {
        warn!("module fix requested but the manifest has no stated relationship delta");
        return Ok(BTreeSet::new());
    };

    let snapshot_stem = name
        .derive(ReleaseKind::Snapshot)
        .without_beta()
        .release_independent_stem();
    let snapshot = match previous_release {
        Some(dir) => find_previous(dir, ReleaseKind::Snapshot, &snapshot_stem)?,
        None => None,
    };
    let mut concepts = match &snapshot {
        Some(path) => resolver.existing_model_concept_ids(&snapshot_stem, &mut open(path)?)?,
        None => {
            warn!(
                stem = %snapshot_stem,
                "no previous stated relationship snapshot, seeding model concepts empty"
            );
            BTreeSet::new()
        }
    };

    let delta = input_dir.join(input_name);
    if delta.is_file() {
        let added =
            resolver.add_new_model_concept_ids(&mut concepts, input_name, &mut open(&delta)?)?;
        info!(added, total = concepts.len(), "model concepts resolved");
    }
    Ok(concepts)
}

/// SCTIDs of the relationships the previous release published, keyed by
/// their repeatable UUID, read from the previous inferred relationship
/// Snapshot.
pub fn existing_relationship_ids(
    config: &BuildConfiguration,
    previous_release: &Path,
) -> Result<HashMap<String, String>> {
    let inferred = config.tables.iter().find_map(|table| {
        Rf2FileName::parse(&table.input)
            .ok()
            .filter(|name| name.content_kind() == Some(ContentKind::Relationship))
    });
    let Some(name) = inferred else {
        return Ok(HashMap::new());
    };

    let stem = name
        .derive(ReleaseKind::Snapshot)
        .without_beta()
        .release_independent_stem();
    let Some(snapshot) = find_previous(previous_release, ReleaseKind::Snapshot, &stem)? else {
        warn!(%stem, "no previous inferred relationship snapshot, relationship ids start fresh");
        return Ok(HashMap::new());
    };
    let rows = read_tsv_path(&snapshot)
        .with_context(|| format!("read previous snapshot {}", snapshot.display()))?
        .rows;
    let ids = published_relationship_ids(&rows)
        .with_context(|| format!("map relationship ids of {}", snapshot.display()))?;
    info!(ids = ids.len(), "published relationship ids loaded");
    Ok(ids)
}
