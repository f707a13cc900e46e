//! Build orchestration.
//!
//! One build moves `PENDING -> BEFORE_TRIGGER -> RUNNING -> COMPLETED`, or to
//! `FAILED` from any non-terminal state. Inputs are gathered and checked
//! before the trigger. Tables are loaded by a bounded pool of scoped workers,
//! classification is merged into the inferred relationships, and only then
//! are release files written, packaged, validated and published.

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use rf2_model::{BuildStatus, ComponentType, ValidationReport};
use rf2_transform::TransformationFactory;
use rf2_validate::{check_preconditions, gate_release, write_validation_report_json};
use tracing::{Span, error, info, info_span};

use crate::collaborators::{Classification, Collaborators, StatusListener};
use crate::context::BuildContext;
use crate::release::{
    PreparedTable, TableRelease, existing_relationship_ids, resolve_model_concepts,
};
use crate::report::{BuildReport, checksum_files, write_build_report_json};

/// Terminal result of one build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build_id: String,
    pub status: BuildStatus,
    /// Full error chain when the build failed.
    pub failure: Option<String>,
    pub report: BuildReport,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Completed
    }
}

struct StatusTracker<'a> {
    ctx: &'a BuildContext,
    listeners: &'a [Arc<dyn StatusListener>],
    current: BuildStatus,
}

impl StatusTracker<'_> {
    fn advance(&mut self, next: BuildStatus, message: Option<&str>) -> Result<()> {
        if !self.current.can_transition_to(next) {
            bail!("illegal build status change {} -> {next}", self.current);
        }
        self.current = next;
        for listener in self.listeners {
            listener.status_changed(self.ctx, next, message);
        }
        Ok(())
    }
}

pub struct BuildOrchestrator {
    collaborators: Collaborators,
}

impl BuildOrchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Run a build to a terminal status. `cancel` is honoured before the
    /// trigger and before each table starts, never inside a table pass.
    pub fn run(&self, ctx: &BuildContext, cancel: &AtomicBool) -> BuildOutcome {
        let span = info_span!("build", build_id = %ctx.build_id, product = %ctx.product);
        let _guard = span.enter();

        let mut tracker = StatusTracker {
            ctx,
            listeners: &self.collaborators.listeners,
            current: BuildStatus::Pending,
        };
        let mut report = BuildReport {
            build_id: ctx.build_id.clone(),
            product: ctx.product.clone(),
            user: ctx.user.clone(),
            effective_time: ctx.effective_time().to_string(),
            status: BuildStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            model_concepts: None,
            tables: Vec::new(),
            files: Vec::new(),
            validation: Vec::new(),
            package: None,
            published: None,
        };

        let result = self
            .execute(ctx, cancel, &mut tracker, &mut report)
            .and_then(|()| tracker.advance(BuildStatus::Completed, None));
        let failure = match result {
            Ok(()) => None,
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "build failed");
                if let Err(status_err) = tracker.advance(BuildStatus::Failed, Some(&message)) {
                    error!(error = %status_err, "could not record failure");
                }
                Some(message)
            }
        };

        report.status = tracker.current;
        report.finished_at = Some(Utc::now());
        if let Some(package) = &report.package {
            if let Err(err) = write_build_report_json(package, &report) {
                error!(error = %format!("{err:#}"), "could not write build report");
            }
        }
        info!(status = %report.status, tables = report.tables.len(), "build finished");
        BuildOutcome {
            build_id: ctx.build_id.clone(),
            status: report.status,
            failure,
            report,
        }
    }

    fn execute(
        &self,
        ctx: &BuildContext,
        cancel: &AtomicBool,
        tracker: &mut StatusTracker<'_>,
        report: &mut BuildReport,
    ) -> Result<()> {
        tracker.advance(BuildStatus::BeforeTrigger, None)?;
        let input_dir = ctx.input_dir();
        let transformed_dir = ctx.transformed_dir();
        let output_dir = ctx.output_dir();
        for dir in [&transformed_dir, &output_dir] {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }

        let inputs = self.collaborators.gatherer.gather(ctx, &input_dir)?;
        info!(inputs = inputs.len(), "inputs ready");
        let preconditions = check_preconditions(&ctx.config, &input_dir)?;
        let blocked = gate(&preconditions, ctx.allow_validation_errors);
        report.validation.push(preconditions);
        if let Some(errors) = blocked {
            bail!("precondition checks failed with {errors} error(s)");
        }

        if cancel.load(Ordering::SeqCst) {
            bail!("build cancelled before trigger");
        }
        tracker.advance(BuildStatus::Running, None)?;

        let config = &ctx.config;
        let mut factory = TransformationFactory::new(ctx.effective_time(), config.module_ids.clone());
        if config.module_fix {
            let concepts = resolve_model_concepts(config, ctx.previous_release(), &input_dir)
                .context("resolve model module concepts")?;
            report.model_concepts = Some(concepts.len());
            factory = factory.with_model_concept_ids(concepts);
        }
        if let Some(module_id) = &config.module_id {
            factory = factory.with_extension_module_id(module_id.clone());
        }
        if let Some(previous) = ctx.previous_release() {
            let ids = existing_relationship_ids(config, previous)
                .context("load published relationship ids")?;
            if !ids.is_empty() {
                factory = factory.with_existing_uuid_map(ids);
            }
        }

        let release = TableRelease::new(
            config,
            &factory,
            ctx.previous_release(),
            &transformed_dir,
            &output_dir,
        );
        let requests: Vec<_> = config
            .tables
            .iter()
            .map(|table| (table.input.clone(), table))
            .collect();
        let mut prepared = run_tables(requests, ctx.table_workers, cancel, "release", |table| {
            release.prepare(&input_dir.join(&table.input), table)
        })?;

        if config.derivative {
            info!("derivative product, classification skipped");
        } else {
            let classification = self
                .collaborators
                .classifier
                .classify(ctx, &transformed_dir)
                .context("classification")?;
            merge_classification(&release, &mut prepared, classification)?;
        }

        let pending: Vec<_> = prepared
            .into_iter()
            .map(|table| (table.input().to_string(), table))
            .collect();
        report.tables = run_tables(pending, ctx.table_workers, cancel, "export", |table| {
            release.finish(table)
        })?;
        let files: Vec<_> = report
            .tables
            .iter()
            .flat_map(|table| table.files.iter().cloned())
            .collect();

        let package = self
            .collaborators
            .packager
            .package(ctx, &files)
            .context("packaging")?;
        report.package = Some(package.root.clone());
        report.files = checksum_files(&package.files)?;

        let postconditions = self
            .collaborators
            .validator
            .validate(ctx, &package)
            .context("release validation")?;
        let blocked = gate(&postconditions, ctx.allow_validation_errors);
        report.validation.push(postconditions);
        write_validation_report_json(
            &package.root,
            &ctx.product,
            ctx.effective_time(),
            &report.validation,
        )?;
        if let Some(errors) = blocked {
            bail!("postcondition checks failed with {errors} error(s)");
        }

        if let Some(publisher) = &self.collaborators.publisher {
            report.published = Some(publisher.publish(ctx, &package).context("publishing")?);
        }
        Ok(())
    }
}

/// Classifier output joins the manifest's inferred relationship table.
fn merge_classification(
    release: &TableRelease<'_>,
    prepared: &mut [PreparedTable],
    classification: Classification,
) -> Result<()> {
    if classification.is_empty() {
        return Ok(());
    }
    let rows = classification.inferred_delta.len();
    let Some(table) = prepared
        .iter_mut()
        .find(|table| table.component() == ComponentType::Relationship)
    else {
        bail!("classification returned {rows} inferred relationship(s) but no inferred relationship table is listed");
    };
    release.merge_classified(table, classification.inferred_delta)?;
    Ok(())
}

/// Run `work` over every table, `workers` at a time. Tables share no state,
/// so they may run side by side; the cancel flag is read before each table
/// starts and the first failure stops further tables from starting. Results
/// land in manifest order.
fn run_tables<I, T, F>(
    tables: Vec<(String, I)>,
    workers: usize,
    cancel: &AtomicBool,
    action: &str,
    work: F,
) -> Result<Vec<T>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> Result<T> + Sync,
{
    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let queue: Vec<(String, Mutex<Option<I>>)> = tables
        .into_iter()
        .map(|(label, table)| (label, Mutex::new(Some(table))))
        .collect();
    let slots: Vec<Mutex<Option<Result<T>>>> = queue.iter().map(|_| Mutex::new(None)).collect();

    let (next, stop, queue_ref, slots_ref, work) = (&next, &stop, &queue, &slots, &work);
    thread::scope(|scope| {
        for _ in 0..workers.clamp(1, queue.len().max(1)) {
            let parent = Span::current();
            scope.spawn(move || {
                let _guard = parent.enter();
                while !stop.load(Ordering::SeqCst) {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some((label, table)) = queue_ref.get(index) else {
                        break;
                    };
                    let table = table.lock().ok().and_then(|mut table| table.take());
                    let result = match table {
                        _ if cancel.load(Ordering::SeqCst) => {
                            Err(anyhow!("build cancelled before table {label}"))
                        }
                        Some(table) => work(table).with_context(|| format!("{action} {label}")),
                        None => Err(anyhow!("table {label} was already taken")),
                    };
                    if result.is_err() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    if let Ok(mut slot) = slots_ref[index].lock() {
                        *slot = Some(result);
                    }
                }
            });
        }
    });

    let mut results = Vec::with_capacity(slots.len());
    for slot in slots {
        let result = slot
            .into_inner()
            .map_err(|_| anyhow!("table worker panicked"))?;
        match result {
            Some(Ok(value)) => results.push(value),
            Some(Err(err)) => return Err(err),
            None => {}
        }
    }
    Ok(results)
}

/// Error count of a report that blocks the build.
fn gate(report: &ValidationReport, allow_errors: bool) -> Option<usize> {
    let decision = gate_release(std::slice::from_ref(report), allow_errors);
    decision.block_release.then(|| report.error_count())
}
