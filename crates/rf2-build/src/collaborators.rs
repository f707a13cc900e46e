//! Services a build hands work to.
//!
//! Classification, release validation, packaging and publishing live outside
//! the table engine. Each is a trait here; the `Directory*` and local
//! implementations work against plain folders so a build can run offline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rf2_model::{BuildStatus, Row, ValidationReport};
use rf2_validate::{PackagedFile, check_postconditions};
use tracing::{info, warn};

use crate::context::BuildContext;

/// Files of a finished release package.
#[derive(Debug, Clone)]
pub struct Package {
    pub root: PathBuf,
    pub files: Vec<PackagedFile>,
}

pub trait InputGatherer: Send + Sync {
    /// Copy the build's input deltas into `dir` and return their paths.
    fn gather(&self, ctx: &BuildContext, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Inferred relationship changes produced by classification.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Rows for this release's inferred relationship Delta. Ids, moduleIds
    /// and effectiveTimes may be left blank.
    pub inferred_delta: Vec<Row>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.inferred_delta.is_empty()
    }
}

pub trait Classifier: Send + Sync {
    /// Classify the transformed stated relationships in `transformed_dir`.
    /// Called before any release file is written.
    fn classify(&self, ctx: &BuildContext, transformed_dir: &Path) -> Result<Classification>;
}

pub trait Packager: Send + Sync {
    fn package(&self, ctx: &BuildContext, files: &[PackagedFile]) -> Result<Package>;
}

pub trait ReleaseValidator: Send + Sync {
    fn validate(&self, ctx: &BuildContext, package: &Package) -> Result<ValidationReport>;
}

pub trait Publisher: Send + Sync {
    fn publish(&self, ctx: &BuildContext, package: &Package) -> Result<PathBuf>;
}

pub trait StatusListener: Send + Sync {
    fn status_changed(&self, ctx: &BuildContext, status: BuildStatus, message: Option<&str>);
}

/// The full set of collaborators for one orchestrator.
pub struct Collaborators {
    pub gatherer: Box<dyn InputGatherer>,
    pub classifier: Box<dyn Classifier>,
    pub packager: Box<dyn Packager>,
    pub validator: Box<dyn ReleaseValidator>,
    pub publisher: Option<Box<dyn Publisher>>,
    pub listeners: Vec<Arc<dyn StatusListener>>,
}

impl Collaborators {
    /// Directory-backed collaborators: inputs from `input_dir`, packages
    /// under `output_dir`.
    pub fn local(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            gatherer: Box::new(DirectoryInputGatherer::new(input_dir)),
            classifier: Box::new(InputInferredClassifier),
            packager: Box::new(DirectoryPackager::new(output_dir)),
            validator: Box::new(PostconditionValidator),
            publisher: None,
            listeners: vec![Arc::new(TracingStatusListener)],
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

/// Copies the manifest's input files from a source directory.
#[derive(Debug, Clone)]
pub struct DirectoryInputGatherer {
    source: PathBuf,
}

impl DirectoryInputGatherer {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

impl InputGatherer for DirectoryInputGatherer {
    fn gather(&self, ctx: &BuildContext, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let mut gathered = Vec::new();
        for table in &ctx.config.tables {
            let source = self.source.join(&table.input);
            if !source.is_file() {
                // Reported by the precondition gate.
                warn!(file = %table.input, "input not found");
                continue;
            }
            let target = dir.join(&table.input);
            fs::copy(&source, &target)
                .with_context(|| format!("copy {} to {}", source.display(), target.display()))?;
            gathered.push(target);
        }
        info!(files = gathered.len(), source = %self.source.display(), "inputs gathered");
        Ok(gathered)
    }
}

/// Stands in for the external classifier: inferred relationships are taken
/// from the input as delivered.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputInferredClassifier;

impl Classifier for InputInferredClassifier {
    fn classify(&self, ctx: &BuildContext, _transformed_dir: &Path) -> Result<Classification> {
        info!(build_id = %ctx.build_id, "classification skipped, using inferred relationships from input");
        Ok(Classification::default())
    }
}

/// Lays the release out as `<package>/<Full|Snapshot|Delta>/<file>`.
#[derive(Debug, Clone)]
pub struct DirectoryPackager {
    output_dir: PathBuf,
}

impl DirectoryPackager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Packager for DirectoryPackager {
    fn package(&self, ctx: &BuildContext, files: &[PackagedFile]) -> Result<Package> {
        let root = self.output_dir.join(ctx.package_name());
        if root.exists() {
            fs::remove_dir_all(&root)
                .with_context(|| format!("clear previous package {}", root.display()))?;
        }
        let mut packaged = Vec::with_capacity(files.len());
        for file in files {
            let dir = root.join(file.kind.as_str());
            fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
            let file_name = file
                .path
                .file_name()
                .with_context(|| format!("no file name in {}", file.path.display()))?;
            let target = dir.join(file_name);
            fs::copy(&file.path, &target)
                .with_context(|| format!("package {}", file.path.display()))?;
            packaged.push(PackagedFile {
                path: target,
                ..file.clone()
            });
        }
        info!(files = packaged.len(), package = %root.display(), "release packaged");
        Ok(Package {
            root,
            files: packaged,
        })
    }
}

/// Checks the package against the release postconditions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostconditionValidator;

impl ReleaseValidator for PostconditionValidator {
    fn validate(&self, ctx: &BuildContext, package: &Package) -> Result<ValidationReport> {
        check_postconditions(ctx.effective_time(), &package.files)
    }
}

/// Copies a finished package into a publication directory.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    target: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, ctx: &BuildContext, package: &Package) -> Result<PathBuf> {
        let destination = self.target.join(ctx.package_name());
        if destination.exists() {
            anyhow::bail!(
                "{} is already published at {}",
                ctx.package_name(),
                destination.display()
            );
        }
        copy_tree(&package.root, &destination)?;
        info!(destination = %destination.display(), "package published");
        Ok(destination)
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("create {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("read {}", from.display()))? {
        let entry = entry?;
        let path = entry.path();
        let target = to.join(entry.file_name());
        if path.is_dir() {
            copy_tree(&path, &target)?;
        } else {
            fs::copy(&path, &target).with_context(|| format!("copy {}", path.display()))?;
        }
    }
    Ok(())
}

/// Logs every status change.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusListener;

impl StatusListener for TracingStatusListener {
    fn status_changed(&self, ctx: &BuildContext, status: BuildStatus, message: Option<&str>) {
        match (status, message) {
            (BuildStatus::Failed, Some(message)) => {
                tracing::error!(build_id = %ctx.build_id, %status, %message, "build status changed");
            }
            (_, Some(message)) => {
                info!(build_id = %ctx.build_id, %status, %message, "build status changed");
            }
            (_, None) => info!(build_id = %ctx.build_id, %status, "build status changed"),
        }
    }
}
