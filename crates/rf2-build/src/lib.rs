//! Release builds: per-table release passes, orchestration through
//! collaborators, and a worker queue.

pub mod collaborators;
pub mod context;
pub mod orchestrator;
pub mod queue;
pub mod release;
pub mod report;

pub use collaborators::{
    Classification, Classifier, Collaborators, DirectoryInputGatherer, DirectoryPackager, DirectoryPublisher,
    InputGatherer, InputInferredClassifier, Package, Packager, PostconditionValidator, Publisher,
    ReleaseValidator, StatusListener, TracingStatusListener,
};
pub use context::BuildContext;
pub use orchestrator::{BuildOrchestrator, BuildOutcome};
pub use queue::{BuildHandle, BuildQueue};
pub use release::{
    PreparedTable, TableOutcome, TableRelease, existing_relationship_ids, resolve_model_concepts,
};
pub use report::{
    BUILD_REPORT_FILE_NAME, BuildReport, FileChecksum, checksum_files, write_build_report_json,
};
