use std::path::PathBuf;

use rf2_build::BuildOutcome;
use rf2_model::{ComponentType, IdType, ReleaseKind};

#[derive(Debug)]
pub struct BuildResult {
    pub manifest: PathBuf,
    pub outcome: BuildOutcome,
}

impl BuildResult {
    pub fn has_errors(&self) -> bool {
        !self.outcome.is_success()
    }
}

#[derive(Debug, Clone)]
pub struct InspectedFile {
    pub name: String,
    pub component: Option<ComponentType>,
    pub id_type: Option<IdType>,
    pub columns: usize,
    pub kind: Option<ReleaseKind>,
    /// Why the file was not recognised.
    pub problem: Option<String>,
}
