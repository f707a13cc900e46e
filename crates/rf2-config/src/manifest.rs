#![deny(unsafe_code)]

//! Release manifest as written by release managers.
//!
//! ```toml
//! [release]
//! product = "SNOMED CT International Edition"
//! effective_time = "20250131"
//! namespace = "INT"
//!
//! [[tables]]
//! input = "rel2_Concept_Delta_INT_20250131.txt"
//! outputs = ["full", "snapshot", "delta"]
//!
//! [composite_keys]
//! "447562003" = [5, 7, 10]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rf2_model::ReleaseKind;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub release: ReleaseHeader,
    #[serde(default)]
    pub tables: Vec<ManifestTable>,
    #[serde(default)]
    pub module_fix: Option<ModuleFixSection>,
    #[serde(default)]
    pub composite_keys: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    pub reconciliation: Option<ReconciliationSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseHeader {
    pub product: String,
    pub effective_time: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub release_center: Option<String>,
    #[serde(default)]
    pub first_time_release: bool,
    #[serde(default)]
    pub beta_release: bool,
    /// A derivative product carries its own module and namespace and is
    /// released without classification.
    #[serde(default)]
    pub derivative: bool,
    /// Module of the product's own content.
    #[serde(default)]
    pub module_id: Option<String>,
    /// Correct module tagging produced by workbench tooling.
    #[serde(default)]
    pub workbench_data_fixes: bool,
    /// Directory holding the previous release's Full files.
    #[serde(default)]
    pub previous_release: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTable {
    /// Input delta file name, e.g. `rel2_Concept_Delta_INT_20250131.txt`.
    pub input: String,
    #[serde(default = "default_outputs")]
    pub outputs: Vec<ReleaseKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFixSection {
    pub model_module_id: Option<String>,
    pub core_module_id: Option<String>,
    pub is_a_type_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub snapshot_active_only: bool,
    #[serde(default = "default_true")]
    pub discard_already_published: bool,
}

fn default_outputs() -> Vec<ReleaseKind> {
    ReleaseKind::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

pub fn load_manifest(path: &Path) -> Result<ReleaseManifest> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::io(path, source))?;
    toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}
