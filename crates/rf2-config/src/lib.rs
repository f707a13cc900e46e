#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;

use std::path::Path;

pub use crate::config::{
    BuildConfiguration, CompositeKeyConfig, EffectiveTime, ModuleIds, ReconciliationOptions,
    TableRequest,
};
pub use crate::error::{ConfigError, Result};
pub use crate::hash::{sha256_file, sha256_hex};
pub use crate::manifest::{ReleaseManifest, load_manifest};

/// Read a manifest and derive the build configuration from it.
pub fn load_build_configuration(path: &Path) -> Result<BuildConfiguration> {
    let manifest = load_manifest(path)?;
    BuildConfiguration::from_manifest(&manifest)
}
