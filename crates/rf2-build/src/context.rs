use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rf2_config::BuildConfiguration;
use rf2_model::constants::BETA_RELEASE_PREFIX;

/// Everything one build needs to know about itself, passed explicitly to
/// every stage.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Creation time of the build, e.g. `2025-01-31T09:51:23`.
    pub build_id: String,
    pub product: String,
    /// Who asked for the build.
    pub user: String,
    pub config: BuildConfiguration,
    /// Scratch directory owned by this build.
    pub workspace: PathBuf,
    /// Continue past failed validation gates.
    pub allow_validation_errors: bool,
    /// Tables released side by side within this build.
    pub table_workers: usize,
    pub created_at: DateTime<Utc>,
}

impl BuildContext {
    pub fn new(config: BuildConfiguration, user: impl Into<String>, workspace: PathBuf) -> Self {
        let created_at = Utc::now();
        Self {
            build_id: created_at.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            product: config.product.clone(),
            user: user.into(),
            config,
            workspace,
            allow_validation_errors: false,
            table_workers: 1,
            created_at,
        }
    }

    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = build_id.into();
        self
    }

    pub fn allowing_validation_errors(mut self, allow: bool) -> Self {
        self.allow_validation_errors = allow;
        self
    }

    pub fn with_table_workers(mut self, workers: usize) -> Self {
        self.table_workers = workers.max(1);
        self
    }

    pub fn effective_time(&self) -> &str {
        self.config.effective_time.as_str()
    }

    pub fn input_dir(&self) -> PathBuf {
        self.workspace.join("input")
    }

    pub fn transformed_dir(&self) -> PathBuf {
        self.workspace.join("transformed")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.workspace.join("output")
    }

    pub fn previous_release(&self) -> Option<&Path> {
        if self.config.first_time_release {
            None
        } else {
            self.config.previous_release.as_deref()
        }
    }

    /// Folder name of the release package.
    pub fn package_name(&self) -> String {
        let product: String = self
            .product
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let prefix = if self.config.beta_release {
            BETA_RELEASE_PREFIX
        } else {
            ""
        };
        format!("{prefix}{product}_{}", self.effective_time())
    }
}
