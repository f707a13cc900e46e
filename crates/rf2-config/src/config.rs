#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use rf2_model::ReleaseKind;
use rf2_model::constants::{
    INTERNATIONAL_CORE_MODULE_ID, INTERNATIONAL_MODEL_COMPONENT_ID, IS_A,
    REFSET_ADMINISTRATIVE_COLUMNS,
};
use serde::Serialize;

use crate::error::{ConfigError, Result};
use crate::manifest::ReleaseManifest;

const EFFECTIVE_TIME_FORMAT: &str = "%Y%m%d";

/// Validated release date in RF2 `yyyyMMdd` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EffectiveTime {
    text: String,
    #[serde(skip)]
    date: NaiveDate,
}

impl EffectiveTime {
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let invalid = || ConfigError::InvalidEffectiveTime {
            value: value.to_string(),
        };
        if trimmed.len() != 8 {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(trimmed, EFFECTIVE_TIME_FORMAT).map_err(|_| invalid())?;
        Ok(Self {
            text: trimmed.to_string(),
            date,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// ISO form used in report file names.
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleIds {
    pub model_module_id: String,
    pub core_module_id: String,
    pub is_a_type_id: String,
}

impl Default for ModuleIds {
    fn default() -> Self {
        Self {
            model_module_id: INTERNATIONAL_MODEL_COMPONENT_ID.to_string(),
            core_module_id: INTERNATIONAL_CORE_MODULE_ID.to_string(),
            is_a_type_id: IS_A.to_string(),
        }
    }
}

/// Refset-specific composite key columns, `refsetId -> column indexes`.
///
/// Indexes are zero-based positions in the row. The refsetId column is
/// always part of the key and never listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompositeKeyConfig {
    columns: BTreeMap<String, Vec<usize>>,
}

impl CompositeKeyConfig {
    pub fn new(columns: BTreeMap<String, Vec<usize>>) -> Result<Self> {
        for (refset_id, indexes) in &columns {
            if indexes.is_empty() {
                return Err(ConfigError::InvalidCompositeKey {
                    refset_id: refset_id.clone(),
                    message: "no column indexes given".to_string(),
                });
            }
            if let Some(index) = indexes
                .iter()
                .find(|index| **index <= REFSET_ADMINISTRATIVE_COLUMNS)
            {
                return Err(ConfigError::InvalidCompositeKey {
                    refset_id: refset_id.clone(),
                    message: format!("column {index} is an administrative column"),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns_for(&self, refset_id: &str) -> Option<&[usize]> {
        self.columns.get(refset_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOptions {
    pub enabled: bool,
    pub snapshot_active_only: bool,
    pub discard_already_published: bool,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            snapshot_active_only: false,
            discard_already_published: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRequest {
    pub input: String,
    pub outputs: Vec<ReleaseKind>,
}

impl TableRequest {
    pub fn wants(&self, kind: ReleaseKind) -> bool {
        self.outputs.contains(&kind)
    }
}

/// Everything a build needs to know about the release it produces.
///
/// Built once from the manifest and handed explicitly to every stage.
#[derive(Debug, Clone, Serialize)]
pub struct BuildConfiguration {
    pub product: String,
    pub effective_time: EffectiveTime,
    pub namespace: Option<String>,
    pub release_center: Option<String>,
    pub first_time_release: bool,
    pub beta_release: bool,
    pub derivative: bool,
    pub module_id: Option<String>,
    pub workbench_data_fixes: bool,
    pub previous_release: Option<PathBuf>,
    /// Correct moduleIds against the resolved model module concepts.
    pub module_fix: bool,
    pub module_ids: ModuleIds,
    pub composite_keys: CompositeKeyConfig,
    pub reconciliation: ReconciliationOptions,
    pub tables: Vec<TableRequest>,
}

impl BuildConfiguration {
    pub fn from_manifest(manifest: &ReleaseManifest) -> Result<Self> {
        let header = &manifest.release;
        if header.product.trim().is_empty() {
            return Err(ConfigError::invalid_manifest("release.product must not be empty"));
        }
        let effective_time = EffectiveTime::parse(&header.effective_time)?;

        let mut module_ids = ModuleIds::default();
        if let Some(fix) = &manifest.module_fix {
            if let Some(id) = &fix.model_module_id {
                module_ids.model_module_id = id.clone();
            }
            if let Some(id) = &fix.core_module_id {
                module_ids.core_module_id = id.clone();
            }
            if let Some(id) = &fix.is_a_type_id {
                module_ids.is_a_type_id = id.clone();
            }
        }

        let reconciliation = manifest
            .reconciliation
            .as_ref()
            .map(|section| ReconciliationOptions {
                enabled: section.enabled,
                snapshot_active_only: section.snapshot_active_only,
                discard_already_published: section.discard_already_published,
            })
            .unwrap_or_default();

        let mut tables = Vec::with_capacity(manifest.tables.len());
        for table in &manifest.tables {
            if table.outputs.is_empty() {
                return Err(ConfigError::invalid_manifest(format!(
                    "table {} requests no outputs",
                    table.input
                )));
            }
            tables.push(TableRequest {
                input: table.input.clone(),
                outputs: table.outputs.clone(),
            });
        }

        Ok(Self {
            product: header.product.clone(),
            effective_time,
            namespace: header.namespace.clone(),
            release_center: header.release_center.clone(),
            first_time_release: header.first_time_release,
            beta_release: header.beta_release,
            derivative: header.derivative,
            module_id: header
                .module_id
                .as_ref()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            workbench_data_fixes: header.workbench_data_fixes,
            previous_release: header.previous_release.clone(),
            module_fix: manifest.module_fix.is_some(),
            module_ids,
            composite_keys: CompositeKeyConfig::new(manifest.composite_keys.clone())?,
            reconciliation,
            tables,
        })
    }

    /// Override the effective time, e.g. from the command line.
    pub fn with_effective_time(mut self, value: &str) -> Result<Self> {
        self.effective_time = EffectiveTime::parse(value)?;
        Ok(self)
    }

    pub fn table(&self, input: &str) -> Option<&TableRequest> {
        self.tables.iter().find(|table| table.input == input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_time_requires_calendar_date() {
        assert!(EffectiveTime::parse("20250131").is_ok());
        assert!(EffectiveTime::parse("20250231").is_err());
        assert!(EffectiveTime::parse("2025-01-31").is_err());
        assert!(EffectiveTime::parse("250131").is_err());
        assert_eq!(
            EffectiveTime::parse("20250131").expect("valid").iso(),
            "2025-01-31"
        );
    }

    #[test]
    fn composite_keys_reject_administrative_columns() {
        let mut columns = BTreeMap::new();
        columns.insert("447562003".to_string(), vec![2, 5]);
        assert!(matches!(
            CompositeKeyConfig::new(columns),
            Err(ConfigError::InvalidCompositeKey { .. })
        ));
    }

    #[test]
    fn composite_keys_lookup() {
        let mut columns = BTreeMap::new();
        columns.insert("447562003".to_string(), vec![5, 7]);
        let config = CompositeKeyConfig::new(columns).expect("valid");
        assert_eq!(config.columns_for("447562003"), Some(&[5, 7][..]));
        assert_eq!(config.columns_for("1"), None);
    }
}
