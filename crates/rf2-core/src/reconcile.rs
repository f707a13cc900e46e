//! Member identifier reconciliation for reference set deltas.
//!
//! Authoring tools regenerate refset members every release without keeping
//! their ids. Before a delta is merged, each member is matched against the
//! previous release's Snapshot so that an unchanged member keeps the id it
//! was published with, and only genuinely new members get new ids.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rf2_config::CompositeKeyConfig;
use rf2_model::constants::{
    ASSOCIATION_REFERENCE_FILE_IDENTIFIER, ATTRIBUTE_VALUE_FILE_IDENTIFIER,
    COMPLEX_MAP_FILE_IDENTIFIER, EXTENDED_MAP_FILE_IDENTIFIER, MODULE_DEPENDENCY_FILE_IDENTIFIER,
    REFERENCE_SET_DESCRIPTOR_FILE_IDENTIFIER, REFSET_ADMINISTRATIVE_COLUMNS, REFSET_ID_COLUMN,
    SIMPLE_MAP_FILE_IDENTIFIER,
};
use rf2_model::row::{is_active, is_blank};
use rf2_model::{Result, Rf2Error, Row, TableSchema};
use rf2_transform::member_uuid;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

/// Counts of what a reconciliation pass did to a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub reused_by_fingerprint: usize,
    pub reused_by_business_key: usize,
    pub synthesized: usize,
    pub kept: usize,
    pub duplicates_dropped: usize,
}

impl ReconcileSummary {
    pub fn reused(&self) -> usize {
        self.reused_by_fingerprint + self.reused_by_business_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub rows: Vec<Row>,
    pub summary: ReconcileSummary,
}

#[derive(Debug, Clone)]
struct Candidate {
    id: String,
    effective_time: String,
}

/// Insert keeping the most recently effective candidate; on equal
/// effectiveTime the first one seen stays.
fn offer<K: Eq + std::hash::Hash>(map: &mut HashMap<K, Candidate>, key: K, row: &[String]) {
    let candidate = Candidate {
        id: row[0].clone(),
        effective_time: row[1].clone(),
    };
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(candidate);
        }
        Entry::Occupied(mut slot) => {
            if candidate.effective_time > slot.get().effective_time {
                slot.insert(candidate);
            }
        }
    }
}

/// Reconciles one reference set table.
#[derive(Debug, Clone)]
pub struct MemberIdReconciler<'a> {
    schema: &'a TableSchema,
    composite_keys: &'a CompositeKeyConfig,
    default_columns: &'static [usize],
    effective_time: String,
}

impl<'a> MemberIdReconciler<'a> {
    pub fn new(
        schema: &'a TableSchema,
        composite_keys: &'a CompositeKeyConfig,
        effective_time: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            composite_keys,
            default_columns: default_key_columns(&schema.filename),
            effective_time: effective_time.into(),
        }
    }

    /// Columns forming the business key of a member, refsetId first.
    pub fn key_columns(&self, refset_id: &str) -> Result<Vec<usize>> {
        let extra = self
            .composite_keys
            .columns_for(refset_id)
            .unwrap_or(self.default_columns);
        let mut columns = vec![REFSET_ID_COLUMN];
        columns.extend(extra.iter().copied().filter(|c| *c != REFSET_ID_COLUMN));
        let width = self.schema.column_count();
        if let Some(column) = columns.iter().find(|c| **c >= width) {
            return Err(Rf2Error::bad_configuration(format!(
                "composite key column {column} for refset {refset_id} is outside {} ({width} columns)",
                self.schema.filename
            )));
        }
        Ok(columns)
    }

    fn business_key(&self, row: &[String]) -> Result<Vec<String>> {
        let refset_id = row.get(REFSET_ID_COLUMN).map_or("", String::as_str);
        let columns = self.key_columns(refset_id)?;
        Ok(columns.iter().map(|c| row[*c].clone()).collect())
    }

    fn check_width(&self, row: &[String]) -> Result<()> {
        if row.len() != self.schema.column_count() {
            return Err(Rf2Error::malformed_table(
                self.schema.filename.clone(),
                format!(
                    "row has {} columns, schema has {}",
                    row.len(),
                    self.schema.column_count()
                ),
            ));
        }
        Ok(())
    }

    /// Assign stable ids to `delta` using the previous Snapshot.
    ///
    /// `None` for the previous Snapshot means a first release: nothing can be
    /// reused and every member without an id gets a fresh one.
    pub fn reconcile(&self, previous_snapshot: Option<&[Row]>, delta: Vec<Row>) -> Result<Reconciled> {
        let span = info_span!("reconcile", table = %self.schema.filename);
        let _guard = span.enter();

        let mut by_fingerprint: HashMap<Vec<String>, Candidate> = HashMap::new();
        let mut by_business_key: HashMap<Vec<String>, Candidate> = HashMap::new();
        match previous_snapshot {
            Some(rows) => {
                for row in rows {
                    self.check_width(row)?;
                    offer(&mut by_business_key, self.business_key(row)?, row);
                    if is_active(row) {
                        offer(
                            &mut by_fingerprint,
                            row[REFSET_ADMINISTRATIVE_COLUMNS..].to_vec(),
                            row,
                        );
                    }
                }
                debug!(
                    previous_rows = rows.len(),
                    fingerprints = by_fingerprint.len(),
                    business_keys = by_business_key.len(),
                    "previous snapshot indexed"
                );
            }
            None => info!("no previous snapshot, treating as first release"),
        }

        let mut summary = ReconcileSummary::default();
        let mut slots: Vec<Option<Row>> = Vec::with_capacity(delta.len());
        let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
        for row in delta {
            self.check_width(&row)?;
            let key = self.business_key(&row)?;
            if let Some(position) = positions.get(&key).copied() {
                warn!(business_key = %key.join("|"), "duplicate member in delta, keeping the later row");
                slots[position] = None;
                summary.duplicates_dropped += 1;
            }
            positions.insert(key, slots.len());
            slots.push(Some(row));
        }

        let mut rows = Vec::with_capacity(slots.len());
        for mut row in slots.into_iter().flatten() {
            let fingerprint = &row[REFSET_ADMINISTRATIVE_COLUMNS..];
            if let Some(previous) = by_fingerprint.get(fingerprint) {
                row[0].clone_from(&previous.id);
                summary.reused_by_fingerprint += 1;
            } else if let Some(previous) = by_business_key.get(&self.business_key(&row)?) {
                row[0].clone_from(&previous.id);
                summary.reused_by_business_key += 1;
            } else if is_blank(&row[0]) {
                row[0] = member_uuid(&row[REFSET_ADMINISTRATIVE_COLUMNS..], &self.effective_time)
                    .to_string();
                summary.synthesized += 1;
            } else {
                summary.kept += 1;
            }
            rows.push(row);
        }

        info!(
            rows = rows.len(),
            reused_by_fingerprint = summary.reused_by_fingerprint,
            reused_by_business_key = summary.reused_by_business_key,
            synthesized = summary.synthesized,
            duplicates_dropped = summary.duplicates_dropped,
            "member ids reconciled"
        );
        Ok(Reconciled { rows, summary })
    }
}

/// Extra business key columns by kind of reference set file.
pub fn default_key_columns(filename: &str) -> &'static [usize] {
    if filename.contains(EXTENDED_MAP_FILE_IDENTIFIER) || filename.contains(COMPLEX_MAP_FILE_IDENTIFIER)
    {
        &[5, 7, 10]
    } else if filename.contains(REFERENCE_SET_DESCRIPTOR_FILE_IDENTIFIER) {
        &[5, 8]
    } else if filename.contains(SIMPLE_MAP_FILE_IDENTIFIER)
        || filename.contains(ASSOCIATION_REFERENCE_FILE_IDENTIFIER)
    {
        &[5, 6]
    } else if filename.contains(MODULE_DEPENDENCY_FILE_IDENTIFIER) {
        &[5, 6, 7]
    } else {
        &[5]
    }
}

pub fn is_attribute_value_table(filename: &str) -> bool {
    filename.contains(ATTRIBUTE_VALUE_FILE_IDENTIFIER)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairSummary {
    pub filled: usize,
    pub dropped: usize,
}

/// Fix attribute-value members whose valueId (last column) is empty.
///
/// An inactivation with no value takes the value of the member it
/// inactivates. Rows that cannot be repaired are dropped: the previous state
/// is already inactive, or there is no previous member at all.
pub fn repair_empty_value_ids(previous_snapshot: &[Row], delta: Vec<Row>) -> (Vec<Row>, RepairSummary) {
    let previous: HashMap<&str, &Row> = previous_snapshot
        .iter()
        .filter_map(|row| row.first().map(|id| (id.as_str(), row)))
        .collect();
    let mut summary = RepairSummary::default();
    let mut rows = Vec::with_capacity(delta.len());
    for mut row in delta {
        let Some(value) = row.last() else { continue };
        if !is_blank(value) {
            rows.push(row);
            continue;
        }
        match previous.get(row[0].as_str()) {
            None => {
                warn!(id = %row[0], "dropping member with empty value id and no previous state");
                summary.dropped += 1;
            }
            Some(_) if is_active(&row) => rows.push(row),
            Some(prior) if is_active(prior) => {
                if let (Some(slot), Some(prior_value)) = (row.last_mut(), prior.last()) {
                    slot.clone_from(prior_value);
                }
                summary.filled += 1;
                rows.push(row);
            }
            Some(_) => {
                debug!(id = %row[0], "dropping inactivation of an already inactive member");
                summary.dropped += 1;
            }
        }
    }
    (rows, summary)
}

#[cfg(test)]
mod tests {
    use rf2_model::ComponentType;

    use super::*;

    fn schema(name: &str, extra: &[&str]) -> TableSchema {
        let mut columns: Vec<String> = ComponentType::Refset
            .required_columns()
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        columns.extend(extra.iter().map(|c| (*c).to_string()));
        TableSchema::new(name, ComponentType::Refset, columns)
    }

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn default_columns_follow_file_kind() {
        assert_eq!(
            default_key_columns("der2_iisssccRefset_ExtendedMapDelta_INT_20250131.txt"),
            &[5, 7, 10]
        );
        assert_eq!(
            default_key_columns("der2_cRefset_AssociationReferenceDelta_INT_20250131.txt"),
            &[5, 6]
        );
        assert_eq!(default_key_columns("der2_Refset_SimpleDelta_INT_20250131.txt"), &[5]);
    }

    #[test]
    fn configured_column_outside_schema_is_rejected() {
        let schema = schema("der2_Refset_SimpleDelta_INT_20250131.txt", &[]);
        let config =
            CompositeKeyConfig::new([("450990004".to_string(), vec![9])].into_iter().collect())
                .unwrap();
        let reconciler = MemberIdReconciler::new(&schema, &config, "20250131");
        assert!(matches!(
            reconciler.key_columns("450990004"),
            Err(Rf2Error::BadConfiguration { .. })
        ));
        assert_eq!(reconciler.key_columns("other").unwrap(), vec![4, 5]);
    }

    #[test]
    fn module_move_reuses_id_by_business_key() {
        let schema = schema("der2_Refset_SimpleDelta_INT_20250131.txt", &[]);
        let config = CompositeKeyConfig::default();
        let previous = vec![row(&[
            "6c1b7e2a-8c1f-4d57-a5a8-0e4c9b8a1d11",
            "20240731",
            "1",
            "900000000000207008",
            "450990004",
            "101",
        ])];
        let delta = vec![row(&["", "20250131", "0", "999000011000000103", "450990004", "101"])];
        let reconciled = MemberIdReconciler::new(&schema, &config, "20250131")
            .reconcile(Some(previous.as_slice()), delta)
            .unwrap();
        assert_eq!(reconciled.rows[0][0], "6c1b7e2a-8c1f-4d57-a5a8-0e4c9b8a1d11");
        assert_eq!(reconciled.summary.reused_by_business_key, 1);
    }

    #[test]
    fn later_duplicate_in_delta_wins() {
        let schema = schema("der2_cRefset_AttributeValueDelta_INT_20250131.txt", &["valueId"]);
        let config = CompositeKeyConfig::default();
        let delta = vec![
            row(&["", "20250131", "1", "900000000000207008", "900000000000489007", "101", "1"]),
            row(&["", "20250131", "1", "900000000000207008", "900000000000489007", "101", "2"]),
        ];
        let reconciled = MemberIdReconciler::new(&schema, &config, "20250131")
            .reconcile(None, delta)
            .unwrap();
        assert_eq!(reconciled.rows.len(), 1);
        assert_eq!(reconciled.rows[0][6], "2");
        assert_eq!(reconciled.summary.duplicates_dropped, 1);
    }

    #[test]
    fn latest_previous_candidate_wins() {
        let schema = schema("der2_Refset_SimpleDelta_INT_20250131.txt", &[]);
        let config = CompositeKeyConfig::default();
        let previous = vec![
            row(&["00000000-0000-5000-8000-000000000002", "20230131", "0", "1", "450990004", "101"]),
            row(&["00000000-0000-5000-8000-000000000001", "20240131", "0", "1", "450990004", "101"]),
        ];
        let delta = vec![row(&["", "20250131", "1", "2", "450990004", "101"])];
        let reconciled = MemberIdReconciler::new(&schema, &config, "20250131")
            .reconcile(Some(previous.as_slice()), delta)
            .unwrap();
        assert_eq!(reconciled.rows[0][0], "00000000-0000-5000-8000-000000000001");
    }

    #[test]
    fn value_id_repair() {
        let previous = vec![
            row(&["a", "20240731", "1", "m", "r", "101", "900000000000482003"]),
            row(&["b", "20240731", "0", "m", "r", "102", "900000000000482003"]),
            row(&["c", "20240731", "1", "m", "r", "103", "900000000000482003"]),
        ];
        let delta = vec![
            row(&["a", "20250131", "0", "m", "r", "101", ""]),
            row(&["b", "20250131", "0", "m", "r", "102", ""]),
            row(&["c", "20250131", "1", "m", "r", "103", ""]),
            row(&["d", "20250131", "0", "m", "r", "104", ""]),
            row(&["e", "20250131", "1", "m", "r", "105", "900000000000483008"]),
        ];
        let (rows, summary) = repair_empty_value_ids(&previous, delta);
        let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "e"]);
        assert_eq!(rows[0][6], "900000000000482003");
        assert_eq!(summary, RepairSummary { filled: 1, dropped: 2 });
    }
}
