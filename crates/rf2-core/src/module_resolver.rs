//! Model module membership.
//!
//! A concept belongs to the model module when it is an is-a descendant of a
//! concept that already does. Membership is seeded from the previous stated
//! relationship Snapshot and grown over the new Delta until no more concepts
//! are found.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use rf2_config::ModuleIds;
use rf2_ingest::TsvReader;
use rf2_model::row::is_active;
use rf2_model::{Result, Rf2Error, Row};
use tracing::{debug, info, info_span};

const SOURCE_ID: usize = 4;
const DESTINATION_ID: usize = 5;
const TYPE_ID: usize = 7;
const RELATIONSHIP_COLUMNS: usize = 8;

#[derive(Debug, Clone)]
pub struct ModuleResolver {
    model_module_id: String,
    is_a_type_id: String,
}

impl ModuleResolver {
    pub fn new(module_ids: &ModuleIds) -> Self {
        Self {
            model_module_id: module_ids.model_module_id.clone(),
            is_a_type_id: module_ids.is_a_type_id.clone(),
        }
    }

    /// Sources of active is-a rows in the model module.
    pub fn existing_model_concept_ids(
        &self,
        name: &str,
        previous_snapshot: &mut dyn Read,
    ) -> Result<BTreeSet<String>> {
        let mut concepts = BTreeSet::new();
        for row in relationship_rows(name, previous_snapshot)? {
            let row = row?;
            if is_active(&row) && row[3] == self.model_module_id && row[TYPE_ID] == self.is_a_type_id
            {
                concepts.insert(row[SOURCE_ID].clone());
            }
        }
        debug!(file = %name, concepts = concepts.len(), "model concepts seeded");
        Ok(concepts)
    }

    /// Grow `concepts` with every delta concept that reaches it through
    /// active is-a rows. Delta moduleIds are not trusted, so they are not
    /// looked at. Returns the number of concepts added.
    pub fn add_new_model_concept_ids(
        &self,
        concepts: &mut BTreeSet<String>,
        name: &str,
        delta: &mut dyn Read,
    ) -> Result<usize> {
        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for row in relationship_rows(name, delta)? {
            let row = row?;
            if is_active(&row) && row[TYPE_ID] == self.is_a_type_id {
                children
                    .entry(row[DESTINATION_ID].clone())
                    .or_default()
                    .push(row[SOURCE_ID].clone());
            }
        }
        Ok(extend_to_fixed_point(concepts, &children))
    }

    /// Seed from the previous Snapshot and extend with the Delta.
    pub fn resolve(
        &self,
        snapshot_name: &str,
        previous_snapshot: &mut dyn Read,
        delta_name: &str,
        delta: &mut dyn Read,
    ) -> Result<BTreeSet<String>> {
        let span = info_span!("resolve_modules", module = %self.model_module_id);
        let _guard = span.enter();
        let mut concepts = self.existing_model_concept_ids(snapshot_name, previous_snapshot)?;
        let seeded = concepts.len();
        let added = self.add_new_model_concept_ids(&mut concepts, delta_name, delta)?;
        info!(seeded, added, total = concepts.len(), "model module concepts resolved");
        Ok(concepts)
    }
}

/// Breadth-first growth over an explicit frontier; each round only looks at
/// concepts added by the previous one.
pub fn extend_to_fixed_point(
    concepts: &mut BTreeSet<String>,
    children: &BTreeMap<String, Vec<String>>,
) -> usize {
    let before = concepts.len();
    let mut frontier: BTreeSet<String> = concepts
        .iter()
        .filter(|concept| children.contains_key(*concept))
        .cloned()
        .collect();
    let mut rounds = 0usize;
    while !frontier.is_empty() {
        rounds += 1;
        let mut next = BTreeSet::new();
        for parent in &frontier {
            for child in children.get(parent).into_iter().flatten() {
                if concepts.insert(child.clone()) {
                    next.insert(child.clone());
                }
            }
        }
        frontier = next;
    }
    debug!(rounds, "fixed point reached");
    concepts.len() - before
}

/// Data rows of a relationship file, each checked for the columns the
/// resolver reads.
fn relationship_rows<'a>(
    name: &'a str,
    reader: &'a mut dyn Read,
) -> Result<impl Iterator<Item = Result<Row>> + 'a> {
    let mut reader = TsvReader::new(name, reader);
    if reader.next_row()?.is_none() {
        return Err(Rf2Error::bad_input_file(name, "stream is empty, no header row"));
    }
    Ok(reader.enumerate().map(move |(index, row)| {
        let row = row?;
        if row.len() < RELATIONSHIP_COLUMNS {
            return Err(Rf2Error::bad_input_file(
                name,
                format!(
                    "line {} has {} columns, a relationship row needs at least {RELATIONSHIP_COLUMNS}",
                    index + 2,
                    row.len()
                ),
            ));
        }
        Ok(row)
    }))
}
