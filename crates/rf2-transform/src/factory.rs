//! Pipelines per component type.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rf2_config::ModuleIds;
use rf2_model::constants::BOOLEAN_TRUE;
use rf2_model::{ComponentType, TableSchema};

use crate::ids::RelationshipFileType;
use crate::line::{Condition, ConditionalTransformation, LineTransformation};
use crate::pipeline::TransformPipeline;

const ID: usize = 0;
const EFFECTIVE_TIME: usize = 1;
const ACTIVE: usize = 2;
const MODULE_ID: usize = 3;
const CONCEPT_ID: usize = 4;
const DESTINATION_ID: usize = 5;
const REFERENCED_COMPONENT_ID: usize = 5;

/// Builds the transformation pipeline each input table needs for one release.
#[derive(Debug, Clone)]
pub struct TransformationFactory {
    effective_time: String,
    module_ids: ModuleIds,
    model_concept_ids: Option<Arc<BTreeSet<String>>>,
    existing_uuid_to_sctid: Option<Arc<HashMap<String, String>>>,
    extension_module_id: Option<String>,
}

impl TransformationFactory {
    pub fn new(effective_time: impl Into<String>, module_ids: ModuleIds) -> Self {
        Self {
            effective_time: effective_time.into(),
            module_ids,
            model_concept_ids: None,
            existing_uuid_to_sctid: None,
            extension_module_id: None,
        }
    }

    /// Enable moduleId correction against the resolved model concepts.
    pub fn with_model_concept_ids(mut self, ids: BTreeSet<String>) -> Self {
        self.model_concept_ids = Some(Arc::new(ids));
        self
    }

    /// Map generated relationship UUIDs back to ids already published.
    pub fn with_existing_uuid_map(mut self, map: HashMap<String, String>) -> Self {
        self.existing_uuid_to_sctid = Some(Arc::new(map));
        self
    }

    /// Module given to inferred relationships that arrive without one,
    /// instead of the core module.
    pub fn with_extension_module_id(mut self, id: impl Into<String>) -> Self {
        self.extension_module_id = Some(id.into());
        self
    }

    pub fn module_fix_enabled(&self) -> bool {
        self.model_concept_ids.is_some()
    }

    pub fn pipeline_for(&self, schema: &TableSchema) -> TransformPipeline {
        let name = schema.filename.clone();
        match schema.component_type {
            ComponentType::Concept => self.with_module_fix(self.stamped(name), ID),
            ComponentType::Description | ComponentType::TextDefinition => {
                self.with_module_fix(self.stamped(name), CONCEPT_ID)
            }
            ComponentType::StatedRelationship => self
                .with_module_fix(self.stamped(name), DESTINATION_ID)
                .add(LineTransformation::RelationshipUuid {
                    file_type: RelationshipFileType::Stated,
                }),
            ComponentType::Relationship | ComponentType::RelationshipConcreteValues => {
                self.inferred_relationship_pipeline(name)
            }
            ComponentType::Refset => self
                .with_module_fix(self.stamped(name), REFERENCED_COMPONENT_ID)
                .add(LineTransformation::MemberUuid),
        }
    }

    fn stamped(&self, name: String) -> TransformPipeline {
        TransformPipeline::new(name).add(LineTransformation::replace_value(
            EFFECTIVE_TIME,
            self.effective_time.clone(),
        ))
    }

    fn inferred_relationship_pipeline(&self, name: String) -> TransformPipeline {
        let default_module = self
            .extension_module_id
            .as_ref()
            .unwrap_or(&self.module_ids.core_module_id);
        let mut pipeline = TransformPipeline::new(name)
            .add(LineTransformation::replace_if_empty(MODULE_ID, default_module.clone()))
            .add(LineTransformation::RelationshipUuid {
                file_type: RelationshipFileType::Inferred,
            });
        if let Some(map) = &self.existing_uuid_to_sctid {
            pipeline = pipeline.add(LineTransformation::ReplaceFromMap {
                column: ID,
                map: Arc::clone(map),
            });
        }
        pipeline.add(LineTransformation::replace_if_empty(
            EFFECTIVE_TIME,
            self.effective_time.clone(),
        ))
    }

    /// Active rows keyed on a model concept move to the model module, every
    /// other row to the core module.
    fn with_module_fix(&self, pipeline: TransformPipeline, key_column: usize) -> TransformPipeline {
        let Some(ids) = &self.model_concept_ids else {
            return pipeline;
        };
        let condition = Condition::column_in(key_column, Arc::clone(ids))
            .and(Condition::column_equals(ACTIVE, BOOLEAN_TRUE));
        let rule = ConditionalTransformation::new(
            condition,
            LineTransformation::replace_value(MODULE_ID, self.module_ids.model_module_id.clone()),
        )
        .otherwise(LineTransformation::replace_value(
            MODULE_ID,
            self.module_ids.core_module_id.clone(),
        ));
        pipeline.add_front(LineTransformation::conditional(rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(component_type: ComponentType) -> TableSchema {
        let columns = component_type
            .required_columns()
            .iter()
            .map(|c| (*c).to_string())
            .collect();
        TableSchema::new("test.txt", component_type, columns)
    }

    fn names(pipeline: &TransformPipeline) -> Vec<&'static str> {
        pipeline.transformations().iter().map(LineTransformation::name).collect()
    }

    #[test]
    fn module_fix_runs_first_when_enabled() {
        let plain = TransformationFactory::new("20250131", ModuleIds::default());
        assert_eq!(
            names(&plain.pipeline_for(&schema(ComponentType::Concept))),
            vec!["replace-value"]
        );

        let fixing = plain
            .clone()
            .with_model_concept_ids(["138875005".to_string()].into_iter().collect());
        assert_eq!(
            names(&fixing.pipeline_for(&schema(ComponentType::StatedRelationship))),
            vec!["conditional", "replace-value", "relationship-uuid"]
        );
    }

    #[test]
    fn extension_module_fills_missing_inferred_modules() {
        let factory = TransformationFactory::new("20250131", ModuleIds::default())
            .with_extension_module_id("45991000052106");
        let pipeline = factory.pipeline_for(&schema(ComponentType::Relationship));
        let mut row: Vec<String> = [
            "", "", "1", "", "1000000", "2000000", "0", "116680003", "900000000000011006",
            "900000000000451002",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
        pipeline.transform_row(&mut row).expect("transform");
        assert_eq!(row[3], "45991000052106");
        assert_eq!(row[1], "20250131");
        assert_eq!(row[0].len(), 36);
    }

    #[test]
    fn inferred_relationships_only_fill_gaps() {
        let factory = TransformationFactory::new("20250131", ModuleIds::default())
            .with_existing_uuid_map(HashMap::new());
        assert_eq!(
            names(&factory.pipeline_for(&schema(ComponentType::Relationship))),
            vec![
                "replace-value",
                "relationship-uuid",
                "replace-from-map",
                "replace-value"
            ]
        );
    }
}
