//! Name-based (type 5) identifiers.
//!
//! Every generated id in a build is derived from row content, so running a
//! build twice over the same input yields the same ids.

use std::collections::HashMap;

use rf2_model::constants::{
    COLUMN_SEPARATOR, INTERNATIONAL_CORE_MODULE_ID, INTERNATIONAL_MODEL_COMPONENT_ID,
};
use rf2_model::row::is_active;
use rf2_model::{Result, Rf2Error, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for every name-based id issued by the release builder.
pub const RELEASE_NAMESPACE: Uuid = Uuid::from_u128(0x2f5c_64c2_1d0e_4b8a_9a47_5e0d_1f3b_7c21);

const STATED_RELATIONSHIP_MODIFIER: &str = "S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipFileType {
    Stated,
    Inferred,
}

pub fn type5_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&RELEASE_NAMESPACE, name.as_bytes())
}

/// Repeatable id for a relationship row.
///
/// Built from sourceId, destinationId, typeId and relationshipGroup, prefixed
/// with the moduleId for extension modules. Stated rows get a modifier so the
/// same triple and group never collides with its inferred counterpart.
pub fn relationship_uuid(row: &[String], file_type: RelationshipFileType) -> Result<Uuid> {
    if row.len() < 8 {
        return Err(Rf2Error::transformation(format!(
            "relationship row has {} columns, at least 8 needed for its id",
            row.len()
        )));
    }
    let mut name = String::new();
    let module_id = row[3].as_str();
    if module_id != INTERNATIONAL_CORE_MODULE_ID && module_id != INTERNATIONAL_MODEL_COMPONENT_ID
    {
        name.push_str(module_id);
    }
    name.push_str(&row[4]);
    name.push_str(&row[5]);
    name.push_str(&row[7]);
    name.push_str(&row[6]);
    if file_type == RelationshipFileType::Stated {
        name.push_str(STATED_RELATIONSHIP_MODIFIER);
    }
    Ok(type5_uuid(&name))
}

/// Repeatable UUID of every published inferred relationship, mapped to the
/// SCTID it was released under. When several ids share one UUID the active
/// row wins.
pub fn published_relationship_ids(rows: &[Row]) -> Result<HashMap<String, String>> {
    let mut ids = HashMap::new();
    for active in [false, true] {
        for row in rows.iter().filter(|row| is_active(row) == active) {
            let Some(id) = row.first().filter(|id| is_sctid(id)) else {
                continue;
            };
            let uuid = relationship_uuid(row, RelationshipFileType::Inferred)?;
            ids.insert(uuid.to_string(), id.clone());
        }
    }
    Ok(ids)
}

fn is_sctid(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Id for a refset member from its content columns and effectiveTime.
pub fn member_uuid(content: &[String], effective_time: &str) -> Uuid {
    let mut name = content.join(COLUMN_SEPARATOR);
    name.push_str(COLUMN_SEPARATOR);
    name.push_str(effective_time);
    type5_uuid(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relationship(module: &str, group: &str) -> Vec<String> {
        [
            "", "20250131", "1", module, "1000000", "2000000", group, "116680003",
            "900000000000011006", "900000000000451002",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
    }

    #[test]
    fn known_type5_value() {
        assert_eq!(
            type5_uuid("foo").to_string(),
            "59262dc8-4d00-5416-9f48-37fb4796f4b2"
        );
    }

    #[test]
    fn core_module_is_left_out_of_the_name() {
        let row = relationship(INTERNATIONAL_CORE_MODULE_ID, "0");
        assert_eq!(
            relationship_uuid(&row, RelationshipFileType::Inferred)
                .expect("uuid")
                .to_string(),
            "e3e93161-b13b-5004-9f07-0e146c23aac2"
        );
        assert_eq!(
            relationship_uuid(&row, RelationshipFileType::Stated)
                .expect("uuid")
                .to_string(),
            "2f72920d-9e6c-572b-a978-d5367fc5e167"
        );
        let model = relationship(INTERNATIONAL_MODEL_COMPONENT_ID, "0");
        assert_eq!(
            relationship_uuid(&model, RelationshipFileType::Inferred).expect("uuid"),
            relationship_uuid(&row, RelationshipFileType::Inferred).expect("uuid")
        );
    }

    #[test]
    fn extension_module_changes_the_id() {
        let core = relationship(INTERNATIONAL_CORE_MODULE_ID, "0");
        let extension = relationship("45991000052106", "0");
        assert_ne!(
            relationship_uuid(&core, RelationshipFileType::Inferred).expect("uuid"),
            relationship_uuid(&extension, RelationshipFileType::Inferred).expect("uuid")
        );
    }

    #[test]
    fn published_ids_prefer_active_rows() {
        let mut retired = relationship(INTERNATIONAL_CORE_MODULE_ID, "0");
        retired[0] = "1001".to_string();
        retired[2] = "0".to_string();
        let mut current = relationship(INTERNATIONAL_CORE_MODULE_ID, "0");
        current[0] = "1002".to_string();
        let mut other = relationship(INTERNATIONAL_CORE_MODULE_ID, "1");
        other[0] = "1003".to_string();
        let unpublished = relationship(INTERNATIONAL_CORE_MODULE_ID, "2");

        let rows = [current.clone(), retired, other.clone(), unpublished];
        let ids = published_relationship_ids(&rows).expect("ids");
        assert_eq!(ids.len(), 2);
        let uuid = relationship_uuid(&current, RelationshipFileType::Inferred).expect("uuid");
        assert_eq!(ids.get(&uuid.to_string()).map(String::as_str), Some("1002"));
        let uuid = relationship_uuid(&other, RelationshipFileType::Inferred).expect("uuid");
        assert_eq!(ids.get(&uuid.to_string()).map(String::as_str), Some("1003"));
    }

    #[test]
    fn short_rows_are_rejected() {
        let row = vec!["".to_string(); 5];
        assert!(matches!(
            relationship_uuid(&row, RelationshipFileType::Stated),
            Err(Rf2Error::Transformation { .. })
        ));
    }
}
