#![deny(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of component held in an RF2 table, recognised from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Concept,
    Description,
    TextDefinition,
    Relationship,
    StatedRelationship,
    RelationshipConcreteValues,
    Refset,
}

impl ComponentType {
    /// Columns every file of this type must carry, in order.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Concept => &[
                "id",
                "effectiveTime",
                "active",
                "moduleId",
                "definitionStatusId",
            ],
            Self::Description | Self::TextDefinition => &[
                "id",
                "effectiveTime",
                "active",
                "moduleId",
                "conceptId",
                "languageCode",
                "typeId",
                "term",
                "caseSignificanceId",
            ],
            Self::Relationship | Self::StatedRelationship => &[
                "id",
                "effectiveTime",
                "active",
                "moduleId",
                "sourceId",
                "destinationId",
                "relationshipGroup",
                "typeId",
                "characteristicTypeId",
                "modifierId",
            ],
            Self::RelationshipConcreteValues => &[
                "id",
                "effectiveTime",
                "active",
                "moduleId",
                "sourceId",
                "value",
                "relationshipGroup",
                "typeId",
                "characteristicTypeId",
                "modifierId",
            ],
            Self::Refset => &[
                "id",
                "effectiveTime",
                "active",
                "moduleId",
                "refsetId",
                "referencedComponentId",
            ],
        }
    }

    pub fn min_columns(self) -> usize {
        self.required_columns().len()
    }

    /// Identifier kind of the first column. Relationship ids stay UUIDs
    /// until a published SCTID is mapped onto them.
    pub fn id_type(self) -> IdType {
        match self {
            Self::Refset => IdType::Uuid,
            _ if self.is_relationship() => IdType::SctidOrUuid,
            _ => IdType::Sctid,
        }
    }

    pub fn is_relationship(self) -> bool {
        matches!(
            self,
            Self::Relationship | Self::StatedRelationship | Self::RelationshipConcreteValues
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Concept => "Concept",
            Self::Description => "Description",
            Self::TextDefinition => "Text definition",
            Self::Relationship => "Relationship",
            Self::StatedRelationship => "Stated relationship",
            Self::RelationshipConcreteValues => "Concrete values",
            Self::Refset => "Reference set",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdType {
    Sctid,
    Uuid,
    SctidOrUuid,
}

/// The three RF2 views of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseKind {
    Full,
    Snapshot,
    Delta,
}

impl ReleaseKind {
    pub const ALL: [ReleaseKind; 3] = [ReleaseKind::Full, ReleaseKind::Snapshot, ReleaseKind::Delta];

    /// Token used inside RF2 file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "Full",
            Self::Snapshot => "Snapshot",
            Self::Delta => "Delta",
        }
    }
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column layout of one table, established from its header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// File name the table was created from.
    pub filename: String,
    pub component_type: ComponentType,
    pub columns: Vec<String>,
}

impl TableSchema {
    pub fn new(
        filename: impl Into<String>,
        component_type: ComponentType,
        columns: Vec<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            component_type,
            columns,
        }
    }

    pub fn id_type(&self) -> IdType {
        self.component_type.id_type()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Header line as written to output files.
    pub fn header_line(&self) -> String {
        self.columns.join(crate::constants::COLUMN_SEPARATOR)
    }
}
