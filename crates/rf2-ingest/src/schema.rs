//! Schema recognition from file name and header row.

use rf2_model::{ComponentType, TableSchema};

use crate::error::{IngestError, Result};
use crate::filename::{ContentKind, Rf2FileName};

/// Component type for a parsed file name, `None` for files the build does not
/// handle as tables.
pub fn component_type(name: &Rf2FileName) -> Option<ComponentType> {
    match name.content_kind()? {
        ContentKind::Concept => Some(ComponentType::Concept),
        ContentKind::Description => Some(ComponentType::Description),
        ContentKind::TextDefinition => Some(ComponentType::TextDefinition),
        ContentKind::Relationship => Some(ComponentType::Relationship),
        ContentKind::StatedRelationship => Some(ComponentType::StatedRelationship),
        ContentKind::RelationshipConcreteValues => Some(ComponentType::RelationshipConcreteValues),
        ContentKind::Refset { .. } => Some(ComponentType::Refset),
        ContentKind::Identifier => None,
    }
}

/// Minimum header width for a file, refset field patterns included.
pub fn required_column_count(name: &Rf2FileName) -> Option<usize> {
    let kind = name.content_kind()?;
    let component = component_type(name)?;
    let extra = match kind {
        ContentKind::Refset { extra_columns } => extra_columns,
        _ => 0,
    };
    Some(component.min_columns() + extra)
}

/// Recognise a table from its file name and header row.
///
/// Identifier files are recognised by name but rejected: the build does not
/// release them.
pub fn recognise(filename: &str, header: &[String]) -> Result<TableSchema> {
    let name = Rf2FileName::parse(filename)?;
    let kind = name.content_kind().ok_or_else(|| {
        IngestError::unrecognised(
            filename,
            format!("content type '{}' is not supported", name.content_type),
        )
    })?;
    if kind == ContentKind::Identifier {
        return Err(IngestError::unrecognised(
            filename,
            "identifier files are not built",
        ));
    }
    let component = component_type(&name).ok_or_else(|| {
        IngestError::unrecognised(filename, "no table schema for this content type")
    })?;
    let expected = required_column_count(&name).unwrap_or_else(|| component.min_columns());
    if header.len() < expected {
        return Err(IngestError::TooFewColumns {
            name: filename.to_string(),
            component: component.display_name().to_string(),
            expected,
            found: header.len(),
        });
    }
    Ok(TableSchema::new(filename, component, header.to_vec()))
}
