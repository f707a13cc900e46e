//! Fixed values of the RF2 format and of the International edition.

pub const COLUMN_SEPARATOR: &str = "\t";
pub const LINE_ENDING: &str = "\r\n";

pub const BOOLEAN_TRUE: &str = "1";
pub const BOOLEAN_FALSE: &str = "0";
pub const NULL_STRING: &str = "null";

pub const TXT_FILE_EXTENSION: &str = ".txt";
pub const FILE_NAME_SEPARATOR: char = '_';
pub const INPUT_FILE_PREFIX: &str = "rel2";
pub const SCT2: &str = "sct2";
pub const DER2: &str = "der2";
pub const BETA_RELEASE_PREFIX: &str = "x";

pub const IS_A: &str = "116680003";
pub const INTERNATIONAL_CORE_MODULE_ID: &str = "900000000000207008";
pub const INTERNATIONAL_MODEL_COMPONENT_ID: &str = "900000000000012004";

pub const SIMPLE_MAP_FILE_IDENTIFIER: &str = "SimpleMap";
pub const ASSOCIATION_REFERENCE_FILE_IDENTIFIER: &str = "AssociationReference";
pub const EXTENDED_MAP_FILE_IDENTIFIER: &str = "ExtendedMap";
pub const COMPLEX_MAP_FILE_IDENTIFIER: &str = "ComplexMap";
pub const REFERENCE_SET_DESCRIPTOR_FILE_IDENTIFIER: &str = "RefsetDescriptor";
pub const MODULE_DEPENDENCY_FILE_IDENTIFIER: &str = "ModuleDependency";
pub const ATTRIBUTE_VALUE_FILE_IDENTIFIER: &str = "AttributeValue";

/// Columns of a refset row that are administrative rather than content.
pub const REFSET_ADMINISTRATIVE_COLUMNS: usize = 3;
/// refsetId column of every refset.
pub const REFSET_ID_COLUMN: usize = 4;
pub const REFERENCED_COMPONENT_ID_COLUMN: usize = 5;
