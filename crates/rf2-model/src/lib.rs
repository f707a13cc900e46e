pub mod build;
pub mod conformance;
pub mod constants;
pub mod error;
pub mod key;
pub mod row;
pub mod schema;

pub use build::BuildStatus;
pub use conformance::{CheckStage, IssueSeverity, ValidationIssue, ValidationReport};
pub use error::{Result, Rf2Error};
pub use key::{Key, NumericKey, OpaqueKey};
pub use row::Row;
pub use schema::{ComponentType, IdType, ReleaseKind, TableSchema};
