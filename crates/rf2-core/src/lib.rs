//! Versioned RF2 table engine.
//!
//! Tables accumulate release history keyed by (identifier, effectiveTime)
//! and are read back as Full, Snapshot or Delta views. Reference set deltas
//! are reconciled against the previous release before they are merged, and
//! model module membership is resolved over stated is-a relationships.

pub mod export;
pub mod module_resolver;
pub mod reconcile;
pub mod store;

pub use export::{ExportRequest, write_rows, write_table, write_table_file};
pub use module_resolver::{ModuleResolver, extend_to_fixed_point};
pub use reconcile::{
    MemberIdReconciler, ReconcileSummary, Reconciled, RepairSummary, default_key_columns,
    is_attribute_value_table, repair_empty_value_ids,
};
pub use store::{MemoryTableStore, RowStream, Table, TableStore};
