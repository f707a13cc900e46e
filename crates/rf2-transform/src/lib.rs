//! Line transformation pipeline for RF2 tables.
//!
//! Input deltas pass through a [`TransformPipeline`] before they reach the
//! table store: the release effective time is stamped, moduleIds are
//! corrected, and missing identifiers are derived from row content.

pub mod factory;
pub mod ids;
pub mod line;
pub mod pipeline;

pub use factory::TransformationFactory;
pub use ids::{
    RelationshipFileType, member_uuid, published_relationship_ids, relationship_uuid, type5_uuid,
};
pub use line::{Condition, ConditionalTransformation, LineTransformation};
pub use pipeline::{TransformPipeline, TransformStats};
