//! Single Message Transform (SMT) and predicate classification
//!
//! FM connectors support a fixed set of transform types per plugin. This
//! module partitions a connector's `transforms.*` and `predicates.*`
//! entries into allowed and disallowed buckets against that set, coupling
//! each predicate's fate to the transforms that reference it.

mod catalog;
mod classifier;

pub use catalog::{
    CatalogError, CatalogResult, EmptyTransformCatalog, FileTransformCatalog,
    StaticTransformCatalog, TransformCatalog,
};
pub use classifier::{TransformClassification, classify_transforms};
