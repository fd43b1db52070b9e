//! Fully-managed connector template model and repository
//!
//! This module provides:
//! - The FM template data model: property definitions (`config_defs`) and
//!   declarative resolution rules (`connector_configs`), with rule shapes
//!   resolved to a tagged union at load time
//! - Best-effort SM template metadata used to enrich semantic matching
//! - A repository that loads template files, indexes them by connector
//!   class and selects deterministically (database-type detection for JDBC,
//!   Debezium generation mapping for CDC), escalating residual ambiguity to
//!   a pluggable selector

mod error;
mod repository;
mod sm;
mod types;

pub use error::{TemplateError, TemplateResult};
pub use repository::{
    DebeziumVersion, FirstMatchSelector, TemplateCandidate, TemplateRepository, TemplateSelector,
};
pub use sm::{EmptySmTemplateStore, SmProperty, SmTemplate, SmTemplateStore, StaticSmTemplateStore};
pub use types::{
    ConfigMetadata, ConnectorRule, ConnectorType, FmTemplate, RuleKind, SwitchArm, TemplateConfigDef,
    TemplateEntry,
};

pub(crate) use types::{find_config_def, value_to_config_string};
