//! The property-mapping and config-derivation engine
//!
//! Takes an arbitrary self-managed connector config plus an FM template and
//! produces a best-effort FM config using four fallback strategies in
//! strict precedence order:
//! 1. Direct name match against template config definitions
//! 2. Declarative template rules (constant / switch / dynamic-mapper cases
//!    with placeholder resolution)
//! 3. Built-in derivation functions for well-known properties (connection
//!    URLs, data formats, SSL modes, vendor-specific settings)
//! 4. Semantic similarity matching as last resort
//!
//! # Example
//!
//! ```rust,ignore
//! use connector_migration_sdk::{ConfigMapper, TemplateRepository};
//!
//! let templates = TemplateRepository::load_dir("templates/fm")?;
//! let mapper = ConfigMapper::new(templates);
//! let outcome = mapper.map_connector("orders-source", &user_configs);
//! if outcome.is_successful() {
//!     println!("{} mapped cleanly", outcome.name);
//! } else {
//!     eprintln!("needs review: {:?}", outcome.errors);
//! }
//! ```

mod derive;
mod orchestrator;
mod rules;
mod types;

pub use derive::{DerivationContext, DerivationFn, DerivationRegistry};
pub use orchestrator::ConfigMapper;
pub use types::{ConnectorConfig, MappingOutcome, normalize_configs};
