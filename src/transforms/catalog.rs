//! Allowed-transform catalogs
//!
//! The FM platform exposes which SMT types each plugin supports. The
//! catalogs here serve that set from local data; remote population is the
//! caller's concern. An empty set is valid and means every transform is
//! disallowed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while loading a transform catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Failed to read the catalog file
    #[error("Failed to read transform catalog: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the catalog file
    #[error("Failed to parse transform catalog: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Supplies the set of SMT types the FM platform supports per plugin
pub trait TransformCatalog: Send + Sync {
    fn allowed_types(&self, plugin_id: &str) -> BTreeSet<String>;
}

/// Catalog with no entries; all transforms are disallowed
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTransformCatalog;

impl TransformCatalog for EmptyTransformCatalog {
    fn allowed_types(&self, plugin_id: &str) -> BTreeSet<String> {
        tracing::warn!("No transforms found for {}", plugin_id);
        BTreeSet::new()
    }
}

/// In-memory catalog keyed by plugin id
#[derive(Debug, Clone, Default)]
pub struct StaticTransformCatalog {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl StaticTransformCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(mut self, plugin_id: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(
            plugin_id.into(),
            types.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl TransformCatalog for StaticTransformCatalog {
    fn allowed_types(&self, plugin_id: &str) -> BTreeSet<String> {
        match self.entries.get(plugin_id) {
            Some(types) => types.clone(),
            None => {
                tracing::warn!("No transforms found for {}", plugin_id);
                BTreeSet::new()
            }
        }
    }
}

/// Catalog backed by a `fm_transforms_list.json` fallback file mapping
/// plugin id to its list of supported transform types.
#[derive(Debug, Clone)]
pub struct FileTransformCatalog {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl FileTransformCatalog {
    /// Load the catalog file once; entries are served from memory afterwards.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(&contents)?;
        tracing::info!(
            "Loaded FM transforms fallback with {} plugin ids from {}",
            entries.len(),
            path.as_ref().display()
        );
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(plugin, types)| (plugin, types.into_iter().collect()))
                .collect(),
        })
    }
}

impl TransformCatalog for FileTransformCatalog {
    fn allowed_types(&self, plugin_id: &str) -> BTreeSet<String> {
        match self.entries.get(plugin_id) {
            Some(types) => {
                tracing::debug!(
                    "Using fallback transforms for {}: {} transforms",
                    plugin_id,
                    types.len()
                );
                types.clone()
            }
            None => {
                tracing::warn!("No transforms found for {} in fallback file", plugin_id);
                BTreeSet::new()
            }
        }
    }
}
