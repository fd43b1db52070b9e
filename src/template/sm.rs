//! Self-managed connector template metadata
//!
//! SM templates carry best-effort property descriptions used only to enrich
//! semantic matching. Three historical payload shapes exist (`configs`,
//! `groups[].configs`, `sections[].config_defs`); absence of any shape
//! degrades matching quality but never blocks mapping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One property description from an SM template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmProperty {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "documentation")]
    pub description: Option<String>,
    #[serde(default, alias = "group")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SmGroup {
    #[serde(default)]
    configs: Vec<SmProperty>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SmSection {
    #[serde(default)]
    config_defs: Vec<SmProperty>,
}

/// Best-effort SM connector template metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmTemplate {
    #[serde(default)]
    configs: Vec<SmProperty>,
    #[serde(default)]
    groups: Vec<SmGroup>,
    #[serde(default)]
    sections: Vec<SmSection>,
}

impl SmTemplate {
    /// Parse from a raw JSON payload; unparseable payloads become empty
    /// templates rather than errors.
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::warn!("Could not parse SM template, continuing without it: {}", e);
            SmTemplate::default()
        })
    }

    /// Build a template from a flat property list
    pub fn from_properties(properties: Vec<SmProperty>) -> Self {
        SmTemplate {
            configs: properties,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty() && self.groups.is_empty() && self.sections.is_empty()
    }

    /// Look up a property by name across all three payload shapes
    pub fn find_property(&self, name: &str) -> Option<&SmProperty> {
        if let Some(prop) = self.configs.iter().find(|p| p.name == name) {
            return Some(prop);
        }
        if let Some(prop) = self
            .groups
            .iter()
            .flat_map(|g| g.configs.iter())
            .find(|p| p.name == name)
        {
            return Some(prop);
        }
        self.sections
            .iter()
            .flat_map(|s| s.config_defs.iter())
            .find(|p| p.name == name)
    }
}

/// Supplies SM template metadata per connector class.
///
/// The production source of this data is a live worker's validate endpoint;
/// the store abstraction keeps that concern outside the mapping core.
pub trait SmTemplateStore: Send + Sync {
    fn template_for(&self, connector_class: &str) -> Option<SmTemplate>;
}

/// A store with no templates; semantic matching falls back to generic
/// property descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySmTemplateStore;

impl SmTemplateStore for EmptySmTemplateStore {
    fn template_for(&self, _connector_class: &str) -> Option<SmTemplate> {
        None
    }
}

/// An in-memory store keyed by connector class
#[derive(Debug, Clone, Default)]
pub struct StaticSmTemplateStore {
    templates: BTreeMap<String, SmTemplate>,
}

impl StaticSmTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, connector_class: impl Into<String>, template: SmTemplate) -> Self {
        self.templates.insert(connector_class.into(), template);
        self
    }
}

impl SmTemplateStore for StaticSmTemplateStore {
    fn template_for(&self, connector_class: &str) -> Option<SmTemplate> {
        self.templates.get(connector_class).cloned()
    }
}
