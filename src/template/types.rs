//! Data model for fully-managed connector templates

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::{TemplateError, TemplateResult};

/// Whether a connector produces records into Kafka or consumes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorType {
    Source,
    Sink,
}

/// One FM property definition inside a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfigDef {
    pub name: String,
    /// Tolerates both boolean and "true"/"false" string encodings
    #[serde(default, deserialize_with = "bool_or_string")]
    pub required: bool,
    /// Internal properties are never user-settable and are skipped during
    /// mapping and validation
    #[serde(default, deserialize_with = "bool_or_string")]
    pub internal: bool,
    /// May itself be a `${placeholder}` referencing another FM property
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub recommended_values: Vec<String>,
    #[serde(default, alias = "documentation")]
    pub description: Option<String>,
    #[serde(default, alias = "group")]
    pub section: Option<String>,
    #[serde(default)]
    pub metadata: Option<ConfigMetadata>,
}

impl TemplateConfigDef {
    /// Create a minimal definition with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            internal: false,
            default_value: None,
            recommended_values: Vec::new(),
            description: None,
            section: None,
            metadata: None,
        }
    }

    /// Mark the property as required
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Mark the property as internal
    pub fn with_internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Set the recommended values list
    pub fn with_recommended(mut self, values: Vec<String>) -> Self {
        self.recommended_values = values;
        self
    }

    /// Set the human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Default value rendered as a config string, if any
    pub fn default_value_str(&self) -> Option<String> {
        self.default_value.as_ref().map(value_to_config_string)
    }

    /// Whether this property may only be matched by exact name
    pub fn is_direct_match_only(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.direct_match)
    }
}

/// Per-property metadata attached by the template author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    #[serde(default, deserialize_with = "bool_or_string")]
    pub direct_match: bool,
}

/// Render a JSON value the way it appears in a flat connector config
pub(crate) fn value_to_config_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// A declarative rule binding one FM property name to a resolution strategy
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorRule {
    pub name: String,
    pub kind: RuleKind,
}

/// The resolution strategies a connector config rule can declare.
///
/// Parsed once at template-load time so illegal rule shapes are a load-time
/// error rather than a silent runtime skip.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// A literal value the user config must match (or a non-string literal
    /// written through unconditionally)
    Constant(Value),
    /// A string containing one or more `${name}` placeholder references
    Placeholder(String),
    /// Reverse-lookup switch arms keyed by target template property
    Switch(Vec<SwitchArm>),
    /// A named inference function applied to the user value
    DynamicMapper(String),
    /// Same name on both sides, value copied through
    Identity,
}

/// One `{template_config_name: {user_value: fm_value, ...}}` switch entry
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchArm {
    pub target: String,
    pub mapping: BTreeMap<String, String>,
}

/// Raw serde shape of a connector config rule, before strategy resolution
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawConnectorConfigDef {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub switch: Option<BTreeMap<String, BTreeMap<String, Value>>>,
    #[serde(default, rename = "dynamic.mapper")]
    pub dynamic_mapper: Option<DynamicMapperRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DynamicMapperRef {
    #[serde(default)]
    pub name: Option<String>,
}

impl TryFrom<RawConnectorConfigDef> for ConnectorRule {
    type Error = TemplateError;

    fn try_from(raw: RawConnectorConfigDef) -> TemplateResult<Self> {
        let declared = [
            raw.value.is_some(),
            raw.switch.is_some(),
            raw.dynamic_mapper.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if declared > 1 {
            return Err(TemplateError::AmbiguousRule(raw.name));
        }

        let kind = if let Some(value) = raw.value {
            match &value {
                Value::String(s) if s.contains("${") => RuleKind::Placeholder(s.clone()),
                _ => RuleKind::Constant(value),
            }
        } else if let Some(switch) = raw.switch {
            let arms = switch
                .into_iter()
                .map(|(target, mapping)| SwitchArm {
                    target,
                    mapping: mapping
                        .into_iter()
                        .map(|(k, v)| (k, value_to_config_string(&v)))
                        .collect(),
                })
                .collect();
            RuleKind::Switch(arms)
        } else if let Some(mapper) = raw.dynamic_mapper {
            let mapper_name = mapper.name.ok_or_else(|| TemplateError::InvalidRule {
                name: raw.name.clone(),
                reason: "dynamic.mapper has no name".to_string(),
            })?;
            RuleKind::DynamicMapper(mapper_name)
        } else {
            RuleKind::Identity
        };

        Ok(ConnectorRule {
            name: raw.name,
            kind,
        })
    }
}

/// Raw serde shape of a template file
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFmTemplate {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default, rename = "connector.class")]
    pub connector_class: Option<String>,
    #[serde(default)]
    pub connector_type: Option<ConnectorType>,
    #[serde(default)]
    pub templates: Option<Vec<RawTemplateEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTemplateEntry {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default, rename = "connector.class")]
    pub connector_class: Option<String>,
    #[serde(default)]
    pub connector_type: Option<ConnectorType>,
    #[serde(default)]
    pub config_defs: Vec<TemplateConfigDef>,
    #[serde(default)]
    pub connector_configs: Vec<RawConnectorConfigDef>,
}

/// One entry of a template file's `templates` array, with rules parsed
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub template_id: Option<String>,
    pub connector_class: Option<String>,
    pub connector_type: Option<ConnectorType>,
    pub config_defs: Vec<TemplateConfigDef>,
    pub rules: Vec<ConnectorRule>,
}

/// A fully-managed connector template
#[derive(Debug, Clone)]
pub struct FmTemplate {
    pub template_id: Option<String>,
    pub connector_class: Option<String>,
    pub connector_type: Option<ConnectorType>,
    pub templates: Vec<TemplateEntry>,
}

impl FmTemplate {
    /// Parse a template from its JSON representation, resolving every
    /// connector config rule to its strategy.
    pub fn from_json(value: &Value) -> TemplateResult<Self> {
        let raw: RawFmTemplate = serde_json::from_value(value.clone())
            .map_err(|e| TemplateError::ParseError(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub(crate) fn from_raw(raw: RawFmTemplate) -> TemplateResult<Self> {
        let entries = raw
            .templates
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                let rules = entry
                    .connector_configs
                    .into_iter()
                    .map(ConnectorRule::try_from)
                    .collect::<TemplateResult<Vec<_>>>()?;
                Ok(TemplateEntry {
                    template_id: entry.template_id,
                    connector_class: entry.connector_class,
                    connector_type: entry.connector_type,
                    config_defs: entry.config_defs,
                    rules,
                })
            })
            .collect::<TemplateResult<Vec<_>>>()?;

        Ok(FmTemplate {
            template_id: raw.template_id,
            connector_class: raw.connector_class,
            connector_type: raw.connector_type,
            templates: entries,
        })
    }

    /// Build a template from a single entry (mainly for tests and
    /// programmatic construction).
    pub fn from_entry(entry: TemplateEntry) -> Self {
        FmTemplate {
            template_id: entry.template_id.clone(),
            connector_class: entry.connector_class.clone(),
            connector_type: entry.connector_type,
            templates: vec![entry],
        }
    }

    /// The template id used as the FM `connector.class` and transform
    /// plugin id: top-level first, then the first entry's.
    pub fn primary_template_id(&self) -> Option<&str> {
        self.template_id
            .as_deref()
            .or_else(|| self.templates.iter().find_map(|t| t.template_id.as_deref()))
    }

    /// Every connector class this template claims, top-level and nested
    pub fn connector_classes(&self) -> impl Iterator<Item = &str> {
        self.connector_class
            .as_deref()
            .into_iter()
            .chain(self.templates.iter().filter_map(|t| t.connector_class.as_deref()))
    }

    /// Whether this template targets a source connector.
    ///
    /// Falls back to class-name indicators when no `connector_type` is
    /// declared; defaults to source.
    pub fn is_source(&self) -> bool {
        if let Some(connector_type) = self
            .connector_type
            .or_else(|| self.templates.iter().find_map(|t| t.connector_type))
        {
            return connector_type == ConnectorType::Source;
        }

        let connector_class = self
            .connector_classes()
            .next()
            .unwrap_or_default();
        if ["Source", "CDC", "XStream"]
            .iter()
            .any(|indicator| connector_class.contains(indicator))
        {
            return true;
        }
        if connector_class.contains("Sink") {
            return false;
        }
        true
    }

    /// All property definitions, flattened across entries
    pub fn config_defs(&self) -> Vec<&TemplateConfigDef> {
        self.templates
            .iter()
            .flat_map(|t| t.config_defs.iter())
            .collect()
    }

    /// All connector config rules, flattened across entries
    pub fn rules(&self) -> Vec<&ConnectorRule> {
        self.templates.iter().flat_map(|t| t.rules.iter()).collect()
    }

    /// Look up a property definition by name
    pub fn find_config_def(&self, name: &str) -> Option<&TemplateConfigDef> {
        self.templates
            .iter()
            .flat_map(|t| t.config_defs.iter())
            .find(|def| def.name == name)
    }
}

/// Look up a property definition by name in a flattened def list
pub(crate) fn find_config_def<'a>(
    config_defs: &'a [&'a TemplateConfigDef],
    name: &str,
) -> Option<&'a TemplateConfigDef> {
    config_defs.iter().copied().find(|def| def.name == name)
}
