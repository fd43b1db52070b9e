//! Types for connector config mapping results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::value_to_config_string;

/// Raw connector configuration as discovered: keys to JSON scalars.
/// Values are normalized to strings before mapping.
pub type ConnectorConfig = BTreeMap<String, Value>;

/// Normalize a raw connector config into flat string values
pub fn normalize_configs(user_configs: &ConnectorConfig) -> BTreeMap<String, String> {
    user_configs
        .iter()
        .map(|(key, value)| (key.clone(), value_to_config_string(value)))
        .collect()
}

/// Result of mapping one connector onto an FM template.
///
/// Mapping is best effort with reported gaps: a `MappingOutcome` is always
/// produced, and callers bucket connectors into successful versus
/// needs-review using the error list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingOutcome {
    /// Connector name
    pub name: String,
    /// The derived FM configuration
    pub fm_configs: BTreeMap<String, String>,
    /// Informational notices that never escalate to errors
    pub warnings: Vec<String>,
    /// Accumulated mapping problems; empty means the connector migrated
    /// cleanly
    pub errors: Vec<String>,
}

impl MappingOutcome {
    /// Create an empty outcome for the given connector
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fm_configs: BTreeMap::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether the connector mapped without errors
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_configs() {
        let mut raw = ConnectorConfig::new();
        raw.insert("connector.class".to_string(), json!("com.example.Thing"));
        raw.insert("tasks.max".to_string(), json!(4));
        raw.insert("auto.create".to_string(), json!(true));

        let normalized = normalize_configs(&raw);
        assert_eq!(normalized.get("connector.class").map(String::as_str), Some("com.example.Thing"));
        assert_eq!(normalized.get("tasks.max").map(String::as_str), Some("4"));
        assert_eq!(normalized.get("auto.create").map(String::as_str), Some("true"));
    }

    #[test]
    fn test_outcome_success() {
        let mut outcome = MappingOutcome::new("orders-source");
        assert!(outcome.is_successful());
        outcome.errors.push("boom".to_string());
        assert!(!outcome.is_successful());
    }
}
