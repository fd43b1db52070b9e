//! Classification of Single Message Transforms against FM support

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Partition of `transforms.*` / `predicates.*` config entries by whether
/// the target FM template supports them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformClassification {
    pub allowed: BTreeMap<String, String>,
    pub disallowed: BTreeMap<String, String>,
    pub mapping_errors: Vec<String>,
}

/// Classify a connector's transform and predicate chains.
///
/// Each alias in the `transforms` chain is checked against the allowed
/// type set; every `transforms.<alias>.*` key follows its alias's verdict.
/// A predicate referenced by any disallowed transform is forced disallowed
/// regardless of its own standing. The surviving alias lists are rebuilt
/// into the top-level `transforms`/`predicates` keys per bucket.
pub fn classify_transforms(
    config: &BTreeMap<String, String>,
    allowed_transform_types: &BTreeSet<String>,
) -> TransformClassification {
    let mut result = TransformClassification::default();

    let transform_chain = config.get("transforms").cloned().unwrap_or_default();
    let aliases: Vec<&str> = transform_chain
        .split(',')
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
        .collect();

    let mut allowed_aliases: Vec<&str> = Vec::new();
    let mut disallowed_aliases: Vec<&str> = Vec::new();
    let mut disallowed_predicates: BTreeSet<String> = BTreeSet::new();

    for &alias in &aliases {
        let type_key = format!("transforms.{}.type", alias);
        let prefix = format!("transforms.{}.", alias);
        let predicate_key = format!("transforms.{}.predicate", alias);

        match config.get(&type_key).filter(|t| !t.is_empty()) {
            None => {
                disallowed_aliases.push(alias);
                let error_msg = format!("Transform '{}' has no type specified", alias);
                tracing::warn!("{}", error_msg);
                result.mapping_errors.push(error_msg);
                for (key, value) in config {
                    if key.starts_with(&prefix) {
                        result.disallowed.insert(key.clone(), value.clone());
                        if key == &predicate_key {
                            disallowed_predicates.insert(value.clone());
                        }
                    }
                }
            }
            Some(transform_type) if allowed_transform_types.contains(transform_type) => {
                allowed_aliases.push(alias);
                for (key, value) in config {
                    if key.starts_with(&prefix) {
                        result.allowed.insert(key.clone(), value.clone());
                    }
                }
            }
            Some(transform_type) => {
                disallowed_aliases.push(alias);
                let error_msg = format!(
                    "Transform '{}' of type '{}' is not supported in Fully Managed Connector. Potentially Custom SMT can be used.",
                    alias, transform_type
                );
                tracing::warn!("{}", error_msg);
                result.mapping_errors.push(error_msg);
                for (key, value) in config {
                    if key.starts_with(&prefix) {
                        result.disallowed.insert(key.clone(), value.clone());
                        if key == &predicate_key {
                            tracing::debug!(
                                "Predicate '{}' follows its unsupported transform '{}'",
                                value,
                                alias
                            );
                            disallowed_predicates.insert(value.clone());
                        }
                    }
                }
            }
        }
    }

    let predicates_chain = config.get("predicates").cloned().unwrap_or_default();
    let predicate_aliases: Vec<&str> = predicates_chain
        .split(',')
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
        .collect();

    let mut allowed_predicate_aliases: Vec<&str> = Vec::new();
    let mut disallowed_predicate_aliases: Vec<&str> = Vec::new();

    for &predicate_alias in &predicate_aliases {
        let prefix = format!("predicates.{}.", predicate_alias);
        if disallowed_predicates.contains(predicate_alias) {
            disallowed_predicate_aliases.push(predicate_alias);
            result.mapping_errors.push(format!(
                "Predicate '{}' is filtered out because it's associated with an unsupported transform.",
                predicate_alias
            ));
            for (key, value) in config {
                if key.starts_with(&prefix) {
                    result.disallowed.insert(key.clone(), value.clone());
                }
            }
        } else {
            allowed_predicate_aliases.push(predicate_alias);
            for (key, value) in config {
                if key.starts_with(&prefix) {
                    result.allowed.insert(key.clone(), value.clone());
                }
            }
        }
    }

    if !allowed_aliases.is_empty() {
        result
            .allowed
            .insert("transforms".to_string(), allowed_aliases.join(", "));
    }
    if !disallowed_aliases.is_empty() {
        result
            .disallowed
            .insert("transforms".to_string(), disallowed_aliases.join(", "));
    }
    if !allowed_predicate_aliases.is_empty() {
        result
            .allowed
            .insert("predicates".to_string(), allowed_predicate_aliases.join(", "));
    }
    if !disallowed_predicate_aliases.is_empty() {
        result.disallowed.insert(
            "predicates".to_string(),
            disallowed_predicate_aliases.join(", "),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn allowed(types: &[&str]) -> BTreeSet<String> {
        types.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_allowed_and_disallowed_transforms() {
        let config = config(&[
            ("transforms", "cast, route"),
            ("transforms.cast.type", "org.apache.kafka.connect.transforms.Cast$Value"),
            ("transforms.cast.spec", "age:int32"),
            ("transforms.route.type", "com.example.CustomRouter"),
            ("transforms.route.regex", ".*"),
        ]);
        let allowed = allowed(&["org.apache.kafka.connect.transforms.Cast$Value"]);

        let result = classify_transforms(&config, &allowed);

        assert_eq!(result.allowed.get("transforms").map(String::as_str), Some("cast"));
        assert!(result.allowed.contains_key("transforms.cast.spec"));
        assert_eq!(result.disallowed.get("transforms").map(String::as_str), Some("route"));
        assert!(result.disallowed.contains_key("transforms.route.regex"));
        assert_eq!(result.mapping_errors.len(), 1);
        assert!(result.mapping_errors[0].contains("CustomRouter"));
    }

    #[test]
    fn test_transform_without_type_is_disallowed() {
        let config = config(&[
            ("transforms", "mystery"),
            ("transforms.mystery.field", "x"),
        ]);
        let result = classify_transforms(&config, &allowed(&["anything"]));

        assert!(result.allowed.is_empty());
        assert!(result.disallowed.contains_key("transforms.mystery.field"));
        assert!(result.mapping_errors[0].contains("has no type specified"));
    }

    #[test]
    fn test_predicate_follows_disallowed_transform() {
        let config = config(&[
            ("transforms", "t1, t2"),
            ("transforms.t1.type", "GoodType"),
            ("transforms.t2.type", "BadType"),
            ("transforms.t2.predicate", "p1"),
            ("predicates", "p1"),
            ("predicates.p1.type", "org.apache.kafka.connect.transforms.predicates.TopicNameMatches"),
            ("predicates.p1.pattern", "orders.*"),
        ]);
        let result = classify_transforms(&config, &allowed(&["GoodType"]));

        assert_eq!(result.allowed.get("transforms").map(String::as_str), Some("t1"));
        assert_eq!(result.disallowed.get("transforms").map(String::as_str), Some("t2"));
        // p1 was never type-checked, yet it follows t2's verdict
        assert!(!result.allowed.contains_key("predicates"));
        assert_eq!(result.disallowed.get("predicates").map(String::as_str), Some("p1"));
        assert!(result.disallowed.contains_key("predicates.p1.pattern"));
        assert!(
            result
                .mapping_errors
                .iter()
                .any(|e| e.contains("Predicate 'p1'"))
        );
    }

    #[test]
    fn test_unreferenced_predicate_stays_allowed() {
        let config = config(&[
            ("transforms", "t1"),
            ("transforms.t1.type", "GoodType"),
            ("predicates", "p1"),
            ("predicates.p1.type", "SomePredicate"),
        ]);
        let result = classify_transforms(&config, &allowed(&["GoodType"]));

        assert_eq!(result.allowed.get("predicates").map(String::as_str), Some("p1"));
        assert!(result.allowed.contains_key("predicates.p1.type"));
    }

    #[test]
    fn test_empty_allowed_set_disallows_everything() {
        let config = config(&[
            ("transforms", "t1"),
            ("transforms.t1.type", "AnyType"),
        ]);
        let result = classify_transforms(&config, &BTreeSet::new());

        assert!(result.allowed.is_empty());
        assert_eq!(result.disallowed.get("transforms").map(String::as_str), Some("t1"));
    }

    #[test]
    fn test_no_transforms_at_all() {
        let result = classify_transforms(&BTreeMap::new(), &allowed(&["X"]));
        assert_eq!(result, TransformClassification::default());
    }

    #[test]
    fn test_chain_rebuilt_with_comma_space() {
        let config = config(&[
            ("transforms", "a,b , c"),
            ("transforms.a.type", "T"),
            ("transforms.b.type", "T"),
            ("transforms.c.type", "T"),
        ]);
        let result = classify_transforms(&config, &allowed(&["T"]));
        assert_eq!(result.allowed.get("transforms").map(String::as_str), Some("a, b, c"));
    }
}
