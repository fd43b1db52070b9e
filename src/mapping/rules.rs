//! Interpretation of declarative template rules
//!
//! Each `connector_configs` entry resolves one FM property from the user's
//! config using exactly one strategy: a constant to match, a placeholder
//! expression, a reverse switch, a dynamic mapper, or identity. Interpreting
//! a rule never fails; problems surface as warnings or land a property on
//! the semantic-match backlog. Resolved FM values are never overwritten.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::template::{
    ConnectorRule, RuleKind, SwitchArm, TemplateConfigDef, find_config_def, value_to_config_string,
};

use super::derive::DerivationRegistry;

pub(crate) static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Markers identifying platform-internal values users may not override:
/// SASL JAAS configs, platform secret mounts, and unresolved logical
/// cluster references outside the external-secrets path.
fn is_internal_value(value: &str) -> bool {
    value.contains("org.apache.kafka.common.security.plain.PlainLoginModule")
        || value.contains("/mnt/secrets/connect-sr")
        || (value.contains("{{.logicalClusterId}}")
            && !value.contains("/mnt/secrets/connect-external-secrets"))
}

/// Insert only when the key has no value yet (first-writer-wins)
pub(crate) fn set_if_absent(map: &mut BTreeMap<String, String>, key: &str, value: String) {
    if !map.contains_key(key) {
        map.insert(key.to_string(), value);
    }
}

/// Outcome of a reverse switch lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReverseSwitchOutcome {
    /// Mapping entry found; its key is the FM value
    Mapped(String),
    /// The matching entry's key is `"default"`: resolves to no value
    Default,
    /// No entry's value equals the user value
    NoMatch,
}

/// Find the mapping entry whose value equals the user's literal value; the
/// matching key becomes the FM value, except `"default"` which resolves to
/// no value.
pub(crate) fn apply_reverse_switch(
    mapping: &BTreeMap<String, String>,
    user_value: &str,
) -> ReverseSwitchOutcome {
    for (switch_key, switch_value) in mapping {
        if switch_value == user_value {
            if switch_key == "default" {
                return ReverseSwitchOutcome::Default;
            }
            return ReverseSwitchOutcome::Mapped(switch_key.clone());
        }
    }
    ReverseSwitchOutcome::NoMatch
}

/// Named inference functions invocable from `dynamic.mapper` rules
pub(crate) fn infer_dynamic_mapping(mapper_name: &str, user_config_value: &str) -> Option<String> {
    if mapper_name == "value.converter.reference.subject.name.strategy.mapper" {
        let mapped = match user_config_value {
            "io.confluent.kafka.serializers.subject.TopicNameStrategy" => "TopicNameStrategy",
            "io.confluent.kafka.serializers.subject.RecordNameStrategy" => "RecordNameStrategy",
            "io.confluent.kafka.serializers.subject.TopicRecordNameStrategy" => {
                "TopicRecordNameStrategy"
            }
            _ => return None,
        };
        return Some(mapped.to_string());
    }

    tracing::warn!("Dynamic mapping inference not implemented for {}", mapper_name);
    None
}

/// Applies one connector config rule against the user configuration
pub(crate) struct RuleInterpreter<'a> {
    pub config_defs: &'a [&'a TemplateConfigDef],
    pub registry: &'a DerivationRegistry,
}

impl RuleInterpreter<'_> {
    pub fn apply(
        &self,
        rule: &ConnectorRule,
        user_value: &str,
        user_configs: &BTreeMap<String, String>,
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        match &rule.kind {
            RuleKind::Constant(value) => {
                self.apply_constant(rule, value, user_value, fm_configs, warnings);
            }
            RuleKind::Placeholder(expression) => {
                self.apply_placeholder(
                    rule,
                    expression,
                    user_value,
                    user_configs,
                    fm_configs,
                    warnings,
                    semantic_backlog,
                );
            }
            RuleKind::Switch(arms) => {
                self.apply_switch(rule, arms, user_configs, fm_configs, warnings, semantic_backlog);
            }
            RuleKind::DynamicMapper(mapper_name) => {
                self.apply_dynamic_mapper(
                    rule,
                    mapper_name,
                    user_value,
                    fm_configs,
                    semantic_backlog,
                );
            }
            RuleKind::Identity => {
                set_if_absent(fm_configs, &rule.name, user_value.to_string());
            }
        }
    }

    fn apply_constant(
        &self,
        rule: &ConnectorRule,
        value: &Value,
        user_value: &str,
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
    ) {
        match value {
            Value::String(constant) => {
                if is_internal_value(constant) {
                    warnings.push(format!(
                        "{} is internal. User given value will be ignored.",
                        rule.name
                    ));
                    return;
                }
                if constant == user_value {
                    set_if_absent(fm_configs, &rule.name, user_value.to_string());
                } else {
                    warnings.push(format!(
                        "{} : FM config has constant value '{}' but user provided '{}'. User given value will be ignored.",
                        rule.name, constant, user_value
                    ));
                }
            }
            other => {
                // Non-string literals are written through without comparison
                set_if_absent(fm_configs, &rule.name, value_to_config_string(other));
            }
        }
    }

    fn apply_placeholder(
        &self,
        rule: &ConnectorRule,
        expression: &str,
        user_value: &str,
        user_configs: &BTreeMap<String, String>,
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        if is_internal_value(expression) {
            warnings.push(format!(
                "{} is internal. User given value will be ignored.",
                rule.name
            ));
            return;
        }

        let referenced_keys: BTreeSet<String> = PLACEHOLDER_REGEX
            .captures_iter(expression)
            .map(|caps| caps[1].to_string())
            .collect();

        for referenced_key in &referenced_keys {
            if fm_configs.contains_key(&rule.name) {
                return;
            }

            if user_configs
                .get(referenced_key)
                .is_some_and(|v| !v.trim().is_empty())
            {
                set_if_absent(fm_configs, &rule.name, user_value.to_string());
                return;
            }

            match find_config_def(self.config_defs, referenced_key) {
                Some(referenced_def) if !referenced_def.internal => {
                    if self.registry.contains(referenced_key) {
                        // Deferred to the derivation pass
                        return;
                    }
                    if expression == format!("${{{}}}", referenced_key) {
                        set_if_absent(fm_configs, referenced_key, user_value.to_string());
                    }
                }
                Some(_) => {
                    warnings.push(
                        "The transformed FM config is internal and will be inferred. User given value will be ignored."
                            .to_string(),
                    );
                }
                None => {
                    semantic_backlog.insert(rule.name.clone());
                    tracing::warn!(
                        "'{}': config transform not present in template for '{}', will attempt a semantic match",
                        rule.name,
                        referenced_key
                    );
                }
            }
        }
    }

    fn apply_switch(
        &self,
        rule: &ConnectorRule,
        arms: &[SwitchArm],
        user_configs: &BTreeMap<String, String>,
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        for arm in arms {
            if fm_configs.contains_key(&arm.target) {
                return;
            }

            let Some(target_def) = find_config_def(self.config_defs, &arm.target) else {
                tracing::error!(
                    "Switch case key '{}' for config '{}' is not part of template configs.",
                    arm.target,
                    rule.name
                );
                continue;
            };

            if target_def.internal {
                warnings.push(
                    "The transformed FM config is internal and will be inferred. User given value will be ignored."
                        .to_string(),
                );
                continue;
            }

            let has_matchers = arm.mapping.values().any(|value| value.contains("${"));
            if has_matchers {
                if self.registry.contains(&arm.target) {
                    // Deferred to the derivation pass
                    return;
                }
                semantic_backlog.insert(rule.name.clone());
                tracing::error!(
                    "'{}': switch case for '{}' has placeholder values and no derivation method. Complex matcher logic not implemented; will attempt a semantic match.",
                    rule.name,
                    arm.target
                );
                continue;
            }

            let Some(user_value) = user_configs.get(&rule.name) else {
                continue;
            };
            match apply_reverse_switch(&arm.mapping, user_value) {
                ReverseSwitchOutcome::Mapped(fm_value) => {
                    set_if_absent(fm_configs, &arm.target, fm_value);
                }
                ReverseSwitchOutcome::Default => {
                    tracing::debug!(
                        "Switch default matched for '{}', no value written",
                        rule.name
                    );
                }
                ReverseSwitchOutcome::NoMatch => {
                    warnings.push(format!(
                        "User value '{}' for '{}' does not match any value in template switch case.",
                        user_value, rule.name
                    ));
                }
            }
        }
    }

    fn apply_dynamic_mapper(
        &self,
        rule: &ConnectorRule,
        mapper_name: &str,
        user_value: &str,
        fm_configs: &mut BTreeMap<String, String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        if find_config_def(self.config_defs, &rule.name).is_some() {
            set_if_absent(fm_configs, &rule.name, user_value.to_string());
            return;
        }

        if let Some(mapped_value) = infer_dynamic_mapping(mapper_name, user_value) {
            tracing::info!("Dynamic mapping for '{}' inferred as '{}'", rule.name, mapped_value);
            set_if_absent(fm_configs, &rule.name, mapped_value);
            return;
        }

        semantic_backlog.insert(rule.name.clone());
        tracing::warn!(
            "Dynamic mapper config '{}' not resolved, will attempt semantic matching",
            rule.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct Harness {
        fm_configs: BTreeMap<String, String>,
        warnings: Vec<String>,
        backlog: BTreeSet<String>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                fm_configs: BTreeMap::new(),
                warnings: Vec::new(),
                backlog: BTreeSet::new(),
            }
        }

        fn apply(
            &mut self,
            defs: &[&TemplateConfigDef],
            rule: &ConnectorRule,
            user_value: &str,
            user_configs: &BTreeMap<String, String>,
        ) {
            let registry = DerivationRegistry::builtin();
            let interpreter = RuleInterpreter {
                config_defs: defs,
                registry: &registry,
            };
            interpreter.apply(
                rule,
                user_value,
                user_configs,
                &mut self.fm_configs,
                &mut self.warnings,
                &mut self.backlog,
            );
        }
    }

    fn rule(name: &str, kind: RuleKind) -> ConnectorRule {
        ConnectorRule {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn test_constant_match_carries_value() {
        let mut harness = Harness::new();
        let rule = rule("cleanup.policy", RuleKind::Constant(json!("compact")));
        harness.apply(&[], &rule, "compact", &configs(&[]));
        assert_eq!(
            harness.fm_configs.get("cleanup.policy").map(String::as_str),
            Some("compact")
        );
        assert!(harness.warnings.is_empty());
    }

    #[test]
    fn test_constant_mismatch_warns_and_discards() {
        let mut harness = Harness::new();
        let rule = rule("cleanup.policy", RuleKind::Constant(json!("compact")));
        harness.apply(&[], &rule, "delete", &configs(&[]));
        assert!(!harness.fm_configs.contains_key("cleanup.policy"));
        assert_eq!(harness.warnings.len(), 1);
        assert!(harness.warnings[0].contains("constant value 'compact'"));
    }

    #[test]
    fn test_non_string_constant_written_directly() {
        let mut harness = Harness::new();
        let rule = rule("validate.non.null", RuleKind::Constant(json!(false)));
        harness.apply(&[], &rule, "whatever", &configs(&[]));
        assert_eq!(
            harness.fm_configs.get("validate.non.null").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn test_internal_jaas_value_is_discarded() {
        let mut harness = Harness::new();
        let rule = rule(
            "sasl.jaas.config",
            RuleKind::Constant(json!(
                "org.apache.kafka.common.security.plain.PlainLoginModule required username=\"user\";"
            )),
        );
        harness.apply(&[], &rule, "anything", &configs(&[]));
        assert!(harness.fm_configs.is_empty());
        assert!(harness.warnings[0].contains("internal"));
    }

    #[test]
    fn test_exact_single_placeholder_copies_across() {
        let def = TemplateConfigDef::new("kafka.topic");
        let defs = [&def];
        let mut harness = Harness::new();
        let rule = rule("topic", RuleKind::Placeholder("${kafka.topic}".to_string()));
        harness.apply(&defs, &rule, "orders", &configs(&[]));
        assert_eq!(harness.fm_configs.get("kafka.topic").map(String::as_str), Some("orders"));
    }

    #[test]
    fn test_placeholder_with_user_value_for_referenced_key() {
        let def = TemplateConfigDef::new("kafka.topic");
        let defs = [&def];
        let mut harness = Harness::new();
        let rule = rule("topic", RuleKind::Placeholder("prefix-${kafka.topic}".to_string()));
        let user = configs(&[("kafka.topic", "orders")]);
        harness.apply(&defs, &rule, "user-topic-value", &user);
        // The enclosing rule name receives the user's own value verbatim
        assert_eq!(
            harness.fm_configs.get("topic").map(String::as_str),
            Some("user-topic-value")
        );
    }

    #[test]
    fn test_placeholder_defers_to_derivation() {
        let def = TemplateConfigDef::new("connection.host");
        let defs = [&def];
        let mut harness = Harness::new();
        let rule = rule(
            "connection.url",
            RuleKind::Placeholder("${connection.host}".to_string()),
        );
        harness.apply(&defs, &rule, "jdbc:mysql://h/db", &configs(&[]));
        // connection.host has a registered derivation, so nothing is
        // written here and nothing lands on the backlog
        assert!(harness.fm_configs.is_empty());
        assert!(harness.backlog.is_empty());
    }

    #[test]
    fn test_placeholder_internal_reference_warns() {
        let def = TemplateConfigDef::new("kafka.endpoint").with_internal(true);
        let defs = [&def];
        let mut harness = Harness::new();
        let rule = rule("endpoint", RuleKind::Placeholder("${kafka.endpoint}".to_string()));
        harness.apply(&defs, &rule, "value", &configs(&[]));
        assert!(harness.fm_configs.is_empty());
        assert!(harness.warnings[0].contains("will be inferred"));
    }

    #[test]
    fn test_placeholder_unknown_reference_goes_to_backlog() {
        let mut harness = Harness::new();
        let rule = rule("mystery", RuleKind::Placeholder("${not.a.def}".to_string()));
        harness.apply(&[], &rule, "value", &configs(&[]));
        assert!(harness.backlog.contains("mystery"));
    }

    #[test]
    fn test_placeholder_does_not_overwrite_existing() {
        let def = TemplateConfigDef::new("kafka.topic");
        let defs = [&def];
        let mut harness = Harness::new();
        harness
            .fm_configs
            .insert("kafka.topic".to_string(), "existing".to_string());
        let rule = rule("kafka.topic", RuleKind::Placeholder("${kafka.topic}".to_string()));
        harness.apply(&defs, &rule, "new-value", &configs(&[]));
        assert_eq!(harness.fm_configs.get("kafka.topic").map(String::as_str), Some("existing"));
    }

    #[test]
    fn test_reverse_switch_maps_value() {
        let def = TemplateConfigDef::new("output.data.format");
        let defs = [&def];
        let mut harness = Harness::new();
        let mapping: BTreeMap<String, String> = [
            ("AVRO".to_string(), "io.confluent.connect.avro.AvroConverter".to_string()),
            ("JSON".to_string(), "org.apache.kafka.connect.json.JsonConverter".to_string()),
        ]
        .into();
        let rule = rule(
            "value.converter",
            RuleKind::Switch(vec![SwitchArm {
                target: "output.data.format".to_string(),
                mapping,
            }]),
        );
        let user = configs(&[("value.converter", "io.confluent.connect.avro.AvroConverter")]);
        harness.apply(&defs, &rule, "io.confluent.connect.avro.AvroConverter", &user);
        assert_eq!(
            harness.fm_configs.get("output.data.format").map(String::as_str),
            Some("AVRO")
        );
    }

    #[test]
    fn test_reverse_switch_default_resolves_to_no_value() {
        let def = TemplateConfigDef::new("target.prop");
        let defs = [&def];
        let mut harness = Harness::new();
        let mapping: BTreeMap<String, String> = [("default".to_string(), "foo".to_string())].into();
        let rule = rule(
            "source.prop",
            RuleKind::Switch(vec![SwitchArm {
                target: "target.prop".to_string(),
                mapping,
            }]),
        );
        let user = configs(&[("source.prop", "foo")]);
        harness.apply(&defs, &rule, "foo", &user);
        assert!(!harness.fm_configs.contains_key("target.prop"));
        assert!(harness.warnings.is_empty());
    }

    #[test]
    fn test_reverse_switch_no_match_warns() {
        let def = TemplateConfigDef::new("target.prop");
        let defs = [&def];
        let mut harness = Harness::new();
        let mapping: BTreeMap<String, String> = [("A".to_string(), "a-value".to_string())].into();
        let rule = rule(
            "source.prop",
            RuleKind::Switch(vec![SwitchArm {
                target: "target.prop".to_string(),
                mapping,
            }]),
        );
        let user = configs(&[("source.prop", "unmatched")]);
        harness.apply(&defs, &rule, "unmatched", &user);
        assert!(harness.warnings[0].contains("does not match any value"));
    }

    #[test]
    fn test_switch_with_placeholders_defers_to_derivation() {
        let def = TemplateConfigDef::new("ssl.mode");
        let defs = [&def];
        let mut harness = Harness::new();
        let mapping: BTreeMap<String, String> =
            [("require".to_string(), "${ssl.mode}".to_string())].into();
        let rule = rule(
            "database.sslmode",
            RuleKind::Switch(vec![SwitchArm {
                target: "ssl.mode".to_string(),
                mapping,
            }]),
        );
        harness.apply(&defs, &rule, "require", &configs(&[]));
        // ssl.mode has a derivation; deferred, not backlogged
        assert!(harness.fm_configs.is_empty());
        assert!(harness.backlog.is_empty());
    }

    #[test]
    fn test_switch_with_placeholders_no_derivation_backlogs() {
        let def = TemplateConfigDef::new("exotic.prop");
        let defs = [&def];
        let mut harness = Harness::new();
        let mapping: BTreeMap<String, String> =
            [("x".to_string(), "${exotic.prop}".to_string())].into();
        let rule = rule(
            "source.prop",
            RuleKind::Switch(vec![SwitchArm {
                target: "exotic.prop".to_string(),
                mapping,
            }]),
        );
        harness.apply(&defs, &rule, "x", &configs(&[]));
        assert!(harness.backlog.contains("source.prop"));
    }

    #[test]
    fn test_dynamic_mapper_with_template_def_copies() {
        let def = TemplateConfigDef::new("strategy");
        let defs = [&def];
        let mut harness = Harness::new();
        let rule = rule("strategy", RuleKind::DynamicMapper("whatever.mapper".to_string()));
        harness.apply(&defs, &rule, "value", &configs(&[]));
        assert_eq!(harness.fm_configs.get("strategy").map(String::as_str), Some("value"));
    }

    #[test]
    fn test_dynamic_mapper_infers_strategy_class() {
        let mut harness = Harness::new();
        let rule = rule(
            "value.converter.reference.subject.name.strategy",
            RuleKind::DynamicMapper(
                "value.converter.reference.subject.name.strategy.mapper".to_string(),
            ),
        );
        harness.apply(
            &[],
            &rule,
            "io.confluent.kafka.serializers.subject.RecordNameStrategy",
            &configs(&[]),
        );
        assert_eq!(
            harness
                .fm_configs
                .get("value.converter.reference.subject.name.strategy")
                .map(String::as_str),
            Some("RecordNameStrategy")
        );
    }

    #[test]
    fn test_dynamic_mapper_failure_backlogs() {
        let mut harness = Harness::new();
        let rule = rule("weird", RuleKind::DynamicMapper("unknown.mapper".to_string()));
        harness.apply(&[], &rule, "value", &configs(&[]));
        assert!(harness.backlog.contains("weird"));
    }

    #[test]
    fn test_identity_copies_value() {
        let mut harness = Harness::new();
        let rule = rule("auto.create", RuleKind::Identity);
        harness.apply(&[], &rule, "true", &configs(&[]));
        assert_eq!(harness.fm_configs.get("auto.create").map(String::as_str), Some("true"));
    }
}
