//! The per-connector mapping pass
//!
//! `ConfigMapper` drives the fallback chain for every property: template
//! rules first, then built-in derivations, then direct name
//! reconciliation, then semantic matching, followed by required-field and
//! recommended-value validation and transform classification. A
//! `MappingOutcome` is always produced; per-property problems degrade to
//! warnings and errors instead of aborting the connector.

use std::collections::{BTreeMap, BTreeSet};

use crate::matching::{PropertyDescriptor, PropertyMatcher};
use crate::template::{EmptySmTemplateStore, SmTemplateStore, TemplateConfigDef, TemplateRepository};
use crate::transforms::{EmptyTransformCatalog, TransformCatalog, TransformClassification};

use super::derive::{DerivationContext, DerivationRegistry, resolve_default};
use super::rules::RuleInterpreter;
use super::types::{ConnectorConfig, MappingOutcome, normalize_configs};

/// Maps self-managed connector configurations onto FM templates.
///
/// All collaborators are injected at construction time; the mapper holds no
/// hidden per-call state beyond its write-once caches and is reentrant, so
/// independent connectors may be mapped from multiple threads.
pub struct ConfigMapper {
    templates: TemplateRepository,
    sm_templates: Box<dyn SmTemplateStore>,
    matcher: PropertyMatcher,
    transform_catalog: Box<dyn TransformCatalog>,
    registry: DerivationRegistry,
}

impl ConfigMapper {
    /// Create a mapper over the given template repository with default
    /// collaborators: no SM metadata, string-only matching, no allowed
    /// transforms.
    pub fn new(templates: TemplateRepository) -> Self {
        Self {
            templates,
            sm_templates: Box::new(EmptySmTemplateStore),
            matcher: PropertyMatcher::new(),
            transform_catalog: Box::new(EmptyTransformCatalog),
            registry: DerivationRegistry::builtin(),
        }
    }

    /// Supply SM template metadata for semantic-match enrichment
    pub fn with_sm_templates(mut self, sm_templates: Box<dyn SmTemplateStore>) -> Self {
        self.sm_templates = sm_templates;
        self
    }

    /// Replace the property matcher
    pub fn with_matcher(mut self, matcher: PropertyMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Supply the allowed-transform catalog
    pub fn with_transform_catalog(mut self, transform_catalog: Box<dyn TransformCatalog>) -> Self {
        self.transform_catalog = transform_catalog;
        self
    }

    /// Replace the derivation registry
    pub fn with_derivations(mut self, registry: DerivationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Map one connector's configuration to its FM equivalent.
    ///
    /// Always returns an outcome; callers bucket connectors by the error
    /// list, never by exceptions.
    pub fn map_connector(&self, connector_name: &str, user_configs: &ConnectorConfig) -> MappingOutcome {
        let mut outcome = MappingOutcome::new(connector_name);

        if user_configs.is_empty() {
            outcome
                .errors
                .push("No configuration properties provided".to_string());
            return outcome;
        }

        let configs = normalize_configs(user_configs);

        let Some(connector_class) = configs.get("connector.class").cloned() else {
            outcome
                .errors
                .push("Missing required 'connector.class' configuration".to_string());
            return outcome;
        };

        let Some(template) =
            self.templates
                .find_for_connector(&connector_class, Some(connector_name), &configs)
        else {
            outcome.errors.push(format!(
                "No FM template found for connector class: {}",
                connector_class
            ));
            self.minimal_skeleton(&mut outcome, &connector_class, connector_name);
            return outcome;
        };

        if template.templates.is_empty() {
            outcome.errors.push(format!(
                "FM template for {} has no templates defined",
                connector_class
            ));
            self.minimal_skeleton(&mut outcome, &connector_class, connector_name);
            return outcome;
        }

        let config_defs: Vec<&TemplateConfigDef> = template.config_defs();
        if config_defs.is_empty() {
            outcome.errors.push(format!(
                "FM template for {} defines no config properties",
                connector_class
            ));
            self.minimal_skeleton(&mut outcome, &connector_class, connector_name);
            return outcome;
        }
        let rules = template.rules();

        let mut fm_configs: BTreeMap<String, String> = BTreeMap::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut semantic_backlog: BTreeSet<String> = BTreeSet::new();

        let plugin_id = template
            .primary_template_id()
            .unwrap_or(&connector_class)
            .to_string();
        fm_configs.insert("connector.class".to_string(), plugin_id.clone());
        fm_configs.insert("name".to_string(), connector_name.to_string());
        fm_configs.insert(
            "tasks.max".to_string(),
            configs.get("tasks.max").cloned().unwrap_or_else(|| "1".to_string()),
        );

        self.connector_defs_pass(
            &configs,
            &rules,
            &config_defs,
            &mut fm_configs,
            &mut warnings,
            &mut semantic_backlog,
        );
        self.template_defs_pass(&configs, &config_defs, &mut fm_configs);
        self.direct_name_reconcile(&configs, &config_defs, &mut fm_configs, &mut semantic_backlog);
        self.semantic_match_pass(
            &connector_class,
            &configs,
            &config_defs,
            &semantic_backlog,
            &mut fm_configs,
            &mut warnings,
        );
        self.required_validation(&config_defs, &mut fm_configs, &mut errors);

        let classification = self.classify_with_plugin(&configs, &plugin_id);
        fm_configs.extend(classification.allowed);
        errors.extend(classification.mapping_errors);

        tracing::info!(
            "Mapped connector '{}' with {} properties, {} warnings, {} errors",
            connector_name,
            fm_configs.len(),
            warnings.len(),
            errors.len()
        );

        outcome.fm_configs = fm_configs;
        outcome.warnings = warnings;
        outcome.errors = errors;
        outcome
    }

    /// Classify a connector's transforms against a plugin's allowed set.
    /// Usable standalone, outside a full mapping pass.
    pub fn classify_transforms(
        &self,
        config: &ConnectorConfig,
        plugin_id: &str,
    ) -> TransformClassification {
        let configs = normalize_configs(config);
        self.classify_with_plugin(&configs, plugin_id)
    }

    fn classify_with_plugin(
        &self,
        configs: &BTreeMap<String, String>,
        plugin_id: &str,
    ) -> TransformClassification {
        let allowed_types = self.transform_catalog.allowed_types(plugin_id);
        crate::transforms::classify_transforms(configs, &allowed_types)
    }

    fn minimal_skeleton(
        &self,
        outcome: &mut MappingOutcome,
        connector_class: &str,
        connector_name: &str,
    ) {
        outcome
            .fm_configs
            .insert("connector.class".to_string(), connector_class.to_string());
        outcome
            .fm_configs
            .insert("name".to_string(), connector_name.to_string());
    }

    /// First pass: dispatch user keys to their matching template rule, or
    /// warn when a key matches nothing on either side.
    fn connector_defs_pass(
        &self,
        configs: &BTreeMap<String, String>,
        rules: &[&crate::template::ConnectorRule],
        config_defs: &[&TemplateConfigDef],
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        let interpreter = RuleInterpreter {
            config_defs,
            registry: &self.registry,
        };

        for (key, value) in configs {
            if key.starts_with("connector.class") || key.starts_with("name") {
                continue;
            }
            if key.starts_with("transforms") || key.starts_with("predicates") {
                continue;
            }

            if let Some(rule) = rules.iter().find(|rule| rule.name == *key) {
                interpreter.apply(rule, value, configs, fm_configs, warnings, semantic_backlog);
                continue;
            }

            let rewritten = rewrite_override_prefix(key);
            let found_in_template = config_defs.iter().any(|def| def.name == *key)
                || rewritten
                    .as_deref()
                    .is_some_and(|rewritten_key| config_defs.iter().any(|def| def.name == rewritten_key));
            if !found_in_template {
                let warning = format!(
                    "Unused connector config '{}'. Given value will be ignored. Default value will be used if any.",
                    key
                );
                tracing::warn!("{}", warning);
                warnings.push(warning);
            }
        }
    }

    /// Second pass: run registered derivations for every template property
    /// that is still unresolved.
    fn template_defs_pass(
        &self,
        configs: &BTreeMap<String, String>,
        config_defs: &[&TemplateConfigDef],
        fm_configs: &mut BTreeMap<String, String>,
    ) {
        for def in config_defs {
            if fm_configs.contains_key(&def.name) {
                continue;
            }
            let Some(derivation) = self.registry.get(&def.name) else {
                continue;
            };
            let derived = {
                let ctx = DerivationContext {
                    user_configs: configs,
                    fm_configs,
                    config_defs,
                    config_name: &def.name,
                };
                derivation(&ctx)
            };
            if let Some(value) = derived {
                tracing::debug!("Derived value for {}: {}", def.name, value);
                fm_configs.insert(def.name.clone(), value);
            }
        }
    }

    /// Third pass: copy through user keys whose (possibly prefix-rewritten)
    /// name exactly equals a template property name.
    fn direct_name_reconcile(
        &self,
        configs: &BTreeMap<String, String>,
        config_defs: &[&TemplateConfigDef],
        fm_configs: &mut BTreeMap<String, String>,
        semantic_backlog: &mut BTreeSet<String>,
    ) {
        for (key, value) in configs {
            if fm_configs.contains_key(key) {
                semantic_backlog.remove(key);
                continue;
            }

            let rewritten = rewrite_override_prefix(key);
            let matched = rewritten
                .as_deref()
                .into_iter()
                .chain(std::iter::once(key.as_str()))
                .find(|candidate| config_defs.iter().any(|def| def.name == *candidate));

            if let Some(matched) = matched {
                tracing::debug!("Direct match found: {} = {}", matched, value);
                fm_configs.insert(matched.to_string(), value.clone());
                semantic_backlog.remove(key);
                if let Some(rewritten_key) = &rewritten {
                    semantic_backlog.remove(rewritten_key);
                }
            }
        }
    }

    /// Fourth pass: semantic matching for everything the earlier passes
    /// left on the backlog.
    fn semantic_match_pass(
        &self,
        connector_class: &str,
        configs: &BTreeMap<String, String>,
        config_defs: &[&TemplateConfigDef],
        semantic_backlog: &BTreeSet<String>,
        fm_configs: &mut BTreeMap<String, String>,
        warnings: &mut Vec<String>,
    ) {
        if semantic_backlog.is_empty() {
            return;
        }

        tracing::info!(
            "Performing semantic matching for {} configs",
            semantic_backlog.len()
        );

        let sm_template = self.sm_templates.template_for(connector_class);
        let fm_properties: BTreeMap<String, &TemplateConfigDef> = config_defs
            .iter()
            .map(|def| (def.name.clone(), *def))
            .collect();

        for config_name in semantic_backlog {
            let Some(user_value) = configs.get(config_name) else {
                tracing::warn!(
                    "Config {} not found in user configs for semantic matching",
                    config_name
                );
                continue;
            };

            let sm_property = sm_template
                .as_ref()
                .and_then(|template| template.find_property(config_name))
                .map(|property| {
                    PropertyDescriptor::new(config_name.clone())
                        .with_description(property.description.clone().unwrap_or_default())
                        .with_section(property.section.clone().unwrap_or_default())
                })
                .unwrap_or_else(|| {
                    PropertyDescriptor::new(config_name.clone())
                        .with_description(format!("User config: {}", config_name))
                        .with_section("General")
                });

            match self.matcher.find_best_match(&sm_property, &fm_properties) {
                Some(result) => {
                    if !fm_configs.contains_key(&result.property) {
                        tracing::info!(
                            "Semantic match: {} -> {} ({}, score: {:.3})",
                            config_name,
                            result.property,
                            result.kind,
                            result.score
                        );
                        fm_configs.insert(result.property, user_value.clone());
                    }
                }
                None => {
                    push_unique(
                        warnings,
                        format!("No semantic match found for config '{}'.", config_name),
                    );
                }
            }
        }
    }

    /// Fifth pass: fill required properties from defaults, then report the
    /// ones that stay unresolved and any value outside its recommended set.
    fn required_validation(
        &self,
        config_defs: &[&TemplateConfigDef],
        fm_configs: &mut BTreeMap<String, String>,
        errors: &mut Vec<String>,
    ) {
        for def in config_defs {
            if def.internal {
                continue;
            }

            if def.required && !fm_configs.contains_key(&def.name) {
                match def.default_value_str() {
                    Some(default) => {
                        let resolved = resolve_default(&default, fm_configs);
                        tracing::info!(
                            "Required config '{}' missing, using default '{}'",
                            def.name,
                            resolved
                        );
                        fm_configs.insert(def.name.clone(), resolved);
                    }
                    None => {
                        push_unique(
                            errors,
                            format!(
                                "Required FM Config '{}' could not be derived from given configs.",
                                def.name
                            ),
                        );
                    }
                }
            }

            if let Some(value) = fm_configs.get(&def.name) {
                if !def.recommended_values.is_empty()
                    && !def.recommended_values.iter().any(|recommended| recommended == value)
                    && !def
                        .recommended_values
                        .iter()
                        .any(|recommended| recommended.eq_ignore_ascii_case(value))
                {
                    push_unique(
                        errors,
                        format!(
                            "FM Config '{}' value '{}' is not in the recommended values list: {:?}",
                            def.name, value, def.recommended_values
                        ),
                    );
                }
            }
        }
    }
}

/// Rewrite between the `consumer./producer.` and `.override.` prefix forms;
/// both directions are valid lookups.
fn rewrite_override_prefix(key: &str) -> Option<String> {
    if let Some(rest) = key.strip_prefix("consumer.override.") {
        return Some(format!("consumer.{}", rest));
    }
    if let Some(rest) = key.strip_prefix("producer.override.") {
        return Some(format!("producer.{}", rest));
    }
    if let Some(rest) = key.strip_prefix("consumer.") {
        return Some(format!("consumer.override.{}", rest));
    }
    if let Some(rest) = key.strip_prefix("producer.") {
        return Some(format!("producer.override.{}", rest));
    }
    None
}

fn push_unique(list: &mut Vec<String>, message: String) {
    if !list.contains(&message) {
        list.push(message);
    }
}

/// Helper for building a single-template repository in tests
#[cfg(test)]
pub(crate) fn repository_with(template: crate::template::FmTemplate) -> TemplateRepository {
    TemplateRepository::new().with_template("test-template", template)
}
