//! Best-match search between SM properties and FM template properties

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::template::TemplateConfigDef;

use super::scorer::SimilarityScorer;

/// Configuration for property matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum combined score for a semantic match (inclusive)
    pub threshold: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { threshold: 0.7 }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acceptance threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

/// A property described by name, free text and grouping section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub description: String,
    pub section: String,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            section: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// Text used for embedding lookups
    pub fn text(&self) -> String {
        format!("{} {} {}", self.name, self.description, self.section)
    }
}

/// How a match was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact property name match
    Exact,
    /// Combined embedding and string similarity
    Semantic,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "exact"),
            MatchKind::Semantic => write!(f, "semantic"),
        }
    }
}

/// A matched FM property with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub property: String,
    pub score: f64,
    pub kind: MatchKind,
}

/// Matches SM properties against a set of FM property definitions
pub struct PropertyMatcher {
    scorer: SimilarityScorer,
    config: MatcherConfig,
}

impl Default for PropertyMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyMatcher {
    /// Create a matcher without an embedding backend
    pub fn new() -> Self {
        Self {
            scorer: SimilarityScorer::new(),
            config: MatcherConfig::default(),
        }
    }

    /// Create a matcher with a custom scorer and config
    pub fn with_scorer(scorer: SimilarityScorer, config: MatcherConfig) -> Self {
        Self { scorer, config }
    }

    /// Find the best matching FM property for an SM property.
    ///
    /// An exact name match short-circuits all scoring and returns with
    /// score 1.0. Otherwise every candidate is scored except those flagged
    /// exact-match-only, and the maximum is accepted when it reaches the
    /// threshold (inclusive). Below the threshold nothing is returned; the
    /// caller must treat the property as unmapped.
    pub fn find_best_match(
        &self,
        sm_property: &PropertyDescriptor,
        fm_properties: &BTreeMap<String, &TemplateConfigDef>,
    ) -> Option<MatchResult> {
        if fm_properties.contains_key(&sm_property.name) {
            return Some(MatchResult {
                property: sm_property.name.clone(),
                score: 1.0,
                kind: MatchKind::Exact,
            });
        }

        let sm_text = sm_property.text();
        let mut best: Option<(String, f64)> = None;

        for (name, def) in fm_properties {
            if def.is_direct_match_only() {
                continue;
            }

            let fm_descriptor = PropertyDescriptor {
                name: name.clone(),
                description: def.description.clone().unwrap_or_default(),
                section: def.section.clone().unwrap_or_default(),
            };
            let score = self.scorer.score(
                &sm_text,
                &sm_property.name,
                &fm_descriptor.text(),
                &fm_descriptor.name,
            );

            if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                best = Some((name.clone(), score));
            }
        }

        let (property, score) = best?;
        if score >= self.config.threshold {
            tracing::debug!(
                "Semantic match: '{}' -> '{}' (score: {:.3})",
                sm_property.name,
                property,
                score
            );
            Some(MatchResult {
                property,
                score,
                kind: MatchKind::Semantic,
            })
        } else {
            tracing::debug!(
                "Semantic match rejected: '{}' -> '{}' (score: {:.3}, threshold: {})",
                sm_property.name,
                property,
                score,
                self.config.threshold
            );
            None
        }
    }
}
