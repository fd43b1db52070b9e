//! Semantic and string similarity matching between connector properties
//!
//! Matching is the last-resort mapping strategy: a property that no
//! template rule or derivation resolved is compared against every FM
//! property definition using a combined embedding-cosine and
//! edit-distance score, and accepted only at or above a confidence
//! threshold. Exact name matches bypass scoring entirely.

mod matcher;
mod scorer;

pub use matcher::{MatchKind, MatchResult, MatcherConfig, PropertyDescriptor, PropertyMatcher};
pub use scorer::{
    EmbeddingProvider, SEMANTIC_WEIGHT, STRING_WEIGHT, SimilarityScorer, cosine_similarity,
    levenshtein_distance, name_similarity_ratio,
};
