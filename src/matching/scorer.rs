//! Property similarity scoring
//!
//! Combines a semantic embedding cosine similarity (weight 0.7) with a
//! normalized string-edit similarity on the property names (weight 0.3).
//! The embedding backend is a pluggable capability; when it is absent the
//! semantic term contributes 0.0 and the weights are deliberately not
//! renormalized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Weight of the semantic embedding term in the combined score
pub const SEMANTIC_WEIGHT: f64 = 0.7;
/// Weight of the string-similarity term in the combined score
pub const STRING_WEIGHT: f64 = 0.3;

/// Sentence embedding backend.
///
/// Implementations may be unavailable or fail per-text; returning `None`
/// degrades scoring to the string term only.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

/// Computes similarity scores between property descriptors.
///
/// Embeddings are cached for the lifetime of the scorer, keyed by the exact
/// descriptor text; entries are write-once and never invalidated, so the
/// scorer is safe to share read-only across connectors.
pub struct SimilarityScorer {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    cache: Mutex<HashMap<String, Arc<Vec<f32>>>>,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityScorer {
    /// Create a scorer without an embedding backend (string-similarity only)
    pub fn new() -> Self {
        Self {
            provider: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a scorer backed by the given embedding provider
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider: Some(provider),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Score two property descriptors in `[0, 1]`
    pub fn score(&self, sm_text: &str, sm_name: &str, fm_text: &str, fm_name: &str) -> f64 {
        let semantic = match (self.embedding(sm_text), self.embedding(fm_text)) {
            (Some(sm_embedding), Some(fm_embedding)) => {
                cosine_similarity(&sm_embedding, &fm_embedding)
            }
            _ => 0.0,
        };

        let string_ratio =
            name_similarity_ratio(&sm_name.to_lowercase(), &fm_name.to_lowercase());

        SEMANTIC_WEIGHT * semantic + STRING_WEIGHT * (string_ratio / 100.0)
    }

    fn embedding(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        let provider = self.provider.as_ref()?;
        if text.is_empty() {
            return None;
        }

        let mut cache = self.cache.lock().ok()?;
        if let Some(embedding) = cache.get(text) {
            return Some(Arc::clone(embedding));
        }

        match provider.embed(text) {
            Some(embedding) => {
                let embedding = Arc::new(embedding);
                cache.insert(text.to_string(), Arc::clone(&embedding));
                Some(embedding)
            }
            None => {
                tracing::debug!("No embedding produced for text: '{:.50}'", text);
                None
            }
        }
    }
}

/// Cosine similarity of two vectors; 0.0 when either norm is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Normalized edit-distance ratio in `[0, 100]`
pub fn name_similarity_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let max_len = len_a.max(len_b);
    if max_len == 0 {
        return 100.0;
    }
    let distance = levenshtein_distance(a, b);
    100.0 * (1.0 - distance as f64 / max_len as f64)
}

/// Levenshtein distance with a two-row dynamic program
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let substitution_cost = if a_char == b_char { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + substitution_cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ConstantProvider {
        calls: AtomicUsize,
    }

    impl EmbeddingProvider for ConstantProvider {
        fn embed(&self, _text: &str) -> Option<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(vec![1.0, 0.0])
        }
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("abc", "abd"), 1);
        assert_eq!(levenshtein_distance("abc", "abcd"), 1);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_name_similarity_ratio() {
        assert_eq!(name_similarity_ratio("topics", "topics"), 100.0);
        assert_eq!(name_similarity_ratio("", ""), 100.0);
        assert_eq!(name_similarity_ratio("abc", "xyzxyz"), 0.0);
        let ratio = name_similarity_ratio("connection.host", "connection.port");
        assert!(ratio > 70.0 && ratio < 100.0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_score_without_provider_uses_string_term_only() {
        let scorer = SimilarityScorer::new();
        let score = scorer.score("topics desc sec", "topics", "topics desc sec", "topics");
        // Identical names: string ratio 100, semantic term absent, no
        // renormalization of the weights
        assert!((score - STRING_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_score_with_provider_combines_terms() {
        let provider = Arc::new(ConstantProvider {
            calls: AtomicUsize::new(0),
        });
        let scorer = SimilarityScorer::with_provider(provider);
        let score = scorer.score("abc d s", "abc", "xyzxyz d s", "xyzxyz");
        // Identical vectors: cosine 1.0; fully dissimilar names: ratio 0
        assert!((score - SEMANTIC_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_embedding_cache_hits_once_per_text() {
        let provider = Arc::new(ConstantProvider {
            calls: AtomicUsize::new(0),
        });
        let scorer =
            SimilarityScorer::with_provider(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>);
        scorer.score("same text", "a", "same text", "b");
        scorer.score("same text", "a", "same text", "b");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
