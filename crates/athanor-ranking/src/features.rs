//! Per-candidate feature computation

/// Sampling temperature considered ideal for prompt generation.
pub const IDEAL_TEMPERATURE: f64 = 0.7;

// Token-budget usage band considered healthy: below the floor reads as
// excessive brevity, at the ceiling the output likely hit the budget.
const EFFICIENCY_FLOOR: f64 = 0.3;
const EFFICIENCY_CEILING: f64 = 0.9;

/// Closeness of the generation temperature to the ideal, in `[0, 1]`.
#[must_use]
pub fn temperature_score(temperature: f64) -> f64 {
    (1.0 - (temperature - IDEAL_TEMPERATURE).abs() / IDEAL_TEMPERATURE).clamp(0.0, 1.0)
}

/// How well the candidate used its token budget, in `[0, 1]`.
///
/// Usage inside the healthy band scores 1.0; under-use scales down
/// linearly toward zero, and usage at the very top of the budget is
/// penalized as likely truncation. Unknown usage scores a neutral 0.5.
#[must_use]
pub fn token_efficiency_score(actual_tokens: u32, max_tokens: u32) -> f64 {
    if actual_tokens == 0 || max_tokens == 0 {
        return 0.5;
    }
    let ratio = (f64::from(actual_tokens) / f64::from(max_tokens)).clamp(0.0, 1.0);
    if ratio < EFFICIENCY_FLOOR {
        ratio / EFFICIENCY_FLOOR
    } else if ratio <= EFFICIENCY_CEILING {
        1.0
    } else {
        (1.0 - ratio) / (1.0 - EFFICIENCY_CEILING)
    }
}

/// Length similarity between candidate and query, in `[0, 1]`.
#[must_use]
pub fn length_score(candidate: &str, query: &str) -> f64 {
    let len_a = candidate.len() as f64;
    let len_b = query.len() as f64;
    if len_a == 0.0 || len_b == 0.0 {
        return 0.0;
    }
    let ratio = len_a / len_b;
    if ratio > 1.0 { 1.0 / ratio } else { ratio }
}

/// Cosine similarity of the embeddings mapped to `[0, 1]`; 0.0 when
/// either embedding is missing.
#[must_use]
pub fn semantic_similarity_score(candidate: Option<&[f32]>, query: Option<&[f32]>) -> f64 {
    match (candidate, query) {
        (Some(a), Some(b)) => (cosine_similarity(a, b) + 1.0) / 2.0,
        _ => 0.0,
    }
}

/// Cosine similarity between two vectors, in `[-1, 1]`.
///
/// Mismatched lengths compare the common prefix; all-zero vectors score
/// 0.0.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let n = a.len().min(b.len());

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for i in 0..n {
        let va = f64::from(a[i]);
        let vb = f64::from(b[i]);
        dot += va * vb;
        norm_a += va * va;
        norm_b += vb * vb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_temperature_scores_one() {
        assert!((temperature_score(0.7) - 1.0).abs() < 1e-9);
        assert!(temperature_score(0.0) < 0.01);
        assert!(temperature_score(1.4) < 0.01);
        assert!(temperature_score(2.0) >= 0.0);
    }

    #[test]
    fn token_efficiency_band() {
        // Healthy usage.
        assert_eq!(token_efficiency_score(1024, 2048), 1.0);
        // Excessive brevity scales down.
        assert!(token_efficiency_score(100, 2048) < 0.2);
        // Budget exhaustion reads as truncation.
        assert_eq!(token_efficiency_score(2048, 2048), 0.0);
        // Unknown usage is neutral.
        assert_eq!(token_efficiency_score(0, 2048), 0.5);
    }

    #[test]
    fn length_score_is_symmetric_ratio() {
        assert!((length_score("aaaa", "aa") - 0.5).abs() < 1e-9);
        assert!((length_score("aa", "aaaa") - 0.5).abs() < 1e-9);
        assert_eq!(length_score("", "aa"), 0.0);
        assert!((length_score("abcd", "wxyz") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_known_values() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        let c = [1.0f32, 0.0];
        assert!((cosine_similarity(&a, &b)).abs() < 1e-9);
        assert!((cosine_similarity(&a, &c) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&a, &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&a, &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn missing_embedding_scores_zero() {
        let v = vec![0.5f32, 0.5];
        assert_eq!(semantic_similarity_score(None, Some(&v)), 0.0);
        assert_eq!(semantic_similarity_score(Some(&v), None), 0.0);
        // Identical vectors map to the top of [0, 1].
        assert!((semantic_similarity_score(Some(&v), Some(&v)) - 1.0).abs() < 1e-9);
    }
}
