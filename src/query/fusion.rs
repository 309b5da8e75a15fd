//! Score normalization and fusion
//!
//! Both signals are mapped into [0, 1] before weighting so the fused
//! score compares like with like: cosine similarity by affine remap,
//! lexical relevance by clamp-and-divide against a calibrated cap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight configuration: weights must be non-negative and not both zero")]
    InvalidWeights,
}

/// Weights applied to the normalized sub-scores
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub vector: f32,
    pub text: f32,
}

impl ScoreWeights {
    pub fn new(vector: f32, text: f32) -> Result<Self, FusionError> {
        if vector < 0.0 || text < 0.0 || vector + text <= 0.0 {
            return Err(FusionError::InvalidWeights);
        }
        Ok(Self { vector, text })
    }
}

/// Remap cosine similarity from [-1, 1] to [0, 1]
pub fn remap_cosine(similarity: f32) -> f32 {
    (similarity + 1.0) / 2.0
}

/// Clamp a raw lexical score to `cap` and normalize into [0, 1].
///
/// The cap is a calibration knob, not a law; the default is tuned
/// against the shipped corpora and will not generalize automatically.
pub fn normalize_lexical(raw: f32, cap: f32) -> f32 {
    raw.min(cap) / cap
}

/// Weighted blend of the normalized sub-scores
pub fn fused_score(weights: &ScoreWeights, vector_score: f32, text_score: f32) -> f32 {
    weights.vector * vector_score + weights.text * text_score
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn remap_maps_the_endpoints_and_midpoint() {
        assert!((remap_cosine(1.0) - 1.0).abs() < EPS);
        assert!(remap_cosine(-1.0).abs() < EPS);
        assert!((remap_cosine(0.0) - 0.5).abs() < EPS);
    }

    #[test]
    fn lexical_scores_clamp_at_the_cap() {
        assert!((normalize_lexical(5.0, 10.0) - 0.5).abs() < EPS);
        assert!((normalize_lexical(25.0, 10.0) - 1.0).abs() < EPS);
        assert!(normalize_lexical(0.0, 10.0).abs() < EPS);
    }

    #[test]
    fn dominance_in_both_scores_dominates_the_fusion() {
        let weights = ScoreWeights::new(0.7, 0.3).unwrap();

        let strong = fused_score(&weights, 0.9, 0.8);
        let weak = fused_score(&weights, 0.4, 0.2);

        assert!(strong > weak);
    }

    #[test]
    fn default_weights_blend_as_specified() {
        let weights = ScoreWeights::new(0.7, 0.3).unwrap();
        let fused = fused_score(&weights, 0.5, 1.0);
        assert!((fused - (0.7 * 0.5 + 0.3)).abs() < EPS);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        assert!(ScoreWeights::new(-0.1, 0.5).is_err());
        assert!(ScoreWeights::new(0.0, 0.0).is_err());
        assert!(ScoreWeights::new(1.0, 0.0).is_ok());
    }
}
