//! Similarity between profiles, and between observed and predicted pay.
//!
//! Two notions live here:
//!
//! - feature similarity: a Gaussian kernel on vocabulary-index distance and
//!   experience distance, mixed with fixed weights
//! - coherence-aligned similarity: how close an observed compensation is to
//!   what the *target* is predicted to earn
//!
//! Every score returned is in `[0, 1]`.

use crate::domain::SimilarityConfig;
use crate::math::clamp_unit;
use crate::models::LocationVocabulary;

/// Closeness of two `(location, xp)` pairs in feature space.
///
/// Location distance is the absolute difference of vocabulary indices, so it
/// depends on discovery order rather than geography.
pub fn feature_similarity(
    vocab: &LocationVocabulary,
    a: (&str, f64),
    b: (&str, f64),
    config: &SimilarityConfig,
) -> f64 {
    let d_loc = vocab.index_of(a.0) as f64 - vocab.index_of(b.0) as f64;
    let location_sim = (-(d_loc * d_loc) / 2.0).exp();

    let d_xp = a.1 - b.1;
    let sigma = if config.sigma_xp > 0.0 { config.sigma_xp } else { 1.0 };
    let xp_sim = (-(d_xp * d_xp) / (2.0 * sigma * sigma)).exp();

    clamp_unit(config.w_location * location_sim + config.w_xp * xp_sim)
}

/// `1 - |actual - predicted| / actual`, clamped; 0 when `actual <= 0`.
pub fn coherence_score(actual: f64, predicted: f64) -> f64 {
    if !(actual > 0.0) {
        return 0.0;
    }
    clamp_unit(1.0 - ((actual - predicted) / actual).abs())
}

/// Score a population member's compensation against the target's prediction.
///
/// Same metric as [`coherence_score`], with the member's own compensation as
/// the reference.
pub fn aligned_similarity(comparison_actual: f64, target_predicted: f64) -> f64 {
    coherence_score(comparison_actual, target_predicted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompensationRecord;

    fn vocab() -> LocationVocabulary {
        let records: Vec<CompensationRecord> = ["Paris", "Lyon", "Nantes"]
            .iter()
            .map(|l| CompensationRecord::new(*l, Some(1.0), 1.0))
            .collect();
        LocationVocabulary::from_records(&records)
    }

    #[test]
    fn profile_is_fully_similar_to_itself() {
        let cfg = SimilarityConfig::default();
        let v = vocab();
        for p in [("Paris", 3.0), ("Nowhere", 0.0), ("Nantes", 17.5)] {
            assert!((feature_similarity(&v, p, p, &cfg) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn similarity_decays_with_index_and_xp_distance() {
        let cfg = SimilarityConfig::default();
        let v = vocab();
        let near = feature_similarity(&v, ("Paris", 3.0), ("Lyon", 3.0), &cfg);
        let far = feature_similarity(&v, ("Paris", 3.0), ("Nantes", 3.0), &cfg);
        assert!(near > far);
        assert!((near - (0.6 * (-0.5f64).exp() + 0.4)).abs() < 1e-12);

        let xp_far = feature_similarity(&v, ("Paris", 0.0), ("Paris", 20.0), &cfg);
        assert!((0.6..0.61).contains(&xp_far));
    }

    #[test]
    fn coherence_is_bounded_and_zero_for_non_positive_actual() {
        assert_eq!(coherence_score(0.0, 50_000.0), 0.0);
        assert_eq!(coherence_score(-10.0, 50_000.0), 0.0);
        assert_eq!(coherence_score(50_000.0, 50_000.0), 1.0);
        assert!((coherence_score(50_000.0, 45_000.0) - 0.9).abs() < 1e-12);
        assert_eq!(coherence_score(1_000.0, 50_000.0), 0.0);
        assert_eq!(coherence_score(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn aligned_similarity_uses_member_compensation_as_reference() {
        assert!((aligned_similarity(40_000.0, 50_000.0) - 0.75).abs() < 1e-12);
        assert!((aligned_similarity(50_000.0, 40_000.0) - 0.8).abs() < 1e-12);
    }
}
