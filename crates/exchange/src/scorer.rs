//! Bundle scoring.
//!
//! A defensible ranking, not an optimum: same-category and same-subtype
//! bundles outrank cross-category ones of equal value accuracy, and
//! multi-product bundles pay for drifting from the target.

use fieldrep_catalog::Product;

use crate::bundle::BundleCandidate;
use crate::policy::ScoringWeights;
use crate::pool::AffinityProfile;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// Score a candidate in place and set its match flags.
pub fn score_bundle(
    candidate: &mut BundleCandidate,
    profile: &AffinityProfile,
    target: f64,
    weights: &ScoringWeights,
) {
    let deviation = if target > 0.0 {
        candidate.abs_difference() / target
    } else {
        0.0
    };
    let accuracy = if target > 0.0 {
        weights.value_accuracy_weight * (1.0 - deviation).max(0.0)
    } else {
        0.0
    };

    let components: Vec<f64> = candidate
        .items
        .iter()
        .map(|item| component_score(&item.product, profile, weights) + accuracy)
        .collect();

    let mut score = if components.is_empty() {
        0.0
    } else {
        components.iter().sum::<f64>() / components.len() as f64
    };
    if candidate.is_multi_item() {
        score -= weights.penalty_per_unit_deviation * deviation;
    }

    candidate.match_score = score.clamp(MIN_SCORE, MAX_SCORE);
    candidate.category_match = candidate
        .items
        .iter()
        .all(|i| profile.category_matches(&i.product));
    candidate.affinity_match = candidate
        .items
        .iter()
        .all(|i| profile.subtype_matches(&i.product));
}

/// Per-product part of the score, before value accuracy.
fn component_score(product: &Product, profile: &AffinityProfile, weights: &ScoringWeights) -> f64 {
    let mut score = weights.base_score;
    if profile.category_matches(product) {
        score += weights.category_bonus;
    } else {
        score -= weights.category_penalty;
    }
    if profile.subtype_matches(product) {
        score += weights.affinity_bonus;
    }
    score
}
