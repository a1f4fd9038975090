//! Target policy: how much replacement value a removal earns, how close a
//! bundle must come to it, and how bundles are weighted when ranked.
//!
//! One engine, many deployments: value-for-value replacement and small
//! top-up exchanges are two configurations of the same policy type.

use serde::{Deserialize, Serialize};

use fieldrep_core::{DomainError, DomainResult, Money, ValueObject};

/// Weights used by the bundle scorer. Scores are clamped to `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base_score: f64,
    /// Added when a product shares the removed product's category.
    pub category_bonus: f64,
    /// Subtracted when it does not.
    pub category_penalty: f64,
    /// Added when a product shares the removed product's subtype.
    pub affinity_bonus: f64,
    /// Multiplies `max(0, 1 - diff / target)`.
    pub value_accuracy_weight: f64,
    /// Multi-product bundles lose `penalty × diff / target`.
    pub penalty_per_unit_deviation: f64,
}

impl ScoringWeights {
    pub fn value_for_value() -> Self {
        Self {
            base_score: 50.0,
            category_bonus: 20.0,
            category_penalty: 20.0,
            affinity_bonus: 10.0,
            value_accuracy_weight: 20.0,
            penalty_per_unit_deviation: 10.0,
        }
    }

    pub fn top_up() -> Self {
        Self {
            base_score: 40.0,
            category_bonus: 25.0,
            category_penalty: 15.0,
            affinity_bonus: 15.0,
            value_accuracy_weight: 20.0,
            penalty_per_unit_deviation: 15.0,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        let weights = [
            ("base_score", self.base_score),
            ("category_bonus", self.category_bonus),
            ("category_penalty", self.category_penalty),
            ("affinity_bonus", self.affinity_bonus),
            ("value_accuracy_weight", self.value_accuracy_weight),
            ("penalty_per_unit_deviation", self.penalty_per_unit_deviation),
        ];
        for (name, value) in weights {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DomainError::validation(format!(
                    "scoring weight {name} must be a finite non-negative number"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::value_for_value()
    }
}

/// Replacement target policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetPolicy {
    /// Share of the removed value to replace, `0 < f <= 1`.
    pub target_fraction: f64,
    /// Symmetric acceptance band: `|total - target| <= target × tolerance`.
    pub tolerance_factor: f64,
    /// Over-target admission: `total >= target × lower_bound` is accepted too.
    pub lower_bound_factor: f64,
    /// Only the first N eligible priced products take part in pair generation.
    pub max_pair_candidates: usize,
    /// Pair quantities range over `1..=max_quantity_per_item`.
    pub max_quantity_per_item: u32,
    pub single_bucket_size: usize,
    pub multi_bucket_size: usize,
    pub max_results: usize,
    pub scoring_weights: ScoringWeights,
}

impl TargetPolicy {
    /// Replace the full removed value.
    pub fn value_for_value() -> Self {
        Self {
            target_fraction: 1.0,
            tolerance_factor: 0.2,
            lower_bound_factor: 0.95,
            max_pair_candidates: 20,
            max_quantity_per_item: 10,
            single_bucket_size: 3,
            multi_bucket_size: 2,
            max_results: 5,
            scoring_weights: ScoringWeights::value_for_value(),
        }
    }

    /// Small goodwill top-up worth a tenth of the removed value.
    pub fn top_up() -> Self {
        Self {
            target_fraction: 0.1,
            tolerance_factor: 0.3,
            lower_bound_factor: 1.0,
            max_pair_candidates: 15,
            max_quantity_per_item: 5,
            single_bucket_size: 3,
            multi_bucket_size: 3,
            max_results: 6,
            scoring_weights: ScoringWeights::top_up(),
        }
    }

    /// Look up a named preset (`value_for_value`, `top_up`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim() {
            "value_for_value" => Some(Self::value_for_value()),
            "top_up" => Some(Self::top_up()),
            _ => None,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !(self.target_fraction.is_finite()
            && self.target_fraction > 0.0
            && self.target_fraction <= 1.0)
        {
            return Err(DomainError::validation(
                "target_fraction must be in (0, 1]",
            ));
        }
        if !(self.tolerance_factor.is_finite() && self.tolerance_factor >= 0.0) {
            return Err(DomainError::validation(
                "tolerance_factor must be a finite non-negative number",
            ));
        }
        if !(self.lower_bound_factor.is_finite() && self.lower_bound_factor >= 0.0) {
            return Err(DomainError::validation(
                "lower_bound_factor must be a finite non-negative number",
            ));
        }
        if self.max_quantity_per_item == 0 {
            return Err(DomainError::validation(
                "max_quantity_per_item must be at least 1",
            ));
        }
        if self.max_results == 0 {
            return Err(DomainError::validation("max_results must be at least 1"));
        }
        self.scoring_weights.validate()
    }

    /// `target = removed_value × target_fraction`, in minor units.
    pub fn target(&self, removed_value: Money) -> f64 {
        if removed_value.is_zero() {
            return 0.0;
        }
        removed_value.as_f64() * self.target_fraction
    }

    /// Acceptance test shared by every generation strategy.
    ///
    /// Overshooting is preferred to undershooting, hence the second clause.
    pub fn accepts(&self, total_value: f64, target: f64) -> bool {
        let diff = (total_value - target).abs();
        diff <= target * self.tolerance_factor || total_value >= target * self.lower_bound_factor
    }
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self::value_for_value()
    }
}

impl ValueObject for TargetPolicy {}
