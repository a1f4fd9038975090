use serde::{Deserialize, Serialize};

use fieldrep_core::{format_minor_units, Money, ProductId};

use crate::line_item::LineItem;

/// Which producer built a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleOrigin {
    /// One product, quantity chosen to reach the target.
    Single,
    /// Two distinct products with bounded quantities.
    Pair,
    /// Assembled by the operator.
    Manual,
}

/// One proposed replacement. Ephemeral: recomputed on every run, never
/// persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleCandidate {
    /// Deterministic key derived from origin, products and quantities.
    pub id: String,
    pub origin: BundleOrigin,
    pub items: Vec<LineItem>,
    pub total_value: Money,
    /// `total_value - target` in minor units (signed, never clamped).
    pub value_difference: f64,
    pub match_score: f64,
    pub category_match: bool,
    pub affinity_match: bool,
}

impl BundleCandidate {
    /// Build an unscored candidate; the scorer fills score and match flags.
    pub(crate) fn unscored(origin: BundleOrigin, items: Vec<LineItem>, target: f64) -> Self {
        let total_value: Money = items.iter().map(LineItem::value).sum();
        Self {
            id: bundle_key(origin, &items),
            origin,
            value_difference: total_value.as_f64() - target,
            total_value,
            items,
            match_score: 0.0,
            category_match: false,
            affinity_match: false,
        }
    }

    /// `|total_value - target|`.
    pub fn abs_difference(&self) -> f64 {
        self.value_difference.abs()
    }

    pub fn is_multi_item(&self) -> bool {
        self.items.len() > 1
    }

    pub fn product_ids(&self) -> impl Iterator<Item = ProductId> + '_ {
        self.items.iter().map(LineItem::product_id)
    }

    /// Operator-facing deviation, e.g. `"+25.00 over target"`.
    pub fn deviation_label(&self) -> String {
        let rounded = self.value_difference.round();
        if rounded > 0.0 {
            format!("+{} over target", format_minor_units(self.value_difference))
        } else if rounded < 0.0 {
            format!("{} under target", format_minor_units(self.value_difference))
        } else {
            "on target".to_string()
        }
    }
}

fn bundle_key(origin: BundleOrigin, items: &[LineItem]) -> String {
    let prefix = match origin {
        BundleOrigin::Single => "single",
        BundleOrigin::Pair => "pair",
        BundleOrigin::Manual => "manual",
    };
    let parts: Vec<String> = items
        .iter()
        .map(|i| format!("{}x{}", i.product_id(), i.quantity))
        .collect();
    format!("{prefix}:{}", parts.join("+"))
}
