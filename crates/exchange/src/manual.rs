//! Operator-assembled bundles.

use fieldrep_catalog::Product;
use fieldrep_core::{DomainError, DomainResult, Money, ProductId};

use crate::bundle::{BundleCandidate, BundleOrigin};
use crate::line_item::{LineItem, LineItems, RemovalSet};
use crate::policy::TargetPolicy;
use crate::scorer::MAX_SCORE;

/// Builds a bundle by hand while reporting live progress against the same
/// target the engine uses.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualBundleBuilder {
    target: f64,
    items: LineItems,
}

impl ManualBundleBuilder {
    pub fn new(target: f64) -> Self {
        Self {
            target: target.max(0.0),
            items: LineItems::new(),
        }
    }

    /// Builder whose target is derived from a removal set under `policy`.
    pub fn for_removal(removed: &RemovalSet, policy: &TargetPolicy) -> Self {
        Self::new(policy.target(removed.removed_value()))
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Add units of a product; quantities of an already-added product merge.
    pub fn add(&mut self, product: Product, quantity: u32) -> &mut Self {
        self.items.add(LineItem::new(product, quantity));
        self
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        if self.items.set_quantity(product_id, quantity) {
            Ok(())
        } else {
            Err(DomainError::not_found())
        }
    }

    pub fn remove(&mut self, product_id: ProductId) -> Option<LineItem> {
        self.items.remove(product_id)
    }

    pub fn items(&self) -> &[LineItem] {
        self.items.items()
    }

    pub fn total(&self) -> Money {
        self.items.total_value()
    }

    /// `min(100, total / target × 100)`.
    pub fn progress(&self) -> f64 {
        let total = self.total();
        if self.target <= 0.0 {
            return if total.is_zero() { 0.0 } else { 100.0 };
        }
        (total.as_f64() / self.target * 100.0).min(100.0)
    }

    /// Signed amount still missing (`target - total`); negative once over.
    pub fn remaining(&self) -> f64 {
        self.target - self.total().as_f64()
    }

    /// Wrap the positive-quantity lines into a candidate with the maximum
    /// score: the operator picked it, so it is the preferred choice.
    pub fn finish(&self) -> DomainResult<BundleCandidate> {
        let items: Vec<LineItem> = self.items.positive().cloned().collect();
        if items.is_empty() {
            return Err(DomainError::validation(
                "manual bundle needs at least one product with a positive quantity",
            ));
        }

        let mut candidate = BundleCandidate::unscored(BundleOrigin::Manual, items, self.target);
        candidate.match_score = MAX_SCORE;
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_catalog::ProductSubtype;

    fn product(price: u64) -> Product {
        Product::new(
            ProductId::new(),
            "Detergent 2L",
            "household",
            ProductSubtype::Standard,
            Money::from_minor(price),
        )
        .unwrap()
    }

    #[test]
    fn progress_is_capped_at_one_hundred() {
        let mut builder = ManualBundleBuilder::new(1_000.0);
        let p = product(250);
        builder.add(p.clone(), 2);
        assert_eq!(builder.progress(), 50.0);
        builder.add(p, 4);
        assert_eq!(builder.progress(), 100.0);
        assert_eq!(builder.remaining(), -500.0);
    }

    #[test]
    fn over_target_is_reported_not_clamped() {
        let mut builder = ManualBundleBuilder::new(2_000.0);
        builder.add(product(1_000), 3);

        let bundle = builder.finish().unwrap();
        assert_eq!(bundle.value_difference, 1_000.0);
        assert_eq!(bundle.deviation_label(), "+10.00 over target");
        assert_eq!(bundle.match_score, 100.0);
        assert_eq!(bundle.origin, BundleOrigin::Manual);
    }

    #[test]
    fn finish_requires_a_positive_line() {
        let mut builder = ManualBundleBuilder::new(500.0);
        let err = builder.finish().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let p = product(100);
        builder.add(p.clone(), 0);
        assert!(builder.finish().is_err());

        builder.set_quantity(p.id_typed(), 2).unwrap();
        assert_eq!(builder.finish().unwrap().items.len(), 1);
    }

    #[test]
    fn set_quantity_on_missing_product_fails() {
        let mut builder = ManualBundleBuilder::new(500.0);
        assert_eq!(
            builder.set_quantity(ProductId::new(), 1),
            Err(DomainError::NotFound)
        );
    }

    #[test]
    fn uses_policy_target() {
        let removed = RemovalSet::from_items(vec![LineItem::new(product(5_000), 1)]);
        let builder = ManualBundleBuilder::for_removal(&removed, &TargetPolicy::top_up());
        assert_eq!(builder.target(), 500.0);
    }

    #[test]
    fn zero_target_progress() {
        let mut builder = ManualBundleBuilder::new(0.0);
        assert_eq!(builder.progress(), 0.0);
        builder.add(product(100), 1);
        assert_eq!(builder.progress(), 100.0);
    }

    #[test]
    fn merges_same_product() {
        let mut builder = ManualBundleBuilder::new(1_000.0);
        let p = product(100);
        builder.add(p.clone(), 1).add(p.clone(), 2);
        assert_eq!(builder.items().len(), 1);
        assert_eq!(builder.total(), Money::from_minor(300));
        assert!(builder.remove(p.id_typed()).is_some());
        assert!(builder.items().is_empty());
    }
}
