//! Bundle generation strategies.
//!
//! Both strategies run against the same target and acceptance test and return
//! unscored candidates in generation order (pool order; for pairs
//! `(i, j, q1, q2)` lexicographic).

use fieldrep_catalog::Product;

use crate::abort::AbortHandle;
use crate::bundle::{BundleCandidate, BundleOrigin};
use crate::error::RecommendError;
use crate::line_item::LineItem;
use crate::policy::TargetPolicy;

/// Absorbs float noise from fractional targets before rounding a quantity up
/// (`500.00000000000006 / 250` must still mean 2 units).
const QUANTITY_EPSILON: f64 = 1e-9;

/// One product per bundle, quantity `max(1, ceil(target / price))`.
///
/// Products without a price are skipped.
pub fn single_product_bundles<'a>(
    pool: impl IntoIterator<Item = &'a Product>,
    target: f64,
    policy: &TargetPolicy,
) -> Vec<BundleCandidate> {
    if target <= 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for product in pool.into_iter().filter(|p| p.is_priced()) {
        let price = product.unit_price().as_f64();
        let quantity = units_to_reach(target, price);
        let total = price * f64::from(quantity);
        if !policy.accepts(total, target) {
            continue;
        }
        out.push(BundleCandidate::unscored(
            BundleOrigin::Single,
            vec![LineItem::new(product.clone(), quantity)],
            target,
        ));
    }
    out
}

/// Two distinct products with quantities in `1..=max_quantity_per_item`.
///
/// Only the first `max_pair_candidates` priced products take part; the search
/// is `O(n² × q²)` otherwise. Zero-price products are dropped before the bound
/// is applied, so they never use up a slot in the window. The abort flag is
/// checked once per product pair.
pub fn pair_bundles<'a>(
    pool: impl IntoIterator<Item = &'a Product>,
    target: f64,
    policy: &TargetPolicy,
    abort: &AbortHandle,
) -> Result<Vec<BundleCandidate>, RecommendError> {
    if target <= 0.0 {
        return Ok(Vec::new());
    }

    let bounded: Vec<&Product> = pool
        .into_iter()
        .filter(|p| p.is_priced())
        .take(policy.max_pair_candidates)
        .collect();

    let mut out = Vec::new();
    for (i, first) in bounded.iter().enumerate() {
        for second in &bounded[i + 1..] {
            if abort.is_aborted() {
                return Err(RecommendError::Aborted);
            }
            if first.id_typed() == second.id_typed() {
                continue;
            }

            let p1 = first.unit_price().as_f64();
            let p2 = second.unit_price().as_f64();
            for q1 in 1..=policy.max_quantity_per_item {
                for q2 in 1..=policy.max_quantity_per_item {
                    let total = p1 * f64::from(q1) + p2 * f64::from(q2);
                    if !policy.accepts(total, target) {
                        continue;
                    }
                    out.push(BundleCandidate::unscored(
                        BundleOrigin::Pair,
                        vec![
                            LineItem::new((*first).clone(), q1),
                            LineItem::new((*second).clone(), q2),
                        ],
                        target,
                    ));
                }
            }
        }
    }
    Ok(out)
}

fn units_to_reach(target: f64, price: f64) -> u32 {
    let raw = (target / price - QUANTITY_EPSILON).ceil();
    if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (raw as u32).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldrep_catalog::ProductSubtype;
    use fieldrep_core::{Money, ProductId};

    fn product(name: &str, price: u64) -> Product {
        Product::new(
            ProductId::new(),
            name,
            "dairy",
            ProductSubtype::Standard,
            Money::from_minor(price),
        )
        .unwrap()
    }

    fn strict_policy() -> TargetPolicy {
        TargetPolicy {
            target_fraction: 1.0,
            tolerance_factor: 0.2,
            lower_bound_factor: 10.0,
            max_pair_candidates: 10,
            max_quantity_per_item: 3,
            ..TargetPolicy::value_for_value()
        }
    }

    #[test]
    fn single_rounds_quantity_up() {
        let yogurt = product("Yogurt", 300);
        let bundles = single_product_bundles([&yogurt], 1_000.0, &strict_policy());
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].items[0].quantity, 4);
        assert_eq!(bundles[0].total_value, Money::from_minor(1_200));
        assert_eq!(bundles[0].value_difference, 200.0);
    }

    #[test]
    fn single_uses_at_least_one_unit() {
        let cheese = product("Cheese wheel", 5_000);
        let policy = TargetPolicy {
            lower_bound_factor: 1.0,
            ..strict_policy()
        };
        let bundles = single_product_bundles([&cheese], 1_000.0, &policy);
        assert_eq!(bundles[0].items[0].quantity, 1);
    }

    #[test]
    fn single_rejects_outside_band() {
        // ceil(1000 / 700) = 2 -> 1400, 40% over, lower bound clause disabled
        let butter = product("Butter", 700);
        assert!(single_product_bundles([&butter], 1_000.0, &strict_policy()).is_empty());
    }

    #[test]
    fn single_skips_zero_price() {
        let sample = product("Sample", 0);
        assert!(single_product_bundles([&sample], 1_000.0, &strict_policy()).is_empty());
    }

    #[test]
    fn fractional_target_does_not_inflate_quantity() {
        let milk = product("Milk", 250);
        let target = 5_000.0 * 0.1;
        let bundles = single_product_bundles([&milk], target, &strict_policy());
        assert_eq!(bundles[0].items[0].quantity, 2);
    }

    #[test]
    fn zero_target_generates_nothing() {
        let milk = product("Milk", 250);
        assert!(single_product_bundles([&milk], 0.0, &strict_policy()).is_empty());
        assert!(
            pair_bundles([&milk, &milk], 0.0, &strict_policy(), &AbortHandle::new())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn pair_finds_exact_combination() {
        let a = product("Cream", 250);
        let b = product("Kefir", 250);
        let policy = TargetPolicy {
            tolerance_factor: 0.0,
            ..strict_policy()
        };
        let bundles = pair_bundles([&a, &b], 500.0, &policy, &AbortHandle::new()).unwrap();

        assert_eq!(bundles.len(), 1);
        let bundle = &bundles[0];
        assert_eq!(bundle.origin, BundleOrigin::Pair);
        assert_eq!(bundle.items[0].quantity, 1);
        assert_eq!(bundle.items[1].quantity, 1);
        assert_eq!(bundle.total_value, Money::from_minor(500));
        assert_eq!(bundle.value_difference, 0.0);
    }

    #[test]
    fn pair_respects_candidate_bound() {
        let products: Vec<Product> = (0..5).map(|i| product(&format!("P{i}"), 100)).collect();
        let policy = TargetPolicy {
            max_pair_candidates: 2,
            max_quantity_per_item: 1,
            tolerance_factor: 1.0,
            ..strict_policy()
        };
        let bundles = pair_bundles(products.iter(), 200.0, &policy, &AbortHandle::new()).unwrap();

        assert_eq!(bundles.len(), 1);
        let ids: Vec<ProductId> = bundles[0].product_ids().collect();
        assert_eq!(ids, vec![products[0].id_typed(), products[1].id_typed()]);
    }

    #[test]
    fn unpriced_products_do_not_count_toward_pair_bound() {
        let sample = product("Sample", 0);
        let a = product("Cream", 100);
        let b = product("Kefir", 100);
        let policy = TargetPolicy {
            max_pair_candidates: 2,
            max_quantity_per_item: 1,
            tolerance_factor: 1.0,
            ..strict_policy()
        };
        let bundles = pair_bundles([&sample, &a, &b], 200.0, &policy, &AbortHandle::new()).unwrap();

        assert_eq!(bundles.len(), 1);
        let ids: Vec<ProductId> = bundles[0].product_ids().collect();
        assert_eq!(ids, vec![a.id_typed(), b.id_typed()]);
    }

    #[test]
    fn pair_never_repeats_a_product() {
        let a = product("Cream", 250);
        let bundles = pair_bundles([&a, &a], 500.0, &strict_policy(), &AbortHandle::new()).unwrap();
        assert!(bundles.is_empty());
    }

    #[test]
    fn pair_generation_order_is_lexicographic() {
        let a = product("A", 100);
        let b = product("B", 100);
        let policy = TargetPolicy {
            tolerance_factor: 1.0,
            max_quantity_per_item: 2,
            ..strict_policy()
        };
        let bundles = pair_bundles([&a, &b], 300.0, &policy, &AbortHandle::new()).unwrap();
        let quantities: Vec<(u32, u32)> = bundles
            .iter()
            .map(|c| (c.items[0].quantity, c.items[1].quantity))
            .collect();
        assert_eq!(quantities, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
    }

    #[test]
    fn aborted_pair_search_stops() {
        let a = product("A", 100);
        let b = product("B", 100);
        let abort = AbortHandle::new();
        abort.abort();
        let err = pair_bundles([&a, &b], 200.0, &strict_policy(), &abort).unwrap_err();
        assert!(matches!(err, RecommendError::Aborted));
    }
}
