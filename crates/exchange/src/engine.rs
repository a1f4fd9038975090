//! Replacement bundle engine: target → pool → generation → scoring → fair mix.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fieldrep_catalog::Product;
use fieldrep_core::{Money, ProductId};

use crate::abort::AbortHandle;
use crate::bundle::BundleCandidate;
use crate::error::RecommendError;
use crate::generator::{pair_bundles, single_product_bundles};
use crate::line_item::{AvailabilitySet, LineItem, RemovalSet};
use crate::policy::TargetPolicy;
use crate::pool::{CandidatePool, PoolSource};
use crate::scorer::score_bundle;
use crate::selector::fair_mix;

/// Inputs of one recommendation run. The catalog is an injected snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest<'a> {
    pub removed: &'a RemovalSet,
    pub available: &'a AvailabilitySet,
    pub catalog: &'a [Product],
}

/// Why a run produced the suggestions it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Suggested,
    /// No removed line with a positive quantity; nothing to calculate.
    EmptyRemovalSet,
    /// The removed products are worth nothing, so the target is zero.
    ZeroRemovedValue,
    /// No product passed the category filter.
    NoCandidates,
    /// Eligible products exist but no bundle fell within the acceptance band.
    NoAcceptableBundle,
}

/// Product quantities a run was computed from. Lets a caller that ran the
/// engine in the background check the result still belongs to its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationBasis {
    pub removed: Vec<(ProductId, u32)>,
    pub available: Vec<(ProductId, u32)>,
}

impl CalculationBasis {
    pub fn of(removed: &RemovalSet, available: &AvailabilitySet) -> Self {
        let lines = |items: &[LineItem]| {
            items
                .iter()
                .map(|i| (i.product_id(), i.quantity))
                .collect::<Vec<_>>()
        };
        Self {
            removed: lines(removed.items()),
            available: lines(available.items()),
        }
    }
}

/// Ranked suggestions plus the figures that explain them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub removed_value: Money,
    /// Replacement target in minor units.
    pub target: f64,
    pub suggestions: Vec<BundleCandidate>,
    pub outcome: RecommendationOutcome,
    pub pool_source: Option<PoolSource>,
    pub pool_size: usize,
    /// Eligible products left out of generation because their price is zero.
    pub unpriced: Vec<ProductId>,
    pub basis: CalculationBasis,
}

impl Recommendation {
    fn empty(removed_value: Money, target: f64, outcome: RecommendationOutcome) -> Self {
        Self {
            removed_value,
            target,
            suggestions: Vec::new(),
            outcome,
            pool_source: None,
            pool_size: 0,
            unpriced: Vec::new(),
            basis: CalculationBasis::default(),
        }
    }

    pub fn find(&self, bundle_id: &str) -> Option<&BundleCandidate> {
        self.suggestions.iter().find(|c| c.id == bundle_id)
    }
}

/// Stateless engine bound to a validated policy. Pure over its inputs: the
/// same request and policy always produce the same ordered result.
#[derive(Debug, Clone)]
pub struct BundleEngine {
    policy: TargetPolicy,
}

impl BundleEngine {
    pub fn new(policy: TargetPolicy) -> Result<Self, RecommendError> {
        policy.validate().map_err(RecommendError::InvalidPolicy)?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &TargetPolicy {
        &self.policy
    }

    /// Replacement target for a removal set.
    pub fn target_for(&self, removed: &RemovalSet) -> f64 {
        self.policy.target(removed.removed_value())
    }

    pub fn recommend(
        &self,
        request: RecommendationRequest<'_>,
    ) -> Result<Recommendation, RecommendError> {
        self.recommend_with_abort(request, &AbortHandle::new())
    }

    pub fn recommend_with_abort(
        &self,
        request: RecommendationRequest<'_>,
        abort: &AbortHandle,
    ) -> Result<Recommendation, RecommendError> {
        let mut recommendation = self.compute(request, abort)?;
        recommendation.basis = CalculationBasis::of(request.removed, request.available);
        Ok(recommendation)
    }

    fn compute(
        &self,
        request: RecommendationRequest<'_>,
        abort: &AbortHandle,
    ) -> Result<Recommendation, RecommendError> {
        let removed_value = request.removed.removed_value();

        if !request.removed.is_actionable() {
            debug!("removal set is empty; skipping calculation");
            return Ok(Recommendation::empty(
                removed_value,
                0.0,
                RecommendationOutcome::EmptyRemovalSet,
            ));
        }

        let target = self.policy.target(removed_value);
        if target <= 0.0 {
            debug!(%removed_value, "removed value is zero; skipping calculation");
            return Ok(Recommendation::empty(
                removed_value,
                target,
                RecommendationOutcome::ZeroRemovedValue,
            ));
        }

        let Some(pool) =
            CandidatePool::build(request.removed, request.available, request.catalog)
        else {
            return Ok(Recommendation::empty(
                removed_value,
                target,
                RecommendationOutcome::EmptyRemovalSet,
            ));
        };

        let mut recommendation = Recommendation {
            pool_source: Some(pool.source),
            pool_size: pool.len(),
            unpriced: pool.unpriced(),
            ..Recommendation::empty(removed_value, target, RecommendationOutcome::NoCandidates)
        };
        if pool.is_empty() {
            info!(
                category = %pool.profile.category,
                "no eligible products in the removed product's category"
            );
            return Ok(recommendation);
        }

        let mut singles = single_product_bundles(pool.priced(), target, &self.policy);
        let mut pairs = pair_bundles(pool.priced(), target, &self.policy, abort)?;

        let weights = &self.policy.scoring_weights;
        for candidate in singles.iter_mut().chain(pairs.iter_mut()) {
            score_bundle(candidate, &pool.profile, target, weights);
        }

        let single_count = singles.len();
        let pair_count = pairs.len();
        let suggestions = fair_mix(singles, pairs, &self.policy);

        info!(
            %removed_value,
            target,
            pool_size = pool.len(),
            unpriced = recommendation.unpriced.len(),
            single_count,
            pair_count,
            result_count = suggestions.len(),
            "bundle recommendation computed"
        );

        recommendation.outcome = if suggestions.is_empty() {
            RecommendationOutcome::NoAcceptableBundle
        } else {
            RecommendationOutcome::Suggested
        };
        recommendation.suggestions = suggestions;
        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleOrigin;
    use crate::line_item::LineItem;
    use crate::policy::ScoringWeights;
    use fieldrep_catalog::ProductSubtype;

    fn product(name: &str, category: &str, price: u64) -> Product {
        Product::new(
            ProductId::new(),
            name,
            category,
            ProductSubtype::Standard,
            Money::from_minor(price),
        )
        .unwrap()
    }

    fn removal(product: &Product, qty: u32) -> RemovalSet {
        RemovalSet::from_items(vec![LineItem::new(product.clone(), qty)])
    }

    fn run(
        policy: TargetPolicy,
        removed: &RemovalSet,
        available: &AvailabilitySet,
        catalog: &[Product],
    ) -> Recommendation {
        BundleEngine::new(policy)
            .unwrap()
            .recommend(RecommendationRequest {
                removed,
                available,
                catalog,
            })
            .unwrap()
    }

    #[test]
    fn new_rejects_invalid_policy() {
        let policy = TargetPolicy {
            target_fraction: 2.0,
            ..TargetPolicy::default()
        };
        assert!(matches!(
            BundleEngine::new(policy),
            Err(RecommendError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn result_records_the_quantities_it_was_computed_from() {
        let removed_product = product("Lasagne", "frozen", 2_500);
        let on_hand = product("Pizza Family", "frozen", 10_000);
        let removed = removal(&removed_product, 4);
        let available = AvailabilitySet::from_items(vec![LineItem::new(on_hand.clone(), 2)]);

        let rec = run(TargetPolicy::value_for_value(), &removed, &available, &[]);

        assert_eq!(rec.basis.removed, vec![(removed_product.id_typed(), 4)]);
        assert_eq!(rec.basis.available, vec![(on_hand.id_typed(), 2)]);
        assert_eq!(rec.basis, CalculationBasis::of(&removed, &available));
        assert_ne!(rec.basis, CalculationBasis::of(&removal(&removed_product, 3), &available));
    }

    #[test]
    fn exact_price_match_ranks_first() {
        // removed value 100.00, value-for-value, ±20%
        let removed_product = product("Lasagne", "frozen", 2_500);
        let exact = product("Pizza Family", "frozen", 10_000);
        let close = product("Fish Sticks", "frozen", 6_000);
        let catalog = vec![close.clone(), exact.clone()];

        let policy = TargetPolicy {
            target_fraction: 1.0,
            tolerance_factor: 0.2,
            ..TargetPolicy::value_for_value()
        };
        let rec = run(
            policy,
            &removal(&removed_product, 4),
            &AvailabilitySet::new(),
            &catalog,
        );

        assert_eq!(rec.outcome, RecommendationOutcome::Suggested);
        assert_eq!(rec.target, 10_000.0);
        let first = &rec.suggestions[0];
        assert_eq!(first.origin, BundleOrigin::Single);
        assert_eq!(first.items[0].product_id(), exact.id_typed());
        assert_eq!(first.items[0].quantity, 1);
        assert_eq!(first.value_difference, 0.0);
    }

    #[test]
    fn top_up_pair_hits_target_exactly() {
        // removed value 50.00 at 10% -> target 5.00
        let removed_product = product("Shampoo", "hair care", 5_000);
        let a = product("Conditioner mini", "hair care", 250);
        let b = product("Hair gel mini", "hair care", 250);

        let rec = run(
            TargetPolicy::top_up(),
            &removal(&removed_product, 1),
            &AvailabilitySet::new(),
            &[a.clone(), b.clone()],
        );

        assert_eq!(rec.target, 500.0);
        let pair = rec
            .suggestions
            .iter()
            .find(|c| c.origin == BundleOrigin::Pair)
            .expect("pair suggestion");
        assert_eq!(pair.items[0].quantity, 1);
        assert_eq!(pair.items[1].quantity, 1);
        assert_eq!(pair.total_value, Money::from_minor(500));
        assert_eq!(pair.value_difference, 0.0);
    }

    #[test]
    fn no_products_in_category_returns_empty_list() {
        let removed_product = product("Dog food", "pet", 1_000);
        let catalog = vec![product("Bread", "bakery", 300), product("Milk", "dairy", 120)];

        let rec = run(
            TargetPolicy::value_for_value(),
            &removal(&removed_product, 1),
            &AvailabilitySet::new(),
            &catalog,
        );

        assert!(rec.suggestions.is_empty());
        assert_eq!(rec.outcome, RecommendationOutcome::NoCandidates);
        assert_eq!(rec.pool_size, 0);
    }

    #[test]
    fn empty_removal_set_is_a_no_op() {
        let rec = run(
            TargetPolicy::value_for_value(),
            &RemovalSet::new(),
            &AvailabilitySet::new(),
            &[product("Bread", "bakery", 300)],
        );
        assert_eq!(rec.outcome, RecommendationOutcome::EmptyRemovalSet);
        assert!(rec.suggestions.is_empty());
    }

    #[test]
    fn zero_value_removal_short_circuits() {
        let free = product("Sample", "bakery", 0);
        let rec = run(
            TargetPolicy::value_for_value(),
            &removal(&free, 3),
            &AvailabilitySet::new(),
            &[product("Bread", "bakery", 300)],
        );
        assert_eq!(rec.outcome, RecommendationOutcome::ZeroRemovedValue);
        assert_eq!(rec.target, 0.0);
        assert!(rec.suggestions.is_empty());
    }

    #[test]
    fn zero_price_products_are_reported_not_suggested() {
        let removed_product = product("Bread", "bakery", 300);
        let free = product("Sample roll", "bakery", 0);
        let rolls = product("Rolls", "bakery", 300);

        let rec = run(
            TargetPolicy::value_for_value(),
            &removal(&removed_product, 1),
            &AvailabilitySet::new(),
            &[free.clone(), rolls],
        );

        assert_eq!(rec.unpriced, vec![free.id_typed()]);
        assert!(
            rec.suggestions
                .iter()
                .all(|c| c.product_ids().all(|id| id != free.id_typed()))
        );
        assert_eq!(rec.outcome, RecommendationOutcome::Suggested);
    }

    #[test]
    fn nothing_within_band_is_reported() {
        let removed_product = product("Bread", "bakery", 1_000);
        let policy = TargetPolicy {
            tolerance_factor: 0.0,
            lower_bound_factor: 100.0,
            ..TargetPolicy::value_for_value()
        };
        let rec = run(
            policy,
            &removal(&removed_product, 1),
            &AvailabilitySet::new(),
            &[product("Cake", "bakery", 3_000)],
        );
        assert_eq!(rec.outcome, RecommendationOutcome::NoAcceptableBundle);
        assert_eq!(rec.pool_size, 1);
    }

    #[test]
    fn availability_limits_suggestions() {
        let removed_product = product("Bread", "bakery", 300);
        let rolls = product("Rolls", "bakery", 300);
        let bagels = product("Bagels", "bakery", 300);
        let available = AvailabilitySet::from_items(vec![LineItem::new(bagels.clone(), 1)]);

        let rec = run(
            TargetPolicy::value_for_value(),
            &removal(&removed_product, 1),
            &available,
            &[rolls, bagels.clone()],
        );

        assert_eq!(rec.pool_source, Some(PoolSource::Availability));
        assert!(
            rec.suggestions
                .iter()
                .all(|c| c.product_ids().all(|id| id == bagels.id_typed()))
        );
    }

    #[test]
    fn aborted_run_returns_error() {
        let removed_product = product("Bread", "bakery", 300);
        let engine = BundleEngine::new(TargetPolicy::value_for_value()).unwrap();
        let abort = AbortHandle::new();
        abort.abort();
        let removed = removal(&removed_product, 1);
        let available = AvailabilitySet::new();
        let catalog = [product("Rolls", "bakery", 300), product("Bagels", "bakery", 200)];

        let err = engine
            .recommend_with_abort(
                RecommendationRequest {
                    removed: &removed,
                    available: &available,
                    catalog: &catalog,
                },
                &abort,
            )
            .unwrap_err();
        assert_eq!(err, RecommendError::Aborted);
    }

    #[test]
    fn same_subtype_outranks_display_units_of_equal_value() {
        let removed_product = product("Bread", "bakery", 500);
        let display = Product::new(
            ProductId::new(),
            "Bread display",
            "bakery",
            ProductSubtype::Display,
            Money::from_minor(500),
        )
        .unwrap();
        let standard = product("Rye bread", "bakery", 500);
        let policy = TargetPolicy {
            scoring_weights: ScoringWeights::value_for_value(),
            ..TargetPolicy::value_for_value()
        };

        let rec = run(
            policy,
            &removal(&removed_product, 1),
            &AvailabilitySet::new(),
            &[display.clone(), standard.clone()],
        );

        assert_eq!(rec.suggestions[0].items[0].product_id(), standard.id_typed());
        assert!(rec.suggestions[0].affinity_match);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn catalog_strategy() -> impl Strategy<Value = Vec<(u64, bool, bool)>> {
            // (price, same category, display subtype)
            prop::collection::vec((0u64..5_000, any::<bool>(), any::<bool>()), 0..16)
        }

        fn build_catalog(rows: &[(u64, bool, bool)]) -> Vec<Product> {
            rows.iter()
                .enumerate()
                .map(|(i, (price, same, display))| {
                    let subtype = if *display {
                        ProductSubtype::Display
                    } else {
                        ProductSubtype::Standard
                    };
                    Product::new(
                        ProductId::new(),
                        format!("Product {i}"),
                        if *same { "snacks" } else { "drinks" },
                        subtype,
                        Money::from_minor(*price),
                    )
                    .unwrap()
                })
                .collect()
        }

        fn policy_for(top_up: bool) -> TargetPolicy {
            if top_up {
                TargetPolicy::top_up()
            } else {
                TargetPolicy::value_for_value()
            }
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 200,
                ..ProptestConfig::default()
            })]

            /// Property: target is exactly removed value times the fraction.
            #[test]
            fn target_is_removed_value_times_fraction(
                price in 1u64..100_000,
                qty in 1u32..50,
                top_up in any::<bool>(),
            ) {
                let policy = policy_for(top_up);
                let removed = removal(&product("Chips", "snacks", price), qty);
                let rec = run(policy.clone(), &removed, &AvailabilitySet::new(), &[]);
                let expected = (price * u64::from(qty)) as f64 * policy.target_fraction;
                prop_assert_eq!(rec.target, expected);
            }

            /// Property: every suggestion is inside the acceptance band, uses
            /// distinct positive-quantity lines, and the list is bounded and
            /// sorted by score.
            #[test]
            fn suggestions_respect_band_and_ordering(
                rows in catalog_strategy(),
                removed_price in 1u64..5_000,
                qty in 1u32..6,
                top_up in any::<bool>(),
            ) {
                let policy = policy_for(top_up);
                let catalog = build_catalog(&rows);
                let removed = removal(&product("Chips", "snacks", removed_price), qty);
                let rec = run(policy.clone(), &removed, &AvailabilitySet::new(), &catalog);

                prop_assert!(rec.suggestions.len() <= policy.max_results);
                for window in rec.suggestions.windows(2) {
                    prop_assert!(window[0].match_score >= window[1].match_score);
                }
                for candidate in &rec.suggestions {
                    prop_assert!(policy.accepts(candidate.total_value.as_f64(), rec.target));
                    prop_assert!(candidate.items.iter().all(|i| i.quantity > 0));
                    if candidate.items.len() == 2 {
                        prop_assert_ne!(candidate.items[0].product_id(), candidate.items[1].product_id());
                    }
                    prop_assert!((0.0..=100.0).contains(&candidate.match_score));
                }
            }

            /// Property: same inputs and policy give the same ordered list.
            #[test]
            fn recommendation_is_deterministic(
                rows in catalog_strategy(),
                removed_price in 1u64..5_000,
                qty in 1u32..6,
                top_up in any::<bool>(),
            ) {
                let policy = policy_for(top_up);
                let catalog = build_catalog(&rows);
                let removed = removal(&product("Chips", "snacks", removed_price), qty);
                let first = run(policy.clone(), &removed, &AvailabilitySet::new(), &catalog);
                let second = run(policy, &removed, &AvailabilitySet::new(), &catalog);
                prop_assert_eq!(first, second);
            }
        }
    }
}
