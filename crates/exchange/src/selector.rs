//! Fair-mix selection: keep both strategies represented in the final list.

use crate::bundle::BundleCandidate;
use crate::policy::TargetPolicy;

/// Sort by score descending. The sort is stable, so equal scores keep their
/// generation (pool) order.
pub fn rank(candidates: &mut [BundleCandidate]) {
    candidates.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
}

/// Merge ranked single-product and pair candidates.
///
/// Takes the top `single_bucket_size` singles and top `multi_bucket_size`
/// pairs, backfills from the remaining singles (never pairs) while below
/// `max_results`, then re-ranks and truncates to `max_results`. Singles,
/// backfill included, enter the re-rank ahead of pairs, so a single wins a
/// score tie against a pair.
pub fn fair_mix(
    mut singles: Vec<BundleCandidate>,
    mut pairs: Vec<BundleCandidate>,
    policy: &TargetPolicy,
) -> Vec<BundleCandidate> {
    rank(&mut singles);
    rank(&mut pairs);

    let single_take = policy.single_bucket_size.min(singles.len());
    let mut remaining_singles = singles.split_off(single_take);
    pairs.truncate(policy.multi_bucket_size);

    let mut selected = singles;
    let bucketed = selected.len() + pairs.len();
    if bucketed < policy.max_results {
        remaining_singles.truncate(policy.max_results - bucketed);
        selected.append(&mut remaining_singles);
    }
    selected.append(&mut pairs);

    rank(&mut selected);
    selected.truncate(policy.max_results);
    selected
}
