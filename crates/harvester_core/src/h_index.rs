use std::collections::BTreeMap;

use serde::Serialize;

/// Largest `i` such that the `i`-th highest value (1-based) is at least `i`.
pub fn h_index(stars: &[u64]) -> usize {
    let mut sorted = stars.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .enumerate()
        .take_while(|&(i, &value)| value >= i as u64 + 1)
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRank {
    pub h_index: usize,
    pub user: String,
}

/// Ranks owners by the h-index of their repositories' star counts.
///
/// Input is `(owner/name, stars)` pairs; names without an owner are ignored
/// and a repeated name keeps its last star count. Output is sorted by
/// descending h-index, then by owner name.
pub fn rank_owners<'a>(repos: impl IntoIterator<Item = (&'a str, u64)>) -> Vec<OwnerRank> {
    let mut by_owner: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();
    for (full_name, stars) in repos {
        if let Some((owner, name)) = full_name.split_once('/') {
            by_owner.entry(owner).or_default().insert(name, stars);
        }
    }

    let mut ranks: Vec<OwnerRank> = by_owner
        .into_iter()
        .map(|(owner, repos)| {
            let stars: Vec<u64> = repos.into_values().collect();
            OwnerRank {
                h_index: h_index(&stars),
                user: owner.to_string(),
            }
        })
        .collect();
    ranks.sort_by(|a, b| b.h_index.cmp(&a.h_index).then_with(|| a.user.cmp(&b.user)));
    ranks
}
