//! Writes a final clustering back into a matrix value

use itertools::Itertools;
use std::collections::HashMap;

use crate::cluster::Clustering;
use crate::matrix::{ClusterId, ClusteredMatrix, Item, ItemId};

/// Copy `matrix` with every item moved to its cluster and sort indices renumbered.
///
/// Items are walked in their current presentation order (sort index, then
/// id). Groups are laid out in the order they are first met on that walk,
/// items keep their relative order inside a group, and the resulting sort
/// indices are `0.0, 1.0, 2.0, ...`. Names, connections and weights are left
/// untouched; groups left without members are dropped.
///
/// # Panics
///
/// Panics if `clustering` has no entry for an item of `matrix`.
pub fn materialize<M: ClusteredMatrix + Clone>(matrix: &M, clustering: &Clustering) -> M {
    let walk: Vec<(ItemId, ClusterId)> = matrix
        .items()
        .iter()
        .sorted_by(|x, y| presentation_order(x, y))
        .map(|item| {
            let cluster = clustering
                .cluster_of(item.id)
                .unwrap_or_else(|| panic!("item {} missing from clustering", item.id));
            (item.id, cluster)
        })
        .collect();

    let rank: HashMap<ClusterId, usize> = walk
        .iter()
        .map(|&(_, cluster)| cluster)
        .unique()
        .enumerate()
        .map(|(rank, cluster)| (cluster, rank))
        .collect();

    let mut output = matrix.clone();
    // Stable sort keeps the walk order inside each group
    for (position, (item, cluster)) in walk
        .into_iter()
        .sorted_by_key(|(_, cluster)| rank[cluster])
        .enumerate()
    {
        output.set_group_and_sort_index(item, cluster, position as f64);
    }
    output.prune_empty_groups();

    output
}

fn presentation_order(x: &Item, y: &Item) -> std::cmp::Ordering {
    x.sort_index
        .total_cmp(&y.sort_index)
        .then(x.id.cmp(&y.id))
}
