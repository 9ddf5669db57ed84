//! Bid calculator: how strongly an item wants to join a cluster

use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::cluster::Assignment;
use crate::config::BidParams;
use crate::error::Result;
use crate::matrix::compressed::connection_strength;
use crate::matrix::{ClusterId, ItemId, MatrixView, WeightedAdjacency};

/// Candidate counts below this are bid on sequentially
pub(crate) const PARALLEL_BID_THRESHOLD: usize = 256;

/// Bid of a dense item index for `target`.
///
/// The affinity is the sum of `strength^powdep` over the item's connections to
/// other members of `target`. It is divided by `(size / optimal)^powbid`, where
/// `size` counts the cluster's members with the item added. A cluster the
/// item has no connections into bids exactly 0, which is also the bid of the
/// new-singleton option.
pub(crate) fn bid(
    adj: &WeightedAdjacency,
    assignment: &Assignment,
    item: usize,
    target: ClusterId,
    params: &BidParams,
) -> f64 {
    let mut affinity = 0.0;
    for (j, weight) in adj.neighbors(item) {
        if j != item && assignment.cluster_of(j) == target {
            affinity += connection_strength(weight, params.count_by_weight).powf(params.powdep);
        }
    }
    if affinity == 0.0 {
        return 0.0;
    }

    let joining = usize::from(assignment.cluster_of(item) != target);
    let size = assignment.size(target) + joining;
    let penalty = (size as f64 / params.optimal_cluster_size).powf(params.powbid);
    affinity / penalty
}

/// Bids of one item for each candidate cluster, in candidate order.
pub(crate) fn bids_for_item(
    adj: &WeightedAdjacency,
    assignment: &Assignment,
    item: usize,
    candidates: &[ClusterId],
    params: &BidParams,
) -> Vec<f64> {
    if candidates.len() < PARALLEL_BID_THRESHOLD {
        return candidates
            .iter()
            .map(|&cluster| bid(adj, assignment, item, cluster, params))
            .collect();
    }

    // Ordered collect keeps the result independent of scheduling
    candidates
        .par_iter()
        .map(|&cluster| bid(adj, assignment, item, cluster, params))
        .collect()
}

/// Bid of every item of `matrix` for one fixed cluster, using the matrix's
/// current grouping.
///
/// Items already in `cluster` bid with the cluster's current size; an empty or
/// unknown cluster receives 0 from every item.
pub fn calculate_cluster_bids<V: MatrixView + ?Sized>(
    matrix: &V,
    cluster: ClusterId,
    params: &BidParams,
) -> Result<BTreeMap<ItemId, f64>> {
    params.validate()?;

    let adj = WeightedAdjacency::from_view(matrix);
    let assignment = Assignment::from_view(matrix, &adj);
    let n = adj.item_count();

    let bids: Vec<f64> = if n < PARALLEL_BID_THRESHOLD {
        (0..n)
            .map(|item| bid(&adj, &assignment, item, cluster, params))
            .collect()
    } else {
        (0..n)
            .into_par_iter()
            .map(|item| bid(&adj, &assignment, item, cluster, params))
            .collect()
    };

    Ok(adj.item_ids().iter().copied().zip(bids).collect())
}
