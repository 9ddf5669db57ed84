//! Coordination cost of a clustering

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cluster::{Assignment, Clustering};
use crate::config::CostParams;
use crate::error::Result;
use crate::matrix::compressed::connection_strength;
use crate::matrix::{ClusterId, MatrixView, WeightedAdjacency};

/// Coordination cost breakdown. Lower is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinationReport {
    /// Intra-cluster cost of every non-empty cluster
    pub per_cluster_intra_cost: BTreeMap<ClusterId, f64>,

    /// Sum of `per_cluster_intra_cost`, accumulated in ascending cluster order
    pub total_intra_cost: f64,

    /// Cost of connections crossing cluster boundaries
    pub total_extra_cost: f64,

    /// `total_intra_cost + total_extra_cost`
    pub total_cost: f64,
}

impl CoordinationReport {
    /// Intra-cluster cost of one cluster (0 for unknown clusters)
    pub fn intra_cost(&self, cluster: ClusterId) -> f64 {
        self.per_cluster_intra_cost
            .get(&cluster)
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of clusters covered by the report
    pub fn cluster_count(&self) -> usize {
        self.per_cluster_intra_cost.len()
    }
}

/// Score a working assignment.
///
/// Intra cost of cluster C is `|C|^powcc` times the summed strength of
/// connections inside C. Every connection crossing two clusters costs its
/// strength times the number of items in the matrix. Connections are visited
/// in the snapshot's canonical order so repeated calls give identical sums.
pub(crate) fn score(
    adj: &WeightedAdjacency,
    assignment: &Assignment,
    params: &CostParams,
) -> CoordinationReport {
    let item_count = adj.item_count() as f64;

    let mut internal: BTreeMap<ClusterId, f64> =
        assignment.clusters().map(|(id, _)| (id, 0.0)).collect();
    let mut total_extra_cost = 0.0;

    for &(a, b, weight) in adj.edges() {
        let strength = connection_strength(weight, params.count_by_weight);
        let cluster_a = assignment.cluster_of(a as usize);
        if cluster_a == assignment.cluster_of(b as usize) {
            *internal.entry(cluster_a).or_insert(0.0) += strength;
        } else {
            total_extra_cost += strength * item_count;
        }
    }

    let mut per_cluster_intra_cost = BTreeMap::new();
    let mut total_intra_cost = 0.0;
    for (cluster, strength) in internal {
        let size = assignment.size(cluster) as f64;
        let cost = size.powf(params.powcc) * strength;
        total_intra_cost += cost;
        per_cluster_intra_cost.insert(cluster, cost);
    }

    CoordinationReport {
        per_cluster_intra_cost,
        total_intra_cost,
        total_extra_cost,
        total_cost: total_intra_cost + total_extra_cost,
    }
}

/// Coordination cost of the grouping currently recorded on `matrix`.
pub fn get_coordination_score<V: MatrixView + ?Sized>(
    matrix: &V,
    params: &CostParams,
) -> Result<CoordinationReport> {
    params.validate()?;

    let adj = WeightedAdjacency::from_view(matrix);
    let assignment = Assignment::from_view(matrix, &adj);
    Ok(score(&adj, &assignment, params))
}

/// Coordination cost of an explicit clustering of `matrix`'s items.
pub fn score_clustering<V: MatrixView + ?Sized>(
    matrix: &V,
    clustering: &Clustering,
    params: &CostParams,
) -> Result<CoordinationReport> {
    params.validate()?;

    let adj = WeightedAdjacency::from_view(matrix);
    let assignment = Assignment::from_clustering(&adj, clustering)?;
    Ok(score(&adj, &assignment, params))
}
