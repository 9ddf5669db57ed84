//! Clustering engine: bids, coordination cost, optimizer and result materialization

pub mod bid;
pub mod cost;
pub mod materialize;
pub mod optimizer;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::matrix::{ClusterId, ItemId, MatrixView, WeightedAdjacency};

/// Mapping from item id to cluster id. Every item has exactly one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clustering {
    assignment: BTreeMap<ItemId, ClusterId>,
}

impl Clustering {
    /// The grouping currently recorded on a matrix
    pub fn from_view<V: MatrixView + ?Sized>(view: &V) -> Self {
        view.items().iter().map(|item| (item.id, item.group)).collect()
    }

    /// Cluster of an item
    pub fn cluster_of(&self, item: ItemId) -> Option<ClusterId> {
        self.assignment.get(&item).copied()
    }

    /// Whether two items share a cluster
    pub fn same_cluster(&self, a: ItemId, b: ItemId) -> bool {
        match (self.cluster_of(a), self.cluster_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    /// True when no items are assigned
    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Members of each cluster, clusters and members ascending
    pub fn clusters(&self) -> BTreeMap<ClusterId, Vec<ItemId>> {
        let mut clusters: BTreeMap<ClusterId, Vec<ItemId>> = BTreeMap::new();
        for (&item, &cluster) in &self.assignment {
            clusters.entry(cluster).or_default().push(item);
        }
        clusters
    }

    /// Number of distinct clusters
    pub fn cluster_count(&self) -> usize {
        self.assignment.values().collect::<BTreeSet<_>>().len()
    }

    /// (item, cluster) pairs in ascending item order
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, ClusterId)> + '_ {
        self.assignment.iter().map(|(&item, &cluster)| (item, cluster))
    }
}

impl FromIterator<(ItemId, ClusterId)> for Clustering {
    fn from_iter<I: IntoIterator<Item = (ItemId, ClusterId)>>(iter: I) -> Self {
        Self {
            assignment: iter.into_iter().collect(),
        }
    }
}

/// Mutable working clustering over the dense indices of a snapshot.
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    /// Cluster of each dense item index
    of: Vec<ClusterId>,

    /// Members of each cluster; may briefly hold empty clusters until pruned
    members: BTreeMap<ClusterId, BTreeSet<usize>>,

    /// Id handed to the next newly created cluster
    next_id: ClusterId,

    /// New ids never go below this (one past the matrix's largest group id)
    floor: ClusterId,
}

impl Assignment {
    /// Start from the groups recorded on the matrix
    pub(crate) fn from_view<V: MatrixView + ?Sized>(view: &V, adj: &WeightedAdjacency) -> Self {
        let mut of = vec![0; adj.item_count()];
        for item in view.items() {
            if let Some(idx) = adj.index_of(item.id) {
                of[idx] = item.group;
            }
        }
        Self::from_dense(of, first_free_id(view))
    }

    /// Start with one cluster per item, numbered after every group id of the matrix
    pub(crate) fn singletons<V: MatrixView + ?Sized>(view: &V, adj: &WeightedAdjacency) -> Self {
        let first = first_free_id(view);
        let of = (0..adj.item_count())
            .map(|idx| first + idx as ClusterId)
            .collect();
        Self::from_dense(of, first)
    }

    /// Start from an explicit clustering that must cover every item
    pub(crate) fn from_clustering(
        adj: &WeightedAdjacency,
        clustering: &Clustering,
    ) -> Result<Self> {
        let of = adj
            .item_ids()
            .iter()
            .map(|&id| clustering.cluster_of(id).ok_or(Error::Unassigned(id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_dense(of, 0))
    }

    fn from_dense(of: Vec<ClusterId>, floor: ClusterId) -> Self {
        let mut members: BTreeMap<ClusterId, BTreeSet<usize>> = BTreeMap::new();
        for (idx, &cluster) in of.iter().enumerate() {
            members.entry(cluster).or_default().insert(idx);
        }
        let mut assignment = Self {
            of,
            members,
            next_id: floor,
            floor,
        };
        assignment.renumber_next_id();
        assignment
    }

    fn renumber_next_id(&mut self) {
        self.next_id = self
            .members
            .keys()
            .next_back()
            .map_or(self.floor, |&max| (max + 1).max(self.floor));
    }

    /// Cluster of a dense item index
    pub(crate) fn cluster_of(&self, item: usize) -> ClusterId {
        self.of[item]
    }

    /// Number of members of a cluster (0 if it does not exist)
    pub(crate) fn size(&self, cluster: ClusterId) -> usize {
        self.members.get(&cluster).map_or(0, |m| m.len())
    }

    /// Non-empty clusters with their members, ascending by id
    pub(crate) fn clusters(&self) -> impl Iterator<Item = (ClusterId, &BTreeSet<usize>)> + '_ {
        self.members
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(&id, members)| (id, members))
    }

    /// Ids of non-empty clusters, ascending
    pub(crate) fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clusters().map(|(id, _)| id).collect()
    }

    /// Id the next new cluster would receive
    pub(crate) fn peek_new_id(&self) -> ClusterId {
        self.next_id
    }

    /// Move an item into `to`, creating the cluster if needed; returns the previous cluster
    pub(crate) fn move_item(&mut self, item: usize, to: ClusterId) -> ClusterId {
        let from = self.of[item];
        if from == to {
            return from;
        }
        if let Some(members) = self.members.get_mut(&from) {
            members.remove(&item);
        }
        self.members.entry(to).or_default().insert(item);
        self.of[item] = to;
        if to >= self.next_id {
            self.next_id = to + 1;
        }
        from
    }

    /// Undo a `move_item`, releasing the target id if it was freshly created
    pub(crate) fn revert_move(&mut self, item: usize, from: ClusterId) {
        let abandoned = self.move_item(item, from);
        if self.size(abandoned) == 0 && abandoned + 1 == self.next_id {
            self.members.remove(&abandoned);
            self.next_id = abandoned;
        }
    }

    /// Drop clusters with no members and renumber the next new id; returns how many were removed
    pub(crate) fn prune_empty(&mut self) -> usize {
        let before = self.members.len();
        self.members.retain(|_, members| !members.is_empty());
        self.renumber_next_id();
        before - self.members.len()
    }

    /// Snapshot as a public clustering keyed by item id
    pub(crate) fn to_clustering(&self, adj: &WeightedAdjacency) -> Clustering {
        self.of
            .iter()
            .enumerate()
            .map(|(idx, &cluster)| (adj.item_id(idx), cluster))
            .collect()
    }
}

fn first_free_id<V: MatrixView + ?Sized>(view: &V) -> ClusterId {
    view.max_group_id().map_or(0, |max| max + 1)
}
