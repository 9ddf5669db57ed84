//! Compressed adjacency snapshot of a matrix view

use crate::matrix::{ItemId, MatrixView};

/// Immutable compressed sparse representation of an undirected weighted matrix.
///
/// Items are re-indexed densely in ascending id order so that every traversal
/// over the snapshot visits items, neighbours and edges in a fixed order.
#[derive(Debug, Clone)]
pub struct WeightedAdjacency {
    /// Item ids by dense index (ascending)
    item_ids: Vec<ItemId>,

    /// Offset array: offsets[i]..offsets[i+1] is the neighbour range of item i
    offsets: Vec<u32>,

    /// Concatenated sorted neighbour lists (dense indices)
    neighbors: Vec<u32>,

    /// Weight of each entry in `neighbors`
    weights: Vec<f64>,

    /// Each undirected connection once as (lower, higher, weight), sorted
    edges: Vec<(u32, u32, f64)>,
}

impl WeightedAdjacency {
    /// Snapshot a matrix view.
    ///
    /// # Panics
    ///
    /// Panics if a connection references an item id the view does not list.
    pub fn from_view<V: MatrixView + ?Sized>(view: &V) -> Self {
        let mut item_ids: Vec<ItemId> = view.items().iter().map(|item| item.id).collect();
        item_ids.sort_unstable();
        debug_assert!(
            item_ids.windows(2).all(|w| w[0] != w[1]),
            "matrix view lists an item id twice"
        );

        let index_of = |id: ItemId| -> u32 {
            match item_ids.binary_search(&id) {
                Ok(idx) => idx as u32,
                Err(_) => panic!("connection references unknown item id {}", id),
            }
        };

        let mut edges: Vec<(u32, u32, f64)> = view
            .connections()
            .iter()
            .filter(|conn| conn.a != conn.b)
            .map(|conn| {
                let (a, b) = (index_of(conn.a), index_of(conn.b));
                (a.min(b), a.max(b), conn.weight)
            })
            .collect();
        edges.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        debug_assert!(
            edges.windows(2).all(|w| (w[0].0, w[0].1) != (w[1].0, w[1].1)),
            "matrix view lists a connection twice"
        );

        // Build adjacency lists in both directions
        let n = item_ids.len();
        let mut adjacency: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n];
        for &(a, b, w) in &edges {
            adjacency[a as usize].push((b, w));
            adjacency[b as usize].push((a, w));
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut neighbors = Vec::with_capacity(edges.len() * 2);
        let mut weights = Vec::with_capacity(edges.len() * 2);
        offsets.push(0);
        for list in &mut adjacency {
            // Sorted for binary search and stable summation order
            list.sort_by_key(|&(j, _)| j);
            for &(j, w) in list.iter() {
                neighbors.push(j);
                weights.push(w);
            }
            offsets.push(neighbors.len() as u32);
        }

        Self {
            item_ids,
            offsets,
            neighbors,
            weights,
            edges,
        }
    }

    /// Number of items
    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Item id at a dense index
    pub fn item_id(&self, index: usize) -> ItemId {
        self.item_ids[index]
    }

    /// Item ids in dense order
    pub fn item_ids(&self) -> &[ItemId] {
        &self.item_ids
    }

    /// Dense index of an item id
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.item_ids.binary_search(&id).ok()
    }

    /// Neighbours of an item with connection weights, in ascending index order
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.offsets[index] as usize;
        let end = self.offsets[index + 1] as usize;
        self.neighbors[start..end]
            .iter()
            .zip(&self.weights[start..end])
            .map(|(&j, &w)| (j as usize, w))
    }

    /// Undirected connections as (lower, higher, weight) in ascending order
    pub fn edges(&self) -> &[(u32, u32, f64)] {
        &self.edges
    }
}

/// Strength of a connection: its weight, or 1.0 when counting occurrences.
#[inline]
pub fn connection_strength(weight: f64, count_by_weight: bool) -> f64 {
    if count_by_weight {
        weight
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{Connection, Item};

    struct RawView {
        items: Vec<Item>,
        connections: Vec<Connection>,
    }

    impl MatrixView for RawView {
        fn items(&self) -> &[Item] {
            &self.items
        }

        fn connections(&self) -> &[Connection] {
            &self.connections
        }
    }

    fn view(ids: &[ItemId], conns: &[(ItemId, ItemId, f64)]) -> RawView {
        RawView {
            items: ids
                .iter()
                .map(|&id| Item {
                    id,
                    name: id.to_string(),
                    sort_index: 0.0,
                    group: 0,
                })
                .collect(),
            connections: conns
                .iter()
                .map(|&(a, b, weight)| Connection {
                    a,
                    b,
                    weight,
                    label: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_snapshot_reindexes_by_ascending_id() {
        let raw = view(&[30, 10, 20], &[(30, 10, 2.0), (20, 30, 1.5)]);
        let adj = WeightedAdjacency::from_view(&raw);

        assert_eq!(adj.item_ids(), &[10, 20, 30]);
        assert_eq!(adj.index_of(30), Some(2));
        assert_eq!(adj.index_of(99), None);
        assert_eq!(adj.edges(), &[(0, 2, 2.0), (1, 2, 1.5)]);

        let n2: Vec<(usize, f64)> = adj.neighbors(2).collect();
        assert_eq!(n2, vec![(0, 2.0), (1, 1.5)]);
        let n1: Vec<(usize, f64)> = adj.neighbors(1).collect();
        assert_eq!(n1, vec![(2, 1.5)]);
    }

    #[test]
    fn test_snapshot_ignores_self_loops() {
        let adj = WeightedAdjacency::from_view(&view(&[1, 2], &[(1, 1, 4.0), (1, 2, 1.0)]));
        assert_eq!(adj.edges().len(), 1);
        assert_eq!(adj.neighbors(0).count(), 1);
    }

    #[test]
    #[should_panic(expected = "unknown item id")]
    fn test_snapshot_panics_on_dangling_connection() {
        WeightedAdjacency::from_view(&view(&[1, 2], &[(1, 3, 1.0)]));
    }

    #[test]
    fn test_connection_strength() {
        assert_eq!(connection_strength(3.5, true), 3.5);
        assert_eq!(connection_strength(3.5, false), 1.0);
    }
}
