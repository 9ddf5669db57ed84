//! Symmetric dependency matrix model read by the clustering engine

pub mod builder;
pub mod compressed;

pub use builder::MatrixBuilder;
pub use compressed::WeightedAdjacency;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::{Error, Result};

/// Stable item identifier.
pub type ItemId = u32;

/// Cluster (group) identifier.
pub type ClusterId = u32;

/// One canonical item of a symmetric matrix.
///
/// The column alias of a row is implied and always shares the row's name and
/// group, so only one `Item` exists per symmetric pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable identifier
    pub id: ItemId,

    /// Display name
    pub name: String,

    /// Presentation order, not read by the engine
    pub sort_index: f64,

    /// Current group assignment
    pub group: ClusterId,
}

/// Undirected weighted dependency between two distinct items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Lower endpoint id
    pub a: ItemId,

    /// Higher endpoint id
    pub b: ItemId,

    /// Positive weight, 1.0 when the source did not record one
    pub weight: f64,

    /// Display label
    #[serde(default)]
    pub label: String,
}

/// A named group of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grouping {
    /// Group identifier
    pub id: ClusterId,

    /// Display name
    pub name: String,
}

/// Read-only view of a matrix consumed by the engine.
pub trait MatrixView {
    /// Canonical items, one per symmetric row/column pair.
    fn items(&self) -> &[Item];

    /// Connections, one per unordered item pair.
    fn connections(&self) -> &[Connection];

    /// Number of canonical items.
    fn item_count(&self) -> usize {
        self.items().len()
    }

    /// Largest group id known to the matrix, including groups without members.
    ///
    /// New clusters are numbered above it so they never take over an existing
    /// group's id.
    fn max_group_id(&self) -> Option<ClusterId> {
        self.items().iter().map(|item| item.group).max()
    }
}

/// Mutation surface used once, after a run, to write the final clustering back.
pub trait ClusteredMatrix: MatrixView {
    /// Move `item` into `group` (creating the group if needed) and give it a new sort index.
    fn set_group_and_sort_index(&mut self, item: ItemId, group: ClusterId, sort_index: f64);

    /// Drop groups that no longer have members.
    fn prune_empty_groups(&mut self) {}
}

/// Concrete symmetric DSM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymmetricMatrix {
    /// Matrix title
    pub title: String,

    items: Vec<Item>,
    connections: Vec<Connection>,
    groups: Vec<Grouping>,
}

impl SymmetricMatrix {
    /// Create a validated matrix.
    ///
    /// Connections are normalised so that `a < b`. Every item must reference an
    /// existing group and every connection must join two distinct known items
    /// with a finite positive weight.
    pub fn new(
        title: impl Into<String>,
        items: Vec<Item>,
        groups: Vec<Grouping>,
        connections: Vec<Connection>,
    ) -> Result<Self> {
        let mut ids = HashSet::with_capacity(items.len());
        for item in &items {
            if !ids.insert(item.id) {
                return Err(Error::DuplicateItem(item.id));
            }
        }

        let group_ids: HashSet<ClusterId> = groups.iter().map(|g| g.id).collect();
        for item in &items {
            if !group_ids.contains(&item.group) {
                return Err(Error::UnknownGroup {
                    item: item.id,
                    group: item.group,
                });
            }
        }

        let mut pairs = BTreeSet::new();
        let mut normalised = Vec::with_capacity(connections.len());
        for mut conn in connections {
            for id in [conn.a, conn.b] {
                if !ids.contains(&id) {
                    return Err(Error::UnknownItem(id.to_string()));
                }
            }
            if conn.a == conn.b {
                return Err(Error::SelfConnection(conn.a));
            }
            if !conn.weight.is_finite() || conn.weight <= 0.0 {
                return Err(Error::InvalidWeight {
                    a: conn.a,
                    b: conn.b,
                    weight: conn.weight,
                });
            }
            if conn.a > conn.b {
                std::mem::swap(&mut conn.a, &mut conn.b);
            }
            if !pairs.insert((conn.a, conn.b)) {
                return Err(Error::DuplicateConnection {
                    a: conn.a,
                    b: conn.b,
                });
            }
            normalised.push(conn);
        }

        Ok(Self {
            title: title.into(),
            items,
            connections: normalised,
            groups,
        })
    }

    /// Groups defined on this matrix.
    pub fn groups(&self) -> &[Grouping] {
        &self.groups
    }

    /// Look up an item by id.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Look up an item by display name.
    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name)
    }

    /// Name of a group, if it exists.
    pub fn group_name(&self, id: ClusterId) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.as_str())
    }

    /// Ids of the items in `group`, in presentation order.
    pub fn members_of(&self, group: ClusterId) -> Vec<ItemId> {
        let mut members: Vec<&Item> = self.items.iter().filter(|i| i.group == group).collect();
        members.sort_by(|x, y| x.sort_index.total_cmp(&y.sort_index).then(x.id.cmp(&y.id)));
        members.into_iter().map(|i| i.id).collect()
    }
}

impl MatrixView for SymmetricMatrix {
    fn items(&self) -> &[Item] {
        &self.items
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn max_group_id(&self) -> Option<ClusterId> {
        self.groups.iter().map(|g| g.id).max()
    }
}

impl ClusteredMatrix for SymmetricMatrix {
    fn set_group_and_sort_index(&mut self, item: ItemId, group: ClusterId, sort_index: f64) {
        if !self.groups.iter().any(|g| g.id == group) {
            self.groups.push(Grouping {
                id: group,
                name: format!("Cluster {}", group),
            });
        }

        let target = self
            .items
            .iter_mut()
            .find(|i| i.id == item)
            .unwrap_or_else(|| panic!("item {} is not part of this matrix", item));
        target.group = group;
        target.sort_index = sort_index;
    }

    fn prune_empty_groups(&mut self) {
        let used: HashSet<ClusterId> = self.items.iter().map(|i| i.group).collect();
        self.groups.retain(|g| used.contains(&g.id));
    }
}
