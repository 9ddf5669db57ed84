//! Matrix construction module

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::matrix::{ClusterId, Connection, Grouping, Item, ItemId, SymmetricMatrix};

/// Builder for incrementally constructing a `SymmetricMatrix` by item name
pub struct MatrixBuilder {
    /// Matrix title
    title: String,

    /// Mapping from item names to ids
    name_to_id: HashMap<String, ItemId>,

    /// Items in insertion order
    items: Vec<Item>,

    /// Explicit group per item (None = own group on build)
    assignments: Vec<Option<ClusterId>>,

    /// Declared groups
    groups: Vec<Grouping>,

    /// Connections as (a, b, weight, label)
    connections: Vec<(String, String, f64, String)>,
}

impl MatrixBuilder {
    /// Create a new builder with room for `capacity` items
    pub fn with_capacity(title: impl Into<String>, capacity: usize) -> Self {
        Self {
            title: title.into(),
            name_to_id: HashMap::with_capacity(capacity),
            items: Vec::with_capacity(capacity),
            assignments: Vec::with_capacity(capacity),
            groups: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Get or create an item with the given name
    pub fn item(&mut self, name: &str) -> ItemId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }

        let id = self.items.len() as ItemId;
        self.name_to_id.insert(name.to_string(), id);
        self.items.push(Item {
            id,
            name: name.to_string(),
            sort_index: id as f64,
            group: 0,
        });
        self.assignments.push(None);

        id
    }

    /// Declare a new group and return its id
    pub fn group(&mut self, name: &str) -> ClusterId {
        let id = self.groups.len() as ClusterId;
        self.groups.push(Grouping {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Put an item (created on demand) into a declared group
    pub fn assign(&mut self, item: &str, group: ClusterId) -> &mut Self {
        let id = self.item(item);
        self.assignments[id as usize] = Some(group);
        self
    }

    /// Connect two items (created on demand) with weight 1.0
    pub fn connect(&mut self, a: &str, b: &str) -> &mut Self {
        self.connect_weighted(a, b, 1.0)
    }

    /// Connect two items (created on demand) with an explicit weight
    pub fn connect_weighted(&mut self, a: &str, b: &str, weight: f64) -> &mut Self {
        self.connect_labeled(a, b, weight, "")
    }

    /// Connect two items with a weight and a display label
    pub fn connect_labeled(&mut self, a: &str, b: &str, weight: f64, label: &str) -> &mut Self {
        self.item(a);
        self.item(b);
        self.connections
            .push((a.to_string(), b.to_string(), weight, label.to_string()));
        self
    }

    /// Build the matrix
    ///
    /// Items without an explicit group get a fresh group named after the item.
    pub fn build(mut self) -> Result<SymmetricMatrix> {
        for (idx, assignment) in self.assignments.iter().enumerate() {
            let group = match assignment {
                Some(group) => *group,
                None => {
                    let id = self.groups.len() as ClusterId;
                    self.groups.push(Grouping {
                        id,
                        name: self.items[idx].name.clone(),
                    });
                    id
                }
            };
            self.items[idx].group = group;
        }

        let mut connections = Vec::with_capacity(self.connections.len());
        for (a, b, weight, label) in self.connections {
            let a = *self.name_to_id.get(&a).ok_or(Error::UnknownItem(a))?;
            let b = *self.name_to_id.get(&b).ok_or(Error::UnknownItem(b))?;
            connections.push(Connection { a, b, weight, label });
        }

        SymmetricMatrix::new(self.title, self.items, self.groups, connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixView;

    #[test]
    fn test_builder_assigns_sequential_ids_and_own_groups() {
        let mut b = MatrixBuilder::with_capacity("m", 3);
        b.connect_weighted("A", "B", 2.0).connect("B", "C");
        let m = b.build().unwrap();

        assert_eq!(m.item_count(), 3);
        assert_eq!(m.item_by_name("C").unwrap().id, 2);
        assert_eq!(m.groups().len(), 3);
        assert_eq!(m.group_name(m.item_by_name("B").unwrap().group), Some("B"));
        assert_eq!(m.connections()[0].weight, 2.0);
    }

    #[test]
    fn test_builder_respects_explicit_groups() {
        let mut b = MatrixBuilder::with_capacity("m", 3);
        let g = b.group("core");
        b.assign("A", g).assign("B", g).connect("A", "C");
        let m = b.build().unwrap();

        assert_eq!(m.item_by_name("A").unwrap().group, g);
        assert_eq!(m.item_by_name("B").unwrap().group, g);
        assert_ne!(m.item_by_name("C").unwrap().group, g);
        assert_eq!(m.members_of(g), vec![0, 1]);
    }

    #[test]
    fn test_builder_rejects_bad_connections() {
        let mut b = MatrixBuilder::with_capacity("m", 2);
        b.connect("A", "A");
        assert!(matches!(b.build(), Err(Error::SelfConnection(0))));

        let mut b = MatrixBuilder::with_capacity("m", 2);
        b.connect_weighted("A", "B", -1.0);
        assert!(matches!(b.build(), Err(Error::InvalidWeight { .. })));

        let mut b = MatrixBuilder::with_capacity("m", 2);
        b.connect("A", "B").connect("B", "A");
        assert!(matches!(b.build(), Err(Error::DuplicateConnection { .. })));
    }

    #[test]
    fn test_builder_unknown_group() {
        let mut b = MatrixBuilder::with_capacity("m", 1);
        b.assign("A", 4);
        assert!(matches!(b.build(), Err(Error::UnknownGroup { item: 0, group: 4 })));
    }
}
