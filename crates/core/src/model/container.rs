//! Composite entries.

use serde::Serialize;
use std::collections::HashSet;

use super::class::ClassFilter;
use super::item::EpgContainerProps;
use super::ObjectId;

/// Children of a container, in browse order, plus an id index over them.
///
/// Both structures always hold the same set of ids. Every change to that set
/// increases `update_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Container {
    children: Vec<ObjectId>,
    #[serde(skip)]
    child_index: HashSet<ObjectId>,
    pub searchable: bool,
    pub search_classes: Vec<ClassFilter>,
    pub create_classes: Vec<ClassFilter>,
    update_id: i64,
    /// Present for program guide channel containers.
    pub epg: Option<EpgContainerProps>,
}

impl Container {
    pub fn new(epg: Option<EpgContainerProps>) -> Self {
        Self {
            epg,
            ..Self::default()
        }
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.child_index.contains(&id)
    }

    pub fn update_id(&self) -> i64 {
        self.update_id
    }

    /// Append `id`. Returns false if it was already a child.
    pub(crate) fn insert_child(&mut self, id: ObjectId) -> bool {
        if !self.child_index.insert(id) {
            return false;
        }
        self.children.push(id);
        self.update_id += 1;
        true
    }

    /// Remove `id`. Returns false if it was not a child.
    pub(crate) fn remove_child(&mut self, id: ObjectId) -> bool {
        if !self.child_index.remove(&id) {
            return false;
        }
        self.children.retain(|child| *child != id);
        self.update_id += 1;
        true
    }

    /// Drop every child. Returns the ids that were removed.
    pub(crate) fn clear_children(&mut self) -> Vec<ObjectId> {
        if self.children.is_empty() {
            return Vec::new();
        }
        self.child_index.clear();
        self.update_id += 1;
        std::mem::take(&mut self.children)
    }

    /// Replace the child set with rows read from storage, without bumping `update_id`.
    pub(crate) fn load_children(&mut self, ids: Vec<ObjectId>) {
        self.child_index = ids.iter().copied().collect();
        self.children = ids;
    }

    pub(crate) fn load_update_id(&mut self, update_id: i64) {
        self.update_id = update_id;
    }
}
