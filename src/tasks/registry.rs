use std::{collections::HashMap, sync::Arc};

use crate::domain::{Item, ItemId};

/// Every item ever admitted, keyed by id. Never pruned.
#[derive(Debug, Default)]
pub struct SeenRegistry {
    items: HashMap<ItemId, Arc<Item>>,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items.get(&id)
    }

    /// Returns `false` and leaves the existing entry untouched when `id` is taken.
    pub fn insert(&mut self, item: Arc<Item>) -> bool {
        match self.items.entry(item.id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(item);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
