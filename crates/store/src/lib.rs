//! Typeahead store: id-keyed item table with insertion order and an append-only category index.

#![forbid(unsafe_code)]

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use typeahead_core::{Item, ItemPatch, NewItem};

/// Items keyed by id, iterated in first-insertion order.
#[derive(Debug, Default)]
pub struct ItemStore {
    map: FxHashMap<String, Item>,
    order: Vec<String>,
    categories: Vec<String>,
    category_set: FxHashSet<String>,
}

impl ItemStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    /// Insert or overwrite by id. An overwritten item keeps its original position.
    pub fn add(&mut self, new: NewItem) -> Item {
        let id = new.id.unwrap_or_else(generate_id);
        let item = Item {
            id: id.clone(),
            text: new.text,
            value: new.value,
            category: new.category,
            metadata: new.metadata,
            score: None,
            highlighted: None,
        };
        if let Some(c) = item.category.as_deref() { self.register_category(c); }
        if self.map.insert(id.clone(), item.clone()).is_none() {
            self.order.push(id);
        } else {
            debug!(id = %item.id, "item overwritten");
        }
        metrics::gauge!("typeahead_items", self.map.len() as f64);
        item
    }

    /// Returns the removed item, or `None` when the id is unknown.
    pub fn remove(&mut self, id: &str) -> Option<Item> {
        let removed = self.map.remove(id)?;
        self.order.retain(|k| k != id);
        metrics::gauge!("typeahead_items", self.map.len() as f64);
        Some(removed)
    }

    pub fn update(&mut self, id: &str, patch: ItemPatch) -> Option<Item> {
        let item = self.map.get_mut(id)?;
        item.apply(patch);
        let updated = item.clone();
        if let Some(c) = updated.category.as_deref() { self.register_category(c); }
        Some(updated)
    }

    pub fn get(&self, id: &str) -> Option<&Item> { self.map.get(id) }

    pub fn contains(&self, id: &str) -> bool { self.map.contains_key(id) }

    /// All items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> + '_ {
        self.order.iter().filter_map(move |id| self.map.get(id))
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Item> + 'a {
        self.iter().filter(move |it| it.category.as_deref() == Some(category))
    }

    /// Every category ever assigned, in first-seen order. Never shrinks on removal.
    pub fn categories(&self) -> &[String] { &self.categories }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
        self.categories.clear();
        self.category_set.clear();
        metrics::gauge!("typeahead_items", 0.0);
    }

    fn register_category(&mut self, category: &str) {
        if self.category_set.insert(category.to_string()) {
            self.categories.push(category.to_string());
        }
    }
}

/// Random v4 id; unique within an engine's lifetime in practice.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
