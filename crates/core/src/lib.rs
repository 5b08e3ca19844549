//! Typeahead core types: items, search results and errors.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod config;
pub mod event;

pub use config::{ConfigUpdate, EngineConfig, ResolvedOptions, SearchOptions};
pub use event::{EngineEvent, EventListener, Notifier};

/// Relevance score in `[0, 100]`.
pub type Score = u8;

/// Free-form metadata attached to an item.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Number of suggestions derived per query.
pub const MAX_SUGGESTIONS: usize = 5;

pub type Suggestions = SmallVec<[String; MAX_SUGGESTIONS]>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
    pub text: String,
    /// Opaque payload; the engine never looks inside.
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Only set on copies returned inside a search result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<String>,
}

/// Input for `add_item`. A missing id is generated by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewItem {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl NewItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = value;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Shallow patch: every supplied field replaces the stored one, omitted fields are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ItemPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self { category: Some(category.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.value.is_none() && self.category.is_none() && self.metadata.is_none()
    }
}

impl Item {
    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(text) = patch.text { self.text = text; }
        if let Some(value) = patch.value { self.value = value; }
        if let Some(category) = patch.category { self.category = Some(category); }
        if let Some(metadata) = patch.metadata { self.metadata = Some(metadata); }
    }
}

/// Ranked, truncated result of one search call. Cached by value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub items: Vec<Item>,
    /// Equals `items.len()` (count after filtering, threshold and limit).
    pub total: usize,
    pub query: String,
    pub elapsed: Duration,
    pub suggestions: Suggestions,
}

impl SearchResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

/// Snapshot of engine usage counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_items: usize,
    pub total_categories: usize,
    pub cache_size: usize,
    pub total_queries: u64,
    /// `cache_size / total_queries * 100`; an approximation, not a true hit ratio.
    pub cache_hit_rate: f64,
    pub popular_queries: Vec<PopularQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TypeaheadError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("superseded by a newer debounced search")]
    Superseded,
    #[error("debounced search cancelled")]
    Cancelled,
}

pub type TypeaheadResult<T> = Result<T, TypeaheadError>;

pub mod prelude {
    pub use super::{
        ConfigUpdate, EngineConfig, EngineEvent, EventListener, Item, ItemPatch, Metadata, NewItem,
        PopularQuery, ResolvedOptions, Score, SearchOptions, SearchResult, Statistics, Suggestions,
        TypeaheadError, TypeaheadResult,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Item {
        Item {
            id: "1".into(),
            text: "Apple".into(),
            value: serde_json::json!({"sku": 7}),
            category: Some("fruit".into()),
            metadata: None,
            score: None,
            highlighted: None,
        }
    }

    #[test]
    fn patch_replaces_only_supplied_fields() {
        let mut it = stored();
        it.apply(ItemPatch::text("Apple Pie"));
        assert_eq!(it.text, "Apple Pie");
        assert_eq!(it.category.as_deref(), Some("fruit"));
        assert_eq!(it.value, serde_json::json!({"sku": 7}));
    }

    #[test]
    fn patch_metadata_is_shallow() {
        let mut it = stored();
        let mut m = Metadata::new();
        m.insert("a".into(), serde_json::json!(1));
        it.apply(ItemPatch { metadata: Some(m.clone()), ..Default::default() });
        let mut m2 = Metadata::new();
        m2.insert("b".into(), serde_json::json!(2));
        it.apply(ItemPatch { metadata: Some(m2.clone()), ..Default::default() });
        assert_eq!(it.metadata, Some(m2));
    }

    #[test]
    fn new_item_deserializes_with_defaults() {
        let n: NewItem = serde_json::from_str(r#"{"text":"Banana"}"#).unwrap();
        assert_eq!(n.text, "Banana");
        assert!(n.id.is_none());
        assert_eq!(n.value, serde_json::Value::Null);
    }
}
