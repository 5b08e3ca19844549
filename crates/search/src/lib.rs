//! Typeahead search: tiered scoring over the item store, memoized per
//! (query, resolved options), with suggestions and usage statistics.
//!
//! `Engine` is a single-owner aggregate and does no internal locking. Wrap it in
//! [`Typeahead`] to share it across tasks and to get debounced searches.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info};
use typeahead_core::{
    ConfigUpdate, EngineConfig, EngineEvent, EventListener, Item, ItemPatch, NewItem, Notifier,
    SearchOptions, SearchResult, Statistics, Suggestions, TypeaheadResult, MAX_SUGGESTIONS,
};
use typeahead_store::ItemStore;

pub mod cache;
pub mod debounce;
pub mod scoring;
pub mod stats;

pub use cache::{CacheKey, QueryCache};
pub use debounce::Typeahead;
pub use scoring::{score, Highlighter, Scorer};
pub use stats::QueryStats;

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    store: ItemStore,
    cache: QueryCache,
    stats: QueryStats,
    notifier: Notifier,
    epoch: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> TypeaheadResult<Self> {
        config.validate()?;
        Ok(Self {
            cache: QueryCache::with_capacity(config.cache_capacity),
            config,
            store: ItemStore::new(),
            stats: QueryStats::default(),
            notifier: Notifier::new(),
            epoch: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn len(&self) -> usize { self.store.len() }
    pub fn is_empty(&self) -> bool { self.store.is_empty() }
    pub fn cache_len(&self) -> usize { self.cache.len() }

    /// Bumped by every `reset`; debounced searches scheduled before it are dropped.
    pub fn epoch(&self) -> u64 { self.epoch }

    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.notifier.subscribe(listener);
    }

    pub fn subscribe_channel(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        self.notifier.subscribe_channel()
    }
}

/// Item operations.
impl Engine {
    pub fn add_item(&mut self, new: NewItem) -> Item {
        let item = self.store.add(new);
        debug!(id = %item.id, category = ?item.category, "item added");
        self.after_mutation();
        self.notifier.emit(EngineEvent::ItemAdded(item.clone()));
        item
    }

    /// False when the id is unknown; no event in that case.
    pub fn remove_item(&mut self, id: &str) -> bool {
        let Some(item) = self.store.remove(id) else { return false };
        debug!(id, "item removed");
        self.after_mutation();
        self.notifier.emit(EngineEvent::ItemRemoved(item));
        true
    }

    pub fn update_item(&mut self, id: &str, patch: ItemPatch) -> Option<Item> {
        let item = self.store.update(id, patch)?;
        debug!(id, "item updated");
        self.after_mutation();
        self.notifier.emit(EngineEvent::ItemUpdated(item.clone()));
        Some(item)
    }

    pub fn get_item(&self, id: &str) -> Option<&Item> { self.store.get(id) }

    pub fn items(&self) -> impl Iterator<Item = &Item> + '_ { self.store.iter() }

    pub fn items_by_category<'a>(&'a self, category: &'a str) -> Vec<&'a Item> {
        self.store.by_category(category).collect()
    }

    pub fn categories(&self) -> &[String] { self.store.categories() }

    fn after_mutation(&mut self) {
        if self.config.invalidate_cache_on_mutation && !self.cache.is_empty() {
            debug!(entries = self.cache.len(), "invalidating query cache after mutation");
            self.cache.clear();
        }
    }
}

/// Search operations.
impl Engine {
    pub fn search(&mut self, query: &str, options: &SearchOptions) -> SearchResult {
        if query.chars().count() < self.config.min_query_length {
            return SearchResult::empty(query);
        }
        let resolved = options.resolve(&self.config);
        let key = CacheKey::new(query, &resolved);
        if let Some(hit) = self.cache.get(&key) {
            let hit = hit.clone();
            metrics::counter!("typeahead_cache_hits_total", 1);
            debug!(key = %key, "cache hit");
            self.notifier.emit(EngineEvent::CacheHit { query: query.to_string() });
            return hit;
        }
        metrics::counter!("typeahead_cache_misses_total", 1);
        self.stats.record(query);

        let started = Instant::now();
        let scorer = Scorer::new(query, resolved.fuzzy, resolved.case_sensitive);
        let highlighter = self.config.enable_highlighting.then(|| {
            Highlighter::new(query, resolved.case_sensitive, &self.config.highlight_open, &self.config.highlight_close)
        });
        let category = resolved.category.as_deref();
        let mut hits: Vec<Item> = Vec::new();
        for it in self.store.iter() {
            if category.is_some() && it.category.as_deref() != category { continue; }
            let s = scorer.score(&it.text);
            if s == 0 { continue; }
            let mut hit = it.clone();
            hit.score = Some(s);
            hit.highlighted = highlighter.as_ref().map(|h| h.highlight(&it.text).into_owned());
            hits.push(hit);
        }
        // Stable: equal scores keep store order
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(resolved.limit);

        let result = SearchResult {
            total: hits.len(),
            items: hits,
            query: query.to_string(),
            elapsed: started.elapsed(),
            suggestions: self.derive_suggestions(query),
        };
        metrics::histogram!("typeahead_search_ms", result.elapsed.as_secs_f64() * 1_000.0);
        self.cache.put(key, result.clone());
        metrics::gauge!("typeahead_cache_entries", self.cache.len() as f64);
        self.notifier.emit(EngineEvent::SearchCompleted {
            query: result.query.clone(),
            total: result.total,
            elapsed: result.elapsed,
        });
        result
    }

    /// Up to five distinct item texts containing the query, case-insensitively.
    pub fn suggest(&self, query: &str) -> Suggestions {
        if query.chars().count() < self.config.min_query_length {
            return Suggestions::new();
        }
        self.derive_suggestions(query)
    }

    fn derive_suggestions(&self, query: &str) -> Suggestions {
        let q = query.to_lowercase();
        let mut out = Suggestions::new();
        for it in self.store.iter() {
            if out.len() >= MAX_SUGGESTIONS { break; }
            if it.text.to_lowercase().contains(&q) && !out.contains(&it.text) {
                out.push(it.text.clone());
            }
        }
        out
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        metrics::gauge!("typeahead_cache_entries", 0.0);
        info!("query cache cleared");
        self.notifier.emit(EngineEvent::CacheCleared);
    }

    pub fn statistics(&self) -> Statistics {
        let total = self.stats.total();
        let cache_hit_rate = if total > 0 { self.cache.len() as f64 / total as f64 * 100.0 } else { 0.0 };
        Statistics {
            total_items: self.store.len(),
            total_categories: self.store.categories().len(),
            cache_size: self.cache.len(),
            total_queries: total,
            cache_hit_rate,
            popular_queries: self.stats.popular(stats::POPULAR_LIMIT),
        }
    }
}

/// Configuration and lifecycle.
impl Engine {
    /// Merge `update` into the current config. On error the config is unchanged.
    pub fn update_config(&mut self, update: &ConfigUpdate) -> TypeaheadResult<&EngineConfig> {
        let next = self.config.merged(update)?;
        // Highlight settings are not part of the cache key
        let markers_changed = next.enable_highlighting != self.config.enable_highlighting
            || next.highlight_open != self.config.highlight_open
            || next.highlight_close != self.config.highlight_close;
        self.cache.set_capacity(next.cache_capacity);
        if markers_changed { self.cache.clear(); }
        self.config = next;
        info!(config = ?self.config, "config updated");
        self.notifier.emit(EngineEvent::ConfigUpdated(self.config.clone()));
        Ok(&self.config)
    }

    /// Drop items, categories, cached results and statistics. Listeners and config are kept.
    pub fn reset(&mut self) {
        self.store.clear();
        self.cache.clear();
        self.stats.clear();
        self.epoch += 1;
        metrics::gauge!("typeahead_cache_entries", 0.0);
        info!(epoch = self.epoch, "engine reset");
        self.notifier.emit(EngineEvent::ResetCompleted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine(texts: &[&str]) -> Engine {
        let mut e = Engine::new(EngineConfig::default()).unwrap();
        for (i, t) in texts.iter().enumerate() {
            e.add_item(NewItem::new(*t).with_id(i.to_string()));
        }
        e
    }

    fn texts(r: &SearchResult) -> Vec<&str> { r.items.iter().map(|it| it.text.as_str()).collect() }

    #[test]
    fn ap_ranks_prefix_matches_and_drops_banana() {
        let mut e = engine(&["Apple", "Banana", "Apple Pie"]);
        let r = e.search("ap", &SearchOptions::default());
        assert_eq!(texts(&r), vec!["Apple", "Apple Pie"]);
        assert_eq!(r.total, 2);
        assert!(r.items.iter().all(|it| it.score == Some(scoring::PREFIX)));
    }

    #[test]
    fn tiers_order_results() {
        let mut e = engine(&["x-a-p-p", "pineapp", "app store", "app"]);
        let r = e.search("app", &SearchOptions::default());
        assert_eq!(texts(&r), vec!["app", "app store", "pineapp", "x-a-p-p"]);
        let scores: Vec<_> = r.items.iter().filter_map(|it| it.score).collect();
        assert_eq!(scores, vec![100, 90, 70, 60]);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let mut e = engine(&["beta one", "alpha one", "gamma one"]);
        let r = e.search("one", &SearchOptions::default());
        assert_eq!(texts(&r), vec!["beta one", "alpha one", "gamma one"]);
    }

    #[test]
    fn limit_truncates_and_total_matches() {
        let mut e = engine(&["a1", "a2", "a3", "a4"]);
        let r = e.search("a", &SearchOptions::default().limit(2));
        assert_eq!(r.items.len(), 2);
        assert_eq!(r.total, 2);
    }

    #[test]
    fn highlighting_wraps_literal_match_only() {
        let mut e = engine(&["Banana", "Bandana"]);
        let r = e.search("ana", &SearchOptions::default());
        assert_eq!(r.items[0].highlighted.as_deref(), Some("B<mark>ana</mark>na"));
        let r = e.search("bnn", &SearchOptions::default());
        assert_eq!(r.items[0].highlighted.as_deref(), Some("Banana"));
    }

    #[test]
    fn category_filter_restricts_candidates() {
        let mut e = Engine::new(EngineConfig::default()).unwrap();
        e.add_item(NewItem::new("Apple").with_category("fruit"));
        e.add_item(NewItem::new("Apple Watch").with_category("tech"));
        let r = e.search("apple", &SearchOptions::default().category("tech"));
        assert_eq!(texts(&r), vec!["Apple Watch"]);
    }

    #[test]
    fn short_query_is_rejected_without_side_effects() {
        let mut e = engine(&["Apple"]);
        e.update_config(&ConfigUpdate { min_query_length: Some(3), ..Default::default() }).unwrap();
        let r = e.search("ap", &SearchOptions::default());
        assert!(r.items.is_empty());
        assert_eq!(r.total, 0);
        assert_eq!(e.cache_len(), 0);
        assert_eq!(e.statistics().total_queries, 0);
    }

    #[test]
    fn equivalent_options_share_cache_entry() {
        let mut e = engine(&["Apple"]);
        let completed = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&completed);
        e.subscribe(Arc::new(move |ev: &EngineEvent| {
            if matches!(ev, EngineEvent::SearchCompleted { .. }) { c.fetch_add(1, Ordering::SeqCst); }
        }));
        e.search("app", &SearchOptions::default());
        e.search("app", &SearchOptions::default().limit(10).fuzzy(true).case_sensitive(false));
        assert_eq!(completed.load(Ordering::SeqCst), 1);
        assert_eq!(e.cache_len(), 1);
        assert_eq!(e.statistics().total_queries, 1);
    }

    #[test]
    fn clear_cache_forces_recompute() {
        let mut e = engine(&["Apple"]);
        let mut rx = e.subscribe_channel();
        e.search("app", &SearchOptions::default());
        e.clear_cache();
        e.search("app", &SearchOptions::default());
        let mut completed = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, EngineEvent::SearchCompleted { .. }) { completed += 1; }
        }
        assert_eq!(completed, 2);
    }

    #[test]
    fn cache_is_stale_after_mutation_by_default() {
        let mut e = engine(&["Apple"]);
        e.search("app", &SearchOptions::default());
        e.add_item(NewItem::new("Applet"));
        let r = e.search("app", &SearchOptions::default());
        assert_eq!(texts(&r), vec!["Apple"]);
    }

    #[test]
    fn invalidation_policy_refreshes_cache() {
        let mut e = engine(&["Apple"]);
        e.update_config(&ConfigUpdate { invalidate_cache_on_mutation: Some(true), ..Default::default() }).unwrap();
        e.search("app", &SearchOptions::default());
        e.add_item(NewItem::new("Applet"));
        let r = e.search("app", &SearchOptions::default());
        assert_eq!(texts(&r), vec!["Apple", "Applet"]);
    }

    #[test]
    fn suggestions_are_distinct_and_capped() {
        let mut e = engine(&["Apple", "Apple", "Pineapple", "apple pie", "Apples", "Snapple", "Grapple"]);
        let s = e.suggest("APP");
        assert_eq!(s.as_slice(), ["Apple", "Pineapple", "apple pie", "Apples", "Snapple"]);
        let r = e.search("app", &SearchOptions::default());
        assert_eq!(r.suggestions, s);
    }

    #[test]
    fn statistics_reflect_misses_only() {
        let mut e = engine(&["Apple", "Banana"]);
        e.search("app", &SearchOptions::default());
        e.search("app", &SearchOptions::default());
        e.search("ban", &SearchOptions::default());
        e.search("ban", &SearchOptions::default().limit(1));
        let st = e.statistics();
        assert_eq!(st.total_queries, 3);
        assert_eq!(st.cache_size, 3);
        assert!((st.cache_hit_rate - 100.0).abs() < f64::EPSILON);
        assert_eq!(st.popular_queries[0].query, "ban");
        assert_eq!(st.popular_queries[0].count, 2);
        assert_eq!(e.statistics(), st);
    }

    #[test]
    fn invalid_config_update_keeps_previous() {
        let mut e = engine(&[]);
        let bad = ConfigUpdate { max_results: Some(0), ..Default::default() };
        assert!(e.update_config(&bad).is_err());
        assert_eq!(e.config().max_results, 10);
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() { out.push(ev); }
        out
    }

    fn label(ev: &EngineEvent) -> &'static str {
        match ev {
            EngineEvent::ItemAdded(_) => "added",
            EngineEvent::ItemRemoved(_) => "removed",
            EngineEvent::ItemUpdated(_) => "updated",
            EngineEvent::CacheHit { .. } => "cache_hit",
            EngineEvent::SearchCompleted { .. } => "completed",
            EngineEvent::CacheCleared => "cache_cleared",
            EngineEvent::ConfigUpdated(_) => "config",
            EngineEvent::ResetCompleted => "reset",
        }
    }

    #[test]
    fn operations_emit_expected_events() {
        let mut e = Engine::new(EngineConfig::default()).unwrap();
        let mut rx = e.subscribe_channel();

        let added = e.add_item(NewItem::new("Apple").with_id("1"));
        let updated = e.update_item("1", ItemPatch::text("Apple Pie")).unwrap();
        assert!(e.update_item("missing", ItemPatch::text("x")).is_none());
        assert!(!e.remove_item("missing"));
        e.search("app", &SearchOptions::default());
        e.search("app", &SearchOptions::default());
        e.update_config(&ConfigUpdate { max_results: Some(5), ..Default::default() }).unwrap();
        e.clear_cache();
        assert!(e.remove_item("1"));
        e.reset();

        let events = drain(&mut rx);
        let labels: Vec<&str> = events.iter().map(label).collect();
        assert_eq!(
            labels,
            vec!["added", "updated", "completed", "cache_hit", "config", "cache_cleared", "removed", "reset"]
        );
        assert_eq!(events[0], EngineEvent::ItemAdded(added));
        assert_eq!(events[1], EngineEvent::ItemUpdated(updated.clone()));
        match &events[2] {
            EngineEvent::SearchCompleted { query, total, .. } => {
                assert_eq!(query, "app");
                assert_eq!(*total, 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[3], EngineEvent::CacheHit { query: "app".into() });
        match &events[4] {
            EngineEvent::ConfigUpdated(cfg) => assert_eq!(cfg.max_results, 5),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[6], EngineEvent::ItemRemoved(updated));
    }

    #[test]
    fn misses_emit_nothing() {
        let mut e = engine(&["Apple"]);
        let mut rx = e.subscribe_channel();
        assert!(!e.remove_item("nope"));
        assert!(e.update_item("nope", ItemPatch::text("x")).is_none());
        e.update_config(&ConfigUpdate { min_query_length: Some(3), ..Default::default() }).unwrap();
        e.search("ap", &SearchOptions::default());
        let labels: Vec<&str> = drain(&mut rx).iter().map(label).collect();
        assert_eq!(labels, vec!["config"]);
    }

    #[test]
    fn items_by_category_keeps_insertion_order() {
        let mut e = Engine::new(EngineConfig::default()).unwrap();
        e.add_item(NewItem::new("Pear").with_id("p").with_category("fruit"));
        e.add_item(NewItem::new("Kale").with_id("k").with_category("veg"));
        e.add_item(NewItem::new("Apple").with_id("a").with_category("fruit"));
        e.add_item(NewItem::new("Fig").with_id("f").with_category("fruit"));
        let ids: Vec<&str> = e.items_by_category("fruit").iter().map(|it| it.id.as_str()).collect();
        assert_eq!(ids, vec!["p", "a", "f"]);
        assert!(e.items_by_category("grain").is_empty());
        assert_eq!(e.categories(), &["fruit".to_string(), "veg".to_string()]);
    }

    #[test]
    fn shrinking_cache_capacity_evicts_oldest() {
        let mut e = engine(&["Apple", "Banana", "Cherry"]);
        e.search("app", &SearchOptions::default());
        e.search("ban", &SearchOptions::default());
        e.search("che", &SearchOptions::default());
        assert_eq!(e.cache_len(), 3);
        e.update_config(&ConfigUpdate { cache_capacity: Some(Some(1)), ..Default::default() }).unwrap();
        assert_eq!(e.cache_len(), 1);
        let mut rx = e.subscribe_channel();
        e.search("che", &SearchOptions::default());
        e.search("app", &SearchOptions::default());
        let labels: Vec<&str> = drain(&mut rx).iter().map(label).collect();
        assert_eq!(labels, vec!["cache_hit", "completed"]);
        assert_eq!(e.cache_len(), 1);
    }

    #[test]
    fn reset_bumps_epoch() {
        let mut e = engine(&["Apple"]);
        let before = e.epoch();
        e.reset();
        assert_eq!(e.epoch(), before + 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut e = Engine::new(EngineConfig::default()).unwrap();
        e.add_item(NewItem::new("Apple").with_category("fruit"));
        e.search("app", &SearchOptions::default());
        e.reset();
        assert!(e.is_empty());
        assert!(e.categories().is_empty());
        assert_eq!(e.statistics(), Statistics::default());
    }
}
