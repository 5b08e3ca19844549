use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;
use typeahead_core::{ResolvedOptions, SearchResult};

/// Raw query plus fully-resolved options. Equivalent calls always collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub options: ResolvedOptions,
}

impl CacheKey {
    pub fn new(query: &str, options: &ResolvedOptions) -> Self {
        Self { query: query.to_string(), options: options.clone() }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.options;
        write!(
            f,
            "{}|category={}|limit={}|fuzzy={}|case={}",
            self.query,
            o.category.as_deref().unwrap_or("*"),
            o.limit,
            o.fuzzy,
            o.case_sensitive
        )
    }
}

/// Memoized search results with an optional FIFO capacity.
#[derive(Debug, Default)]
pub struct QueryCache {
    map: FxHashMap<CacheKey, SearchResult>,
    order: VecDeque<CacheKey>,
    cap: Option<usize>,
    evicted: u64,
}

impl QueryCache {
    pub fn with_capacity(cap: Option<usize>) -> Self {
        Self { cap, ..Default::default() }
    }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }
    pub fn evicted(&self) -> u64 { self.evicted }

    pub fn get(&self, key: &CacheKey) -> Option<&SearchResult> { self.map.get(key) }

    pub fn put(&mut self, key: CacheKey, result: SearchResult) {
        if !self.map.contains_key(&key) {
            if let Some(cap) = self.cap {
                while self.order.len() >= cap {
                    let Some(old) = self.order.pop_front() else { break };
                    self.map.remove(&old);
                    self.evicted += 1;
                }
            }
            self.order.push_back(key.clone());
        }
        self.map.insert(key, result);
    }

    /// Apply a new capacity, evicting oldest entries if now over it.
    pub fn set_capacity(&mut self, cap: Option<usize>) {
        self.cap = cap;
        if let Some(cap) = cap {
            while self.order.len() > cap {
                let Some(old) = self.order.pop_front() else { break };
                self.map.remove(&old);
                self.evicted += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
