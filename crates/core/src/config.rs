//! Engine configuration and per-call search options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{TypeaheadError, TypeaheadResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub min_query_length: usize,
    pub max_results: usize,
    pub debounce_delay: Duration,
    pub case_sensitive: bool,
    pub enable_fuzzy: bool,
    /// Engine-wide only; not overridable per call.
    pub enable_highlighting: bool,
    pub highlight_open: String,
    pub highlight_close: String,
    /// Clear the query cache on every add/update/remove. Off by default: cached
    /// results may go stale until `clear_cache` or `reset`.
    pub invalidate_cache_on_mutation: bool,
    /// FIFO bound on cached queries; `None` keeps every entry.
    pub cache_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_query_length: 1,
            max_results: 10,
            debounce_delay: Duration::from_millis(300),
            case_sensitive: false,
            enable_fuzzy: true,
            enable_highlighting: true,
            highlight_open: "<mark>".to_string(),
            highlight_close: "</mark>".to_string(),
            invalidate_cache_on_mutation: false,
            cache_capacity: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable config override");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value = %raw, "ignoring unparsable config flag");
            None
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `TYPEAHEAD_*` environment overrides.
    pub fn from_env() -> TypeaheadResult<Self> {
        let mut cfg = Self::default();
        if let Some(v) = env_parse("TYPEAHEAD_MIN_QUERY_LENGTH") { cfg.min_query_length = v; }
        if let Some(v) = env_parse("TYPEAHEAD_MAX_RESULTS") { cfg.max_results = v; }
        if let Some(ms) = env_parse::<u64>("TYPEAHEAD_DEBOUNCE_MS") { cfg.debounce_delay = Duration::from_millis(ms); }
        if let Some(v) = env_flag("TYPEAHEAD_CASE_SENSITIVE") { cfg.case_sensitive = v; }
        if let Some(v) = env_flag("TYPEAHEAD_FUZZY") { cfg.enable_fuzzy = v; }
        if let Some(v) = env_flag("TYPEAHEAD_HIGHLIGHT") { cfg.enable_highlighting = v; }
        if let Some(v) = env_flag("TYPEAHEAD_INVALIDATE_ON_MUTATION") { cfg.invalidate_cache_on_mutation = v; }
        if let Some(v) = env_parse("TYPEAHEAD_CACHE_CAPACITY") { cfg.cache_capacity = Some(v); }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> TypeaheadResult<()> {
        if self.debounce_delay.is_zero() {
            return Err(TypeaheadError::InvalidConfig("debounce_delay must be positive".into()));
        }
        if self.max_results == 0 {
            return Err(TypeaheadError::InvalidConfig("max_results must be positive".into()));
        }
        if self.cache_capacity == Some(0) {
            return Err(TypeaheadError::InvalidConfig("cache_capacity must be positive when set".into()));
        }
        if self.enable_highlighting && (self.highlight_open.is_empty() || self.highlight_close.is_empty()) {
            return Err(TypeaheadError::InvalidConfig("highlight markers must not be empty".into()));
        }
        Ok(())
    }

    /// Merge a partial update into a copy of this config and validate the result.
    pub fn merged(&self, update: &ConfigUpdate) -> TypeaheadResult<Self> {
        let mut next = self.clone();
        if let Some(v) = update.min_query_length { next.min_query_length = v; }
        if let Some(v) = update.max_results { next.max_results = v; }
        if let Some(v) = update.debounce_delay { next.debounce_delay = v; }
        if let Some(v) = update.case_sensitive { next.case_sensitive = v; }
        if let Some(v) = update.enable_fuzzy { next.enable_fuzzy = v; }
        if let Some(v) = update.enable_highlighting { next.enable_highlighting = v; }
        if let Some(v) = &update.highlight_open { next.highlight_open = v.clone(); }
        if let Some(v) = &update.highlight_close { next.highlight_close = v.clone(); }
        if let Some(v) = update.invalidate_cache_on_mutation { next.invalidate_cache_on_mutation = v; }
        if let Some(v) = update.cache_capacity { next.cache_capacity = v; }
        next.validate()?;
        Ok(next)
    }
}

/// Partial engine configuration; supplied fields replace the current ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigUpdate {
    pub min_query_length: Option<usize>,
    pub max_results: Option<usize>,
    pub debounce_delay: Option<Duration>,
    pub case_sensitive: Option<bool>,
    pub enable_fuzzy: Option<bool>,
    pub enable_highlighting: Option<bool>,
    pub highlight_open: Option<String>,
    pub highlight_close: Option<String>,
    pub invalidate_cache_on_mutation: Option<bool>,
    pub cache_capacity: Option<Option<usize>>,
}

/// Per-call overrides. Omitted fields fall back to the engine config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub fuzzy: Option<bool>,
    pub case_sensitive: Option<bool>,
}

impl SearchOptions {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn fuzzy(mut self, on: bool) -> Self {
        self.fuzzy = Some(on);
        self
    }

    pub fn case_sensitive(mut self, on: bool) -> Self {
        self.case_sensitive = Some(on);
        self
    }

    pub fn resolve(&self, cfg: &EngineConfig) -> ResolvedOptions {
        ResolvedOptions {
            category: self.category.clone(),
            limit: self.limit.unwrap_or(cfg.max_results),
            fuzzy: self.fuzzy.unwrap_or(cfg.enable_fuzzy),
            case_sensitive: self.case_sensitive.unwrap_or(cfg.case_sensitive),
        }
    }
}

/// Effective options after defaults are merged in; part of the cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ResolvedOptions {
    pub category: Option<String>,
    pub limit: usize,
    pub fuzzy: bool,
    pub case_sensitive: bool,
}
