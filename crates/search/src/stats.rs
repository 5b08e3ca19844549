use rustc_hash::FxHashMap;
use typeahead_core::PopularQuery;

pub const POPULAR_LIMIT: usize = 10;

/// Per-query invocation counts in first-seen order.
#[derive(Debug, Default)]
pub struct QueryStats {
    slots: FxHashMap<String, usize>,
    counts: Vec<(String, u64)>,
    total: u64,
}

impl QueryStats {
    pub fn record(&mut self, query: &str) {
        self.total += 1;
        match self.slots.get(query) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.slots.insert(query.to_string(), self.counts.len());
                self.counts.push((query.to_string(), 1));
            }
        }
    }

    pub fn total(&self) -> u64 { self.total }

    pub fn count(&self, query: &str) -> u64 {
        self.slots.get(query).map(|&i| self.counts[i].1).unwrap_or(0)
    }

    /// Top queries by count; ties keep first-seen order.
    pub fn popular(&self, limit: usize) -> Vec<PopularQuery> {
        let mut v: Vec<&(String, u64)> = self.counts.iter().collect();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v.into_iter()
            .take(limit)
            .map(|(q, n)| PopularQuery { query: q.clone(), count: *n })
            .collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.counts.clear();
        self.total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn popular_orders_by_count_then_first_seen() {
        let mut s = QueryStats::default();
        for q in ["b", "a", "c", "a", "c"] { s.record(q); }
        let names: Vec<String> = s.popular(POPULAR_LIMIT).into_iter().map(|p| p.query).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
        assert_eq!(s.total(), 5);
        assert_eq!(s.count("a"), 2);
    }

    #[test]
    fn popular_is_capped() {
        let mut s = QueryStats::default();
        for i in 0..15 { s.record(&format!("q{i}")); }
        assert_eq!(s.popular(POPULAR_LIMIT).len(), 10);
    }
}
