//! Tiered relevance scoring and literal-match highlighting.

use std::borrow::Cow;

use regex::{Regex, RegexBuilder};
use tracing::warn;
use typeahead_core::Score;

pub const EXACT: Score = 100;
pub const PREFIX: Score = 90;
pub const SUBSTRING: Score = 70;
pub const FUZZY: Score = 60;

/// Score `text` against `query`. First matching tier wins; 0 means excluded.
pub fn score(text: &str, query: &str, fuzzy: bool, case_sensitive: bool) -> Score {
    Scorer::new(query, fuzzy, case_sensitive).score(text)
}

/// Greedy left-to-right subsequence walk. True only when every query char is consumed.
pub fn is_subsequence(text: &str, query: &str) -> bool {
    let mut q = query.chars().peekable();
    for c in text.chars() {
        match q.peek() {
            Some(want) if *want == c => { q.next(); }
            Some(_) => {}
            None => break,
        }
    }
    q.peek().is_none()
}

fn fuzzy_score(text: &str, query: &str) -> Score {
    let len = query.chars().count();
    if len == 0 { return 0; }
    let matched = if is_subsequence(text, query) { len } else { 0 };
    let fraction = matched as f64 / len as f64;
    if fraction > 0.5 { (fraction * FUZZY as f64).round() as Score } else { 0 }
}

/// Per-query scorer: normalizes the query once and reuses it for every candidate.
pub struct Scorer<'q> {
    query: Cow<'q, str>,
    fuzzy: bool,
    case_sensitive: bool,
}

impl<'q> Scorer<'q> {
    pub fn new(query: &'q str, fuzzy: bool, case_sensitive: bool) -> Self {
        let query = if case_sensitive { Cow::Borrowed(query) } else { Cow::Owned(query.to_lowercase()) };
        Self { query, fuzzy, case_sensitive }
    }

    pub fn score(&self, text: &str) -> Score {
        let text: Cow<'_, str> = if self.case_sensitive { Cow::Borrowed(text) } else { Cow::Owned(text.to_lowercase()) };
        let q = self.query.as_ref();
        if text == q { return EXACT; }
        if text.starts_with(q) { return PREFIX; }
        if text.contains(q) { return SUBSTRING; }
        if self.fuzzy { return fuzzy_score(&text, q); }
        0
    }
}

/// Wraps every literal occurrence of a query with open/close markers.
pub struct Highlighter {
    re: Option<Regex>,
    open: String,
    close: String,
}

impl Highlighter {
    pub fn new(query: &str, case_sensitive: bool, open: &str, close: &str) -> Self {
        let re = if query.is_empty() {
            None
        } else {
            match RegexBuilder::new(&regex::escape(query)).case_insensitive(!case_sensitive).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(error = %e, "highlight pattern rejected; leaving text unmarked");
                    None
                }
            }
        };
        Self { re, open: open.to_string(), close: close.to_string() }
    }

    /// Marked text, or the input unchanged when the query is not a literal substring.
    pub fn highlight<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.re {
            Some(re) => re.replace_all(text, |caps: &regex::Captures<'_>| {
                format!("{}{}{}", self.open, &caps[0], self.close)
            }),
            None => Cow::Borrowed(text),
        }
    }
}
