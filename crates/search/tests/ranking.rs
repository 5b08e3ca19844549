#![forbid(unsafe_code)]

use typeahead_core::{EngineConfig, NewItem, SearchOptions};
use typeahead_search::{score, Engine};

fn item(id: &str, text: &str) -> NewItem {
    NewItem::new(text).with_id(id).with_value(serde_json::json!({ "id": id }))
}

fn engine(items: Vec<NewItem>) -> Engine {
    let mut e = Engine::new(EngineConfig::default()).unwrap();
    for it in items { e.add_item(it); }
    e
}

#[test]
fn prefix_matches_outrank_fuzzy_and_misses_are_excluded() {
    let mut e = engine(vec![
        item("1", "Apple"),
        item("2", "Banana"),
        item("3", "Apple Pie"),
        item("4", "a grape"),
    ]);
    let r = e.search("ap", &SearchOptions::default());
    let ids: Vec<&str> = r.items.iter().map(|it| it.id.as_str()).collect();
    // "a grape" contains "ap" as a substring, ranked after both prefixes
    assert_eq!(ids, vec!["1", "3", "4"]);
    assert!(r.items.iter().all(|it| it.text != "Banana"));
    assert!(r.items.iter().all(|it| it.score.unwrap_or(0) > 0));
}

#[test]
fn scored_copies_do_not_touch_stored_items() {
    let mut e = engine(vec![item("1", "Apple")]);
    let r = e.search("apple", &SearchOptions::default());
    assert_eq!(r.items[0].score, Some(100));
    assert_eq!(r.items[0].highlighted.as_deref(), Some("<mark>Apple</mark>"));
    let stored = e.get_item("1").unwrap();
    assert!(stored.score.is_none());
    assert!(stored.highlighted.is_none());
    assert_eq!(stored.value, serde_json::json!({ "id": "1" }));
}

#[test]
fn fuzzy_subsequence_is_binary() {
    assert_eq!(score("Banana", "bnn", true, false), 60);
    assert_eq!(score("Banana", "bxx", true, false), 0);
    let mut e = engine(vec![item("1", "Banana")]);
    assert_eq!(e.search("bnn", &SearchOptions::default()).total, 1);
    assert_eq!(e.search("bnn", &SearchOptions::default().fuzzy(false)).total, 0);
}

#[test]
fn per_call_case_sensitivity_overrides_default() {
    let mut e = engine(vec![item("1", "Apple"), item("2", "apple")]);
    let r = e.search("apple", &SearchOptions::default().case_sensitive(true));
    let scores: Vec<(&str, u8)> = r.items.iter().map(|it| (it.id.as_str(), it.score.unwrap_or(0))).collect();
    assert_eq!(scores, vec![("2", 100)]);
    let r = e.search("apple", &SearchOptions::default());
    assert_eq!(r.total, 2);
}

#[test]
fn removed_items_leave_others_searchable() {
    let mut e = engine(vec![item("a", "Apple"), item("b", "Apricot")]);
    assert!(e.remove_item("a"));
    assert!(!e.remove_item("a"));
    assert!(e.get_item("a").is_none());
    let r = e.search("apr", &SearchOptions::default());
    assert_eq!(r.items[0].id, "b");
}
