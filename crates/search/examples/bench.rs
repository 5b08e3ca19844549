use std::time::Instant;

use typeahead_core::{EngineConfig, NewItem, SearchOptions};
use typeahead_search::Engine;

const WORDS: &[&str] = &["apple", "banana", "cherry", "delta", "echo", "falcon", "granite", "harbor"];

fn gen_item(i: usize) -> NewItem {
    let a = WORDS[i % WORDS.len()];
    let b = WORDS[(i / WORDS.len()) % WORDS.len()];
    NewItem::new(format!("{a} {b} {i:06}"))
        .with_id(format!("item-{i}"))
        .with_category(format!("cat{}", i % 10))
}

fn percentile_us(xs: &mut [u128], p: f64) -> u128 {
    xs.sort_unstable();
    let idx = ((xs.len() as f64 - 1.0) * p).round() as usize;
    xs[idx]
}

fn main() {
    let n: usize = std::env::var("TYPEAHEAD_BENCH_ITEMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50_000);
    let limit: usize = std::env::var("TYPEAHEAD_BENCH_LIMIT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    let mut engine = match Engine::new(EngineConfig::default()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("loading {} items", n);
    let t0 = Instant::now();
    for i in 0..n {
        engine.add_item(gen_item(i));
    }
    let load_ms = t0.elapsed().as_secs_f64() * 1_000.0;

    let prefix: Vec<String> = WORDS.iter().map(|w| w[..3].to_string()).collect();
    let fuzzy: Vec<String> = vec!["apl".into(), "bnn".into(), "chry".into(), "flcn".into()];
    let categorized: Vec<(String, String)> = (0..10).map(|c| ("ech".to_string(), format!("cat{c}"))).collect();

    let mut run = |label: &str, qs: &[(String, Option<String>)]| {
        let mut times: Vec<u128> = Vec::with_capacity(qs.len());
        for (q, cat) in qs {
            let mut opts = SearchOptions::default().limit(limit);
            opts.category = cat.clone();
            engine.clear_cache();
            let t = Instant::now();
            let _ = engine.search(q, &opts);
            times.push(t.elapsed().as_micros());
        }
        let p50 = percentile_us(&mut times.clone(), 0.50) as f64 / 1000.0;
        let p99 = percentile_us(&mut times, 0.99) as f64 / 1000.0;
        println!("{}: p50={:.3}ms p99={:.3}ms ({} queries, limit={})", label, p50, p99, qs.len(), limit);
    };

    println!("load: {:.1}ms items={}", load_ms, n);
    run("prefix", &prefix.into_iter().map(|q| (q, None)).collect::<Vec<_>>());
    run("fuzzy", &fuzzy.into_iter().map(|q| (q, None)).collect::<Vec<_>>());
    run("category", &categorized.into_iter().map(|(q, c)| (q, Some(c))).collect::<Vec<_>>());
}
