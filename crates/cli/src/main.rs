use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use typeahead_core::{EngineConfig, NewItem, SearchOptions, SearchResult, TypeaheadError};
use typeahead_search::{Engine, Typeahead};

#[derive(Parser, Debug)]
#[command(name = "typeahead", version, about = "In-memory typeahead over a JSON item file")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// JSON array of items: {"id"?, "text", "value"?, "category"?, "metadata"?}
    #[arg(short = 'f', long = "items", global = true, env = "TYPEAHEAD_ITEMS")]
    items: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank items against a query
    Search {
        query: String,
        /// Restrict to one category
        #[arg(long = "category")]
        category: Option<String>,
        /// Limit results
        #[arg(long = "limit")]
        limit: Option<usize>,
        #[arg(long = "case-sensitive", action = ArgAction::SetTrue)]
        case_sensitive: bool,
        /// Disable subsequence matching
        #[arg(long = "no-fuzzy", action = ArgAction::SetTrue)]
        no_fuzzy: bool,
    },
    /// Print suggestions for a query
    Suggest { query: String },
    /// List categories seen in the item file
    Categories,
    /// Run each query once and print usage statistics
    Stats { queries: Vec<String> },
    /// Read queries from stdin, one per line, with debounced search
    Interactive,
}

fn init_tracing() {
    let env = std::env::var("TYPEAHEAD_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("TYPEAHEAD_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid TYPEAHEAD_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_items(path: &Path) -> Result<Vec<NewItem>> {
    let raw = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let items: Vec<NewItem> = serde_json::from_slice(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(items)
}

fn build_engine(path: Option<&Path>) -> Result<Engine> {
    let mut engine = Engine::new(EngineConfig::from_env()?)?;
    match path {
        Some(p) => {
            let items = load_items(p)?;
            let n = items.len();
            for it in items { engine.add_item(it); }
            info!(items = n, categories = engine.categories().len(), path = %p.display(), "items loaded");
        }
        None => warn!("no item file given (--items or TYPEAHEAD_ITEMS); index is empty"),
    }
    Ok(engine)
}

fn print_result(out: Output, res: &SearchResult) -> Result<()> {
    match out {
        Output::Human => {
            for it in res.items.iter() {
                let text = it.highlighted.as_deref().unwrap_or(&it.text);
                let cat = it.category.as_deref().unwrap_or("-");
                println!("{:>3}  {}  [{}]  {}", it.score.unwrap_or(0), text, cat, it.id);
            }
            if !res.suggestions.is_empty() {
                println!("suggestions: {}", res.suggestions.join(", "));
            }
            println!("{} result(s) for {:?} in {:.3}ms", res.total, res.query, res.elapsed.as_secs_f64() * 1_000.0);
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(res)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let mut engine = build_engine(cli.items.as_deref())?;

    match cli.command {
        Commands::Search { query, category, limit, case_sensitive, no_fuzzy } => {
            let opts = SearchOptions {
                category,
                limit,
                fuzzy: no_fuzzy.then_some(false),
                case_sensitive: case_sensitive.then_some(true),
            };
            let res = engine.search(&query, &opts);
            print_result(cli.output, &res)?;
        }
        Commands::Suggest { query } => {
            let s = engine.suggest(&query);
            match cli.output {
                Output::Human => for t in s.iter() { println!("{}", t); },
                Output::Json => println!("{}", serde_json::to_string_pretty(&s)?),
            }
        }
        Commands::Categories => match cli.output {
            Output::Human => for c in engine.categories() { println!("{}", c); },
            Output::Json => println!("{}", serde_json::to_string_pretty(engine.categories())?),
        },
        Commands::Stats { queries } => {
            for q in queries.iter() {
                engine.search(q, &SearchOptions::default());
            }
            let st = engine.statistics();
            match cli.output {
                Output::Human => {
                    println!("items: {}  categories: {}  cached: {}", st.total_items, st.total_categories, st.cache_size);
                    println!("queries: {}  cache-hit-rate: {:.1}%", st.total_queries, st.cache_hit_rate);
                    for p in st.popular_queries.iter() {
                        println!("{:>5}  {}", p.count, p.query);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&st)?),
            }
        }
        Commands::Interactive => run_interactive(Typeahead::from_engine(engine), cli.output).await?,
    }
    Ok(())
}

async fn run_interactive(ta: Typeahead, out: Output) -> Result<()> {
    // stdin is blocking; pump lines from a plain thread
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() { break; }
        }
    });
    loop {
        tokio::select! {
            maybe = line_rx.recv() => {
                let Some(line) = maybe else {
                    info!("stdin closed; exiting");
                    break;
                };
                let query = line.trim().to_string();
                if query.is_empty() { continue; }
                let pending = ta.search_debounced(query, SearchOptions::default());
                tokio::spawn(async move {
                    match pending.await {
                        Ok(res) => {
                            if let Err(e) = print_result(out, &res) { warn!(error = %e, "print failed"); }
                        }
                        Err(TypeaheadError::Superseded) | Err(TypeaheadError::Cancelled) => {}
                        Err(e) => warn!(error = %e, "search failed"),
                    }
                });
            }
            _ = signal::ctrl_c() => {
                info!("Ctrl-C received; shutting down");
                break;
            }
        }
    }
    // Let a search scheduled just before EOF finish
    let delay = ta.lock().config().debounce_delay;
    tokio::time::sleep(delay + std::time::Duration::from_millis(10)).await;
    ta.reset();
    Ok(())
}
