//! `bestiary` entry point.

use std::path::PathBuf;
use std::sync::Arc;

use bestiary_client::config;
use bestiary_client::error::{ClientError, ClientResult};
use bestiary_client::telemetry;
use bestiary_client::view::{self, SortKey, SortOrder};
use bestiary_client::{Catalog, Dataset};
use bestiary_core::{BestiaryConfig, CreatureDetail};
use bestiary_tasks::{CancellationToken, Debouncer, Progress};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Width of a stat bar in characters.
const BAR_WIDTH: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "bestiary", version, about = "Browse the creature catalog from the terminal")]
struct Cli {
    /// Path to a bestiary.toml (falls back to $BESTIARY_CONFIG, then defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded creatures by id, one page at a time
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Search by name, id or type
    Search {
        query: String,
        /// Keep only creatures having this type (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
        #[arg(long, default_value_t = SortKey::Id)]
        sort: SortKey,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Search as you type: every stdin line replaces the query
    Browse {
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,
    },
    /// Show one creature
    Detail {
        id_or_name: String,
        /// Also show the previous and next creature by id
        #[arg(long)]
        nav: bool,
    },
    /// List the known types
    Types,
    /// Creatures having every given type
    Gallery {
        #[arg(required = true)]
        types: Vec<String>,
        #[arg(long, default_value_t = 120)]
        cap: usize,
    },
    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove every cached catalog entry
    Clear,
    /// Remove expired entries only
    Purge,
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();
    telemetry::init_tracing()?;

    let config = config::load(cli.config.as_deref())?;
    let catalog = Catalog::from_config(&config)?;

    match cli.command {
        Command::List { page } => {
            let dataset = load(&catalog, &config).await?;
            let records: Vec<&CreatureDetail> = dataset.records.iter().collect();
            print_page(&records, page, config.search.page_size);
        }
        Command::Search {
            query,
            types,
            sort,
            desc,
            page,
        } => {
            let dataset = load(&catalog, &config).await?;
            let order = if desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            let hits = view::select(&dataset.records, &query, &types, sort, order);
            print_page(&hits, page, config.search.page_size);
        }
        Command::Browse { types } => {
            let dataset = load(&catalog, &config).await?;
            browse(&dataset, &types, &config).await?;
        }
        Command::Detail { id_or_name, nav } => {
            let detail = catalog.detail(&id_or_name).await?;
            print_detail(&detail);
            if nav {
                let dataset = load(&catalog, &config).await?;
                let records: Vec<&CreatureDetail> = dataset.records.iter().collect();
                if let Some(n) = view::neighbours(&records, &detail.name) {
                    println!();
                    println!(
                        "prev: {}   next: {}",
                        n.prev.as_deref().unwrap_or("-"),
                        n.next.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Command::Types => {
            for name in catalog.type_names().await {
                println!("{name}");
            }
        }
        Command::Gallery { types, cap } => {
            for summary in catalog.summaries_by_types(&types, cap).await {
                println!(
                    "{:<6} {:<16} {}",
                    view::padded_id(summary.id),
                    summary.name,
                    summary.image
                );
            }
        }
        Command::Cache { action } => {
            let namespace = catalog.namespace().to_string();
            let removed = match action {
                CacheAction::Clear => catalog.clear_cache(),
                CacheAction::Purge => catalog.cache().purge_expired(&namespace),
            };
            println!("Removed {removed} entries from '{namespace}'");
        }
    }

    Ok(())
}

/// Load the configured dataset, drawing progress on stderr.
///
/// Ctrl-C stops claiming new items; what has loaded so far is kept.
async fn load(catalog: &Catalog, config: &BestiaryConfig) -> ClientResult<Dataset> {
    let (progress, updates) = watch::channel(Progress::default());
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing in-flight requests");
                cancel.cancel();
            }
        })
    };
    let reporter = tokio::spawn(draw_progress(updates));

    let dataset = catalog
        .load_dataset(
            config.fetch.limit,
            config.fetch.concurrency,
            Arc::new(progress),
            Some(cancel),
        )
        .await;

    interrupt.abort();
    let _ = reporter.await;

    if dataset.fell_back {
        warn!("Catalog unreachable, showing the offline set");
    }
    if !dataset.failures.is_empty() {
        warn!(failed = dataset.failures.len(), "Some records could not be loaded");
    }
    let dataset = dataset.into_result(!config.fetch.continue_on_error)?;
    info!(records = dataset.records.len(), cancelled = dataset.cancelled, "Ready");
    Ok(dataset)
}

async fn draw_progress(mut updates: watch::Receiver<Progress>) {
    while updates.changed().await.is_ok() {
        let progress = *updates.borrow_and_update();
        eprint!("\rLoading {progress} ({}%)", progress.percent());
    }
    eprintln!();
}

/// Read queries from stdin and show results once typing settles.
async fn browse(
    dataset: &Dataset,
    types: &[String],
    config: &BestiaryConfig,
) -> ClientResult<()> {
    let query = Debouncer::with_delay(String::new(), config.search.debounce());
    let mut committed = query.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown: Option<String> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    query.set(line.trim().to_string());
                }
                None => break,
            },
            changed = committed.changed() => {
                if changed.is_err() {
                    break;
                }
                let q = committed.borrow_and_update().clone();
                show_results(dataset, &q, types, config.search.page_size);
                shown = Some(q);
            }
        }
    }

    let last = query.current();
    if shown.as_ref() != Some(&last) {
        show_results(dataset, &last, types, config.search.page_size);
    }
    Ok(())
}

fn show_results(dataset: &Dataset, query: &str, types: &[String], page_size: usize) {
    let hits = view::select(&dataset.records, query, types, SortKey::Id, SortOrder::Ascending);
    println!("-- '{query}': {} matches", hits.len());
    print_page(&hits, 1, page_size);
}

fn print_page(records: &[&CreatureDetail], page: usize, page_size: usize) {
    let page = view::paginate(records, page, page_size);
    for record in &page.items {
        println!("{}", row(record));
    }
    println!(
        "page {}/{} ({} total){}{}",
        page.page,
        page.total_pages,
        page.total_items,
        if page.can_prev { "  [prev]" } else { "" },
        if page.can_next { "  [next]" } else { "" },
    );
}

fn row(record: &CreatureDetail) -> String {
    let types: Vec<&str> = record.type_names().collect();
    let exp = record
        .base_experience
        .map_or_else(|| "-".to_string(), |e| e.to_string());
    format!(
        "{:<6} {:<16} {:<18} h {:<4} w {:<5} exp {}",
        view::padded_id(record.id),
        record.name,
        types.join("/"),
        record.height,
        record.weight,
        exp
    )
}

fn print_detail(detail: &CreatureDetail) {
    println!("{} {}", view::padded_id(detail.id), detail.name);
    println!("image:  {}", view::display_image(detail));
    println!("types:  {}", detail.type_names().collect::<Vec<_>>().join(", "));
    println!("height: {}  weight: {}", detail.height, detail.weight);
    if let Some(exp) = detail.base_experience {
        println!("base experience: {exp}");
    }

    let abilities: Vec<String> = detail
        .abilities
        .iter()
        .map(|a| {
            if a.is_hidden {
                format!("{} (hidden)", a.ability.name)
            } else {
                a.ability.name.clone()
            }
        })
        .collect();
    println!("abilities: {}", abilities.join(", "));

    println!();
    for stat in &detail.stats {
        let filled =
            (view::stat_bar_percent(stat.base_stat) / 100.0 * BAR_WIDTH as f64).round() as usize;
        println!(
            "{:<16} {:>3} {}{}",
            stat.stat.name,
            stat.base_stat,
            "#".repeat(filled),
            ".".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
        );
    }
}
