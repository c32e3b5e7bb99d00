mod aggregate;
mod cache;
mod cli;
mod config;
mod constants;
mod core;
mod lists;
mod quota;
mod resolve;
mod sources;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, warn};

use crate::aggregate::{Aggregation, Aggregator};
use crate::cache::{HandleCache, ResponseCache};
use crate::config::{clamp_per_channel, AppConfig};
use crate::core::{ChannelId, UploadSource};
use crate::lists::ListStore;
use crate::quota::QuotaMeter;
use crate::resolve::Resolver;
use crate::sources::{DataApi, SourceChain};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    let cfg = AppConfig::load(cli.config.as_deref())?;

    let response_cache = ResponseCache::new(cfg.response_ttl);
    let quota = QuotaMeter::new(cfg.daily_quota);
    let api = cfg
        .api_key
        .clone()
        .map(|key| DataApi::new(key, response_cache.clone(), quota.clone()));

    let resolver = Resolver::new(api.clone(), HandleCache::new());
    let chain: Arc<dyn UploadSource> =
        Arc::new(SourceChain::from_parts(api, response_cache, cfg.low_quota));
    let aggregator = Aggregator::new(chain.clone(), cfg.overall_cap);

    let store = ListStore::new();

    match cli.cmd {
        cli::Command::Resolve { reference } => {
            let id = resolver.resolve(&reference).await?;
            println!("{id}");
        }
        cli::Command::Feed {
            references,
            list,
            limit,
            json,
        } => {
            let channels: Vec<ChannelId> = match list {
                Some(list_id) => {
                    seed_lists(&store, &resolver, &cfg).await;
                    let set = store.get(&list_id);
                    if set.is_empty() {
                        bail!("list '{list_id}' is empty or unknown");
                    }
                    set.into_iter().collect()
                }
                None => {
                    if references.is_empty() {
                        bail!("no channel references given; pass references or --list");
                    }
                    resolver.resolve_all(&references.join(" ")).await
                }
            };
            if channels.is_empty() {
                bail!("none of the given references resolved to a channel");
            }

            let per_channel = limit
                .map(clamp_per_channel)
                .unwrap_or(cfg.videos_per_channel);
            let result = aggregator.aggregate(&channels, per_channel).await;
            debug!(
                "metadata-API units spent: {} ({} remaining)",
                quota.spent(),
                quota.remaining()
            );
            print_aggregation(&result, json)?;
        }
        cli::Command::Video { video_id } => {
            let record = chain.video_meta(&video_id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        cli::Command::List { command } => {
            seed_lists(&store, &resolver, &cfg).await;
            run_list_command(command, &store, &resolver).await?;
        }
    }

    Ok(())
}

/// Resolve the config file's raw list entries into the store. A bad entry
/// costs that entry, not the list.
async fn seed_lists(store: &ListStore, resolver: &Resolver, cfg: &AppConfig) {
    for (list_id, entries) in &cfg.lists {
        for raw in entries {
            match resolver.resolve(raw).await {
                Ok(id) => {
                    store.add(list_id, id);
                }
                Err(err) => warn!("config list '{list_id}': {err}"),
            }
        }
    }
    debug!("seeded lists: {:?}", store.list_ids());
}

async fn run_list_command(
    command: cli::ListCommand,
    store: &ListStore,
    resolver: &Resolver,
) -> anyhow::Result<()> {
    let (list_id, set) = match command {
        cli::ListCommand::Show { list_id } => {
            let set = store.get(&list_id);
            (list_id, set)
        }
        cli::ListCommand::Add { list_id, reference } => {
            let id = resolver.resolve(&reference).await?;
            store.add(&list_id, id);
            let set = store.get(&list_id);
            (list_id, set)
        }
        cli::ListCommand::Remove { list_id, reference } => {
            let id = resolver.resolve(&reference).await?;
            store.remove(&list_id, &id);
            let set = store.get(&list_id);
            (list_id, set)
        }
        cli::ListCommand::Replace {
            list_id,
            references,
        } => {
            let ids = resolver.resolve_all(&references.join(" ")).await;
            store.replace(&list_id, ids);
            let set = store.get(&list_id);
            (list_id, set)
        }
    };
    print_list(&list_id, &set)?;
    Ok(())
}

fn print_list(list_id: &str, set: &BTreeSet<ChannelId>) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "list": list_id,
            "channels": set,
        }))?
    );
    Ok(())
}

fn print_aggregation(result: &Aggregation, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    for record in &result.records {
        let published = record
            .published_at
            .and_then(|at| at.format(&Rfc3339).ok())
            .unwrap_or_else(|| "-".to_string());
        println!("{:25} {:45} {}", published, record.id, record.title);
    }
    for failure in &result.failed {
        eprintln!("warning: {} skipped: {}", failure.channel, failure.reason);
    }
    Ok(())
}
