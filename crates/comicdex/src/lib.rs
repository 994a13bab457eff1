//! 📚 comicdex: pull every xkcd comic, bulk it into Elasticsearch, search it back out.
//!
//! 🎬 *[a range of numbers. a website that has answered them all since 2006. a cluster waiting.]*
//!
//! 🧠 Knowledge graph:
//! - [`run_index`]: ping the cluster → plan IDs → fan out fetches ([`collector`]) →
//!   drain into the batching sink ([`loader`] on [`bulk`]) → final stats.
//! - [`run_search`]: one query through [`search::SearchClient`] → typed envelope.
//! - Config comes from [`app_config::load_config`]; the CLI only wires flags to these two calls.

pub mod app_config;
pub mod bulk;
pub mod collector;
pub mod comic;
pub mod elasticsearch;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod progress;
pub mod report;
pub mod search;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::app_config::AppConfig;
use crate::bulk::{BulkIndexer, BulkStats, ElasticsearchTransport};
use crate::collector::{CollectReport, Collector};
use crate::comic::IdPlan;
use crate::elasticsearch::EsClient;
use crate::fetcher::HttpComicFetcher;
use crate::loader::{LoadReport, Loader};
use crate::progress::FetchProgress;
use crate::search::{QuerySpec, SearchClient, SearchEnvelope};

/// 🏁 What a full index run did, phase by phase.
#[derive(Debug)]
pub struct IndexRun {
    pub plan: IdPlan,
    /// 📡 The fetch phase. `comics` is emptied once the loader takes them.
    pub collect: CollectReport,
    pub load: LoadReport,
}

impl IndexRun {
    pub fn stats(&self) -> &BulkStats {
        &self.load.stats
    }
}

/// 🚀 The whole pipeline, end to end.
///
/// The cluster is pinged and the indexer started before a single comic is
/// fetched, so a bad URL or bad credentials cost nothing but a log line.
pub async fn run_index(config: AppConfig) -> anyhow::Result<IndexRun> {
    let es_client = EsClient::connect(&config.elasticsearch).await.context(
        "💀 Could not reach Elasticsearch. Nothing was fetched. Check the urls and credentials in [elasticsearch].",
    )?;
    let transport = ElasticsearchTransport::new(es_client, config.bulk.compress_requests);
    let indexer = BulkIndexer::start(&config.bulk, Arc::new(transport))
        .context("💀 Could not start the bulk indexer. Check the [bulk] section.")?;

    let fetcher = HttpComicFetcher::new(&config.source)?;
    let last = match config.source.last_id {
        Some(last) => last,
        None => {
            let latest = fetcher.fetch_latest().await.context(
                "💀 No last_id configured and the latest comic could not be discovered. Set [source] last_id to skip the lookup.",
            )?;
            info!(latest = latest.num, "🗓️ discovered the newest comic");
            latest.num
        }
    };
    let plan = IdPlan::new(
        config.source.first_id,
        last,
        config.source.skip_ids.iter().copied(),
    );
    let ids = plan.ids();
    info!(
        first = plan.first(),
        last = plan.last(),
        planned = ids.len(),
        "📋 ID plan ready"
    );

    let progress = FetchProgress::new(ids.len() as u64, config.source.show_progress);
    let mut collect = Collector::new(Arc::new(fetcher))
        .with_max_in_flight(config.source.max_in_flight)
        .with_progress(progress)
        .run_all(&ids)
        .await;

    let comics = std::mem::take(&mut collect.comics);
    let load = Loader::new(config.elasticsearch.index.as_str())
        .load(comics, indexer)
        .await
        .context("💀 The bulk indexer did not close cleanly. Some documents may not have been flushed.")?;

    Ok(IndexRun {
        plan,
        collect,
        load,
    })
}

/// 🔎 One query against the configured index.
pub async fn run_search(config: &AppConfig, query: &QuerySpec) -> anyhow::Result<SearchEnvelope> {
    // -- 🔌 no ping here; the search itself is the connectivity test
    let es_client = EsClient::new(&config.elasticsearch)
        .context("💀 Could not build the Elasticsearch client. Check the [elasticsearch] section.")?;
    let client = SearchClient::new(es_client, config.elasticsearch.index.as_str());
    client
        .search(query)
        .await
        .with_context(|| format!("💀 Search against index '{}' failed", config.elasticsearch.index))
}
