//! 🚚 The loader walks the pile one comic at a time and feeds the bulk indexer.
//!
//! Sequential on purpose: the parallelism lives in the flush workers, not here.
//! Each comic becomes an `index` action keyed by its `num`, so a rerun overwrites.
//! One comic that won't serialize or won't queue gets logged and skipped. The rest carry on.

use tracing::{info, warn};

use crate::bulk::{BulkIndexer, BulkItem, BulkStats};
use crate::comic::Comic;
use crate::error::BulkError;

/// 📋 How the load went.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// 📥 Comics handed to the indexer.
    pub submitted: usize,
    /// ⚠️ `(num, reason)` for every comic that never made it into the queue.
    pub skipped: Vec<(u32, String)>,
    /// 📊 Final counters from the indexer.
    pub stats: BulkStats,
}

#[derive(Debug, Clone)]
pub struct Loader {
    index: String,
}

impl Loader {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    /// 🚚 Submit every comic, then close the indexer and wait for the last flush.
    ///
    /// Only a failed close escapes as an error.
    pub async fn load(&self, comics: Vec<Comic>, indexer: BulkIndexer) -> Result<LoadReport, BulkError> {
        info!(comics = comics.len(), index = %self.index, "🚚 indexing comics");

        let mut submitted = 0;
        let mut skipped = Vec::new();
        for comic in comics {
            let body = match serde_json::to_string(&comic) {
                Ok(body) => body,
                Err(err) => {
                    warn!(num = comic.num, error = %err, "⚠️ could not serialize comic; skipping");
                    skipped.push((comic.num, err.to_string()));
                    continue;
                }
            };

            let item = BulkItem::index(self.index.as_str(), comic.document_id(), body);
            match indexer.add(item).await {
                Ok(()) => submitted += 1,
                Err(err) => {
                    warn!(num = comic.num, error = %err, "⚠️ could not queue comic; skipping");
                    skipped.push((comic.num, err.to_string()));
                }
            }
        }

        let stats = indexer.close().await?;
        info!(
            submitted,
            skipped = skipped.len(),
            indexed = stats.num_indexed,
            failed = stats.num_failed,
            "✅ indexing complete"
        );
        Ok(LoadReport {
            submitted,
            skipped,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::BulkConfig;
    use crate::bulk::in_mem::InMemoryTransport;
    use crate::comic::{Comic, sample_comic};
    use std::sync::Arc;

    #[tokio::test]
    async fn the_one_where_every_comic_lands_under_its_own_number() -> anyhow::Result<()> {
        let transport = InMemoryTransport::new();
        let config = BulkConfig {
            flush_bytes: 2_000,
            ..BulkConfig::default()
        };
        let indexer = BulkIndexer::start(&config, Arc::new(transport.clone()))?;
        let comics: Vec<Comic> = [5, 1, 3, 2, 4].into_iter().map(sample_comic).collect();

        let report = Loader::new("xkcd").load(comics.clone(), indexer).await?;

        assert_eq!(report.submitted, 5);
        assert!(report.skipped.is_empty());
        assert_eq!(report.stats.num_indexed, 5);

        // -- 🔁 every source line decodes back into the exact comic under the matching _id
        let payloads = transport.payloads().await;
        let mut echoed = Vec::new();
        for sent in &payloads {
            let lines: Vec<&str> = sent.body.lines().collect();
            for pair in lines.chunks(2) {
                let action: serde_json::Value = serde_json::from_str(pair[0])?;
                let comic: Comic = serde_json::from_str(pair[1])?;
                assert_eq!(action["index"]["_index"], "xkcd");
                assert_eq!(action["index"]["_id"], comic.num.to_string());
                echoed.push(comic);
            }
        }
        echoed.sort_by_key(|c| c.num);
        let mut expected = comics;
        expected.sort_by_key(|c| c.num);
        assert_eq!(echoed, expected);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_empty_pile_still_closes_cleanly() -> anyhow::Result<()> {
        let transport = InMemoryTransport::new();
        let indexer = BulkIndexer::start(&BulkConfig::default(), Arc::new(transport.clone()))?;

        let report = Loader::new("xkcd").load(Vec::new(), indexer).await?;

        assert_eq!(report.submitted, 0);
        assert_eq!(report.stats.num_requests, 0);
        assert!(transport.payloads().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_shut_queue_skips_every_comic_but_the_load_still_finishes() -> anyhow::Result<()> {
        let transport = InMemoryTransport::new();
        let indexer = BulkIndexer::start(&BulkConfig::default(), Arc::new(transport.clone()))?;
        indexer.seal();

        let comics: Vec<Comic> = [1, 2, 3].into_iter().map(sample_comic).collect();
        let report = Loader::new("xkcd").load(comics, indexer).await?;

        assert_eq!(report.submitted, 0);
        let skipped: Vec<u32> = report.skipped.iter().map(|(num, _)| *num).collect();
        assert_eq!(skipped, vec![1, 2, 3]);
        assert!(report.skipped.iter().all(|(_, reason)| reason.contains("closed")));
        assert_eq!(report.stats.num_added, 0);
        assert!(transport.payloads().await.is_empty());
        Ok(())
    }
}
