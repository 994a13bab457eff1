//! 🚰 The batching sink: buffer by size or time, flush in parallel.
//!
//! 🎬 *[a loader pushes documents into a queue. somewhere, four workers wait.]*
//! *[the queue fills. the loader waits. this is called backpressure. it is the only brake we have.]*
//!
//! 🧠 Knowledge graph:
//! - [`BulkIndexer::start`] validates config, spawns `workers` [`worker::FlushWorker`]s.
//! - [`BulkIndexer::add`] encodes one [`BulkItem`] into its two NDJSON lines and queues it.
//!   The queue is bounded; a full queue makes `add` wait.
//! - [`BulkIndexer::close`] closes the queue, lets every worker drain + flush, joins them,
//!   and returns the final [`BulkStats`].
//! - Transport is a trait object, so tests swap the cluster for a `Vec`.
//!
//! ```text
//! loader ──add──▶ [bounded queue] ──▶ worker 0..N ──buffer──▶ transport.send(ndjson)
//! ```

pub mod stats;
pub mod transport;
mod worker;

#[cfg(test)]
pub(crate) mod in_mem;

use std::sync::Arc;
use std::time::Duration;

use async_channel::Sender;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::BulkError;
pub use stats::BulkStats;
use stats::BulkCounters;
pub use transport::{BulkTransport, ElasticsearchTransport};
use worker::{EncodedItem, FlushWorker, Worker};

/// 🔧 Knobs for the batching sink.
#[derive(Debug, Deserialize, Clone)]
pub struct BulkConfig {
    /// 🧵 Flush workers running in parallel.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 📏 A worker flushes before its buffer would grow past this many bytes.
    #[serde(default = "default_flush_bytes")]
    pub flush_bytes: usize,
    /// ⏱️ A worker flushes whatever it has at least this often.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// 🚦 Items that may wait in the queue before `add` starts blocking.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// 🫁 gzip every `_bulk` body.
    #[serde(default)]
    pub compress_requests: bool,
}

fn default_workers() -> usize {
    4
}

// -- 📦 5MB. ES says "a few MB per request" and we believed it.
fn default_flush_bytes() -> usize {
    5_000_000
}

fn default_flush_interval_ms() -> u64 {
    250
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            flush_bytes: default_flush_bytes(),
            flush_interval_ms: default_flush_interval_ms(),
            queue_capacity: default_queue_capacity(),
            compress_requests: false,
        }
    }
}

impl BulkConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    fn validate(&self) -> Result<(), BulkError> {
        let zero = [
            ("workers", self.workers == 0),
            ("flush_bytes", self.flush_bytes == 0),
            ("flush_interval_ms", self.flush_interval_ms == 0),
            ("queue_capacity", self.queue_capacity == 0),
        ];
        match zero.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(BulkError::Construction(format!(
                "`{name}` must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}

/// 📦 One document headed for `_bulk` as an `index` action: create, or overwrite by `_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    pub index: String,
    pub document_id: String,
    /// 📄 Single-line JSON source.
    pub body: String,
}

impl BulkItem {
    pub fn index(index: impl Into<String>, document_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            document_id: document_id.into(),
            body: body.into(),
        }
    }

    /// 📡 Action line + source line, each newline-terminated.
    fn encode(&self) -> Result<String, BulkError> {
        let reject = |reason: &str| BulkError::Item {
            document_id: self.document_id.clone(),
            reason: reason.to_string(),
        };
        if self.body.trim().is_empty() {
            return Err(reject("empty body"));
        }
        if self.body.contains('\n') {
            // -- ⚠️ a raw newline would split the document across two NDJSON lines
            return Err(reject("body contains a raw newline and would break NDJSON framing"));
        }

        let mut meta = serde_json::Map::new();
        meta.insert("_index".to_string(), self.index.clone().into());
        meta.insert("_id".to_string(), self.document_id.clone().into());
        let mut action = serde_json::Map::new();
        action.insert("index".to_string(), meta.into());
        let action = serde_json::Value::Object(action).to_string();

        let mut payload = String::with_capacity(action.len() + self.body.len() + 2);
        payload.push_str(&action);
        payload.push('\n');
        payload.push_str(&self.body);
        payload.push('\n');
        Ok(payload)
    }
}

/// 🚰 Handle on a running batching sink.
#[derive(Debug)]
pub struct BulkIndexer {
    tx: Sender<EncodedItem>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<BulkCounters>,
}

impl BulkIndexer {
    /// 🚀 Validate, open the queue, spawn the workers. Needs a tokio runtime.
    pub fn start(config: &BulkConfig, transport: Arc<dyn BulkTransport>) -> Result<Self, BulkError> {
        config.validate()?;

        let (tx, rx) = async_channel::bounded(config.queue_capacity);
        let counters = Arc::new(BulkCounters::default());
        let workers = (0..config.workers)
            .map(|id| {
                FlushWorker::new(
                    id,
                    rx.clone(),
                    Arc::clone(&transport),
                    Arc::clone(&counters),
                    config.flush_bytes,
                    config.flush_interval(),
                )
                .start()
            })
            .collect();

        info!(
            workers = config.workers,
            flush_bytes = config.flush_bytes,
            flush_interval_ms = config.flush_interval_ms,
            queue_capacity = config.queue_capacity,
            "🚰 bulk indexer started"
        );
        Ok(Self {
            tx,
            workers,
            counters,
        })
    }

    /// 📥 Queue one item. Waits while the queue is full.
    ///
    /// Errors are per-item: a malformed body or a closed indexer rejects this item only.
    pub async fn add(&self, item: BulkItem) -> Result<(), BulkError> {
        let payload = item.encode()?;
        let document_id = item.document_id;
        self.tx
            .send(EncodedItem {
                document_id: document_id.clone(),
                payload,
            })
            .await
            .map_err(|_| BulkError::Item {
                document_id,
                reason: "bulk indexer is closed".to_string(),
            })?;
        self.counters.added();
        Ok(())
    }

    /// 🔒 Shut the queue without joining anyone, so later `add`s bounce.
    #[cfg(test)]
    pub(crate) fn seal(&self) {
        self.tx.close();
    }

    /// 🏁 Drain, flush, join. Returns the final tally.
    pub async fn close(self) -> Result<BulkStats, BulkError> {
        let Self {
            tx,
            workers,
            counters,
        } = self;
        // -- 🔒 closing the queue is the workers' cue to flush and leave
        tx.close();
        drop(tx);

        let joined = futures::future::join_all(workers).await;
        for (worker, result) in joined.into_iter().enumerate() {
            result.map_err(|source| BulkError::Close { worker, source })?;
        }

        let stats = counters.snapshot();
        info!(?stats, "🏁 bulk indexer closed");
        Ok(stats)
    }
}
