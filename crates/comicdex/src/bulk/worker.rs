//! 🗑️ Flush workers. Patient, and deeply unbothered by the chaos upstream.
//!
//! Each worker pulls encoded items off the shared queue into its own NDJSON buffer
//! and ships the buffer when it would overflow `flush_bytes`, or when the interval
//! ticks with something in it, or when the queue closes. Then it goes home.
//!
//! 🧠 Knowledge graph:
//! - Queue is `async_channel` (MPMC): N workers, one queue, whoever's free takes the item.
//! - A buffer never exceeds `flush_bytes` unless a single item is bigger than that on its own.
//! - Request failures are counted and logged. The worker keeps going.

use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, trace, warn};

use super::stats::BulkCounters;
use super::transport::BulkTransport;

/// 📦 One document, already rendered as its two NDJSON lines.
#[derive(Debug, Clone)]
pub(crate) struct EncodedItem {
    pub(crate) document_id: String,
    pub(crate) payload: String,
}

/// 🏗️ A background worker, that does work. duh.
pub(crate) trait Worker {
    fn start(self) -> JoinHandle<()>;
}

enum Wakeup {
    Item(EncodedItem),
    QueueClosed,
    Tick,
}

#[derive(Debug)]
pub(crate) struct FlushWorker {
    id: usize,
    rx: Receiver<EncodedItem>,
    transport: Arc<dyn BulkTransport>,
    counters: Arc<BulkCounters>,
    flush_bytes: usize,
    flush_interval: Duration,
    buffer: String,
    buffered_ids: Vec<String>,
}

impl FlushWorker {
    pub(crate) fn new(
        id: usize,
        rx: Receiver<EncodedItem>,
        transport: Arc<dyn BulkTransport>,
        counters: Arc<BulkCounters>,
        flush_bytes: usize,
        flush_interval: Duration,
    ) -> Self {
        Self {
            id,
            rx,
            transport,
            counters,
            flush_bytes,
            flush_interval,
            buffer: String::new(),
            buffered_ids: Vec::new(),
        }
    }

    async fn run(mut self) {
        debug!(worker = self.id, "📥 flush worker started draining the queue");
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // -- ⏱️ the first tick fires immediately; burn it so the first real one is a full interval out
        ticker.tick().await;

        loop {
            let wakeup = tokio::select! {
                received = self.rx.recv() => match received {
                    Ok(item) => Wakeup::Item(item),
                    Err(_) => Wakeup::QueueClosed,
                },
                _ = ticker.tick() => Wakeup::Tick,
            };

            match wakeup {
                Wakeup::Item(item) => self.accept(item).await,
                Wakeup::Tick => {
                    if !self.buffered_ids.is_empty() {
                        trace!(worker = self.id, "⏱️ interval flush");
                        self.flush().await;
                    }
                }
                Wakeup::QueueClosed => {
                    self.flush().await;
                    debug!(worker = self.id, "🏁 queue closed and drained; flush worker going home");
                    return;
                }
            }
        }
    }

    async fn accept(&mut self, item: EncodedItem) {
        // -- 📏 make room first, so the buffer only ever overflows with a lone oversized item
        if !self.buffer.is_empty() && self.buffer.len() + item.payload.len() > self.flush_bytes {
            self.flush().await;
        }
        self.buffer.push_str(&item.payload);
        self.buffered_ids.push(item.document_id);
        if self.buffer.len() >= self.flush_bytes {
            self.flush().await;
        }
    }

    async fn flush(&mut self) {
        if self.buffered_ids.is_empty() {
            return;
        }
        let payload = std::mem::take(&mut self.buffer);
        let ids = std::mem::take(&mut self.buffered_ids);
        let docs = ids.len() as u64;
        let bytes = payload.len() as u64;

        self.counters.request();
        match self.transport.send(payload).await {
            Ok(receipt) => {
                self.counters.flushed(docs, bytes);
                for outcome in receipt.outcomes() {
                    if outcome.is_success() {
                        match outcome.result.as_deref() {
                            Some("created") => self.counters.created(),
                            Some("updated") => self.counters.updated(),
                            _ => self.counters.indexed(),
                        }
                    } else {
                        self.counters.failed(1);
                        warn!(
                            worker = self.id,
                            id = %outcome.id,
                            status = outcome.status,
                            error = ?outcome.error,
                            "💀 cluster rejected a document"
                        );
                    }
                }
                debug!(worker = self.id, docs, bytes, "📡 bulk batch flushed");
            }
            Err(err) => {
                self.counters.failed(docs);
                error!(
                    worker = self.id,
                    docs,
                    first_id = ids.first().map(String::as_str).unwrap_or_default(),
                    last_id = ids.last().map(String::as_str).unwrap_or_default(),
                    error = %format!("{err:#}"),
                    "💀 bulk request failed; this batch was not indexed"
                );
            }
        }
    }
}

impl Worker for FlushWorker {
    fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
