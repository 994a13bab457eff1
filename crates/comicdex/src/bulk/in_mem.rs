//! 📦 A transport that never forgets. Test-only.
//!
//! [`InMemoryTransport`] hoards every payload behind an `Arc<Mutex<...>>` so tests
//! can peek after handing a clone to the indexer. It answers each payload with a
//! receipt that says every document was created, unless told to fail.
//!
//! ⚠️ No network calls. No disk I/O. Just vibes and heap memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::transport::{BulkItemOutcome, BulkResponse, BulkTransport};

#[derive(Debug, Clone)]
pub(crate) struct SentPayload {
    pub(crate) body: String,
    pub(crate) at: Instant,
}

impl SentPayload {
    /// 🔑 `_id`s from the action lines, in payload order.
    pub(crate) fn document_ids(&self) -> Vec<String> {
        self.body
            .lines()
            .step_by(2)
            .filter_map(|action| serde_json::from_str::<serde_json::Value>(action).ok())
            .filter_map(|action| {
                action
                    .as_object()
                    .and_then(|obj| obj.values().next())
                    .and_then(|meta| meta.get("_id"))
                    .and_then(|id| id.as_str().map(str::to_string))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryTransport {
    pub(crate) sent: Arc<Mutex<Vec<SentPayload>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 💀 Every request fails from now on. Useful for proving failures stay contained.
    pub(crate) fn failing() -> Self {
        let transport = Self::default();
        transport.failing.store(true, Ordering::SeqCst);
        transport
    }

    pub(crate) async fn payloads(&self) -> Vec<SentPayload> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl BulkTransport for InMemoryTransport {
    async fn send(&self, payload: String) -> anyhow::Result<BulkResponse> {
        let sent = SentPayload {
            body: payload,
            at: Instant::now(),
        };
        let ids = sent.document_ids();
        self.sent.lock().await.push(sent);

        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("💀 in-memory cluster is having a bad day");
        }

        let items = ids
            .into_iter()
            .map(|id| {
                let outcome = BulkItemOutcome {
                    index: "xkcd".to_string(),
                    id,
                    status: 201,
                    result: Some("created".to_string()),
                    error: None,
                };
                std::iter::once(("index".to_string(), outcome)).collect()
            })
            .collect();

        Ok(BulkResponse {
            took: 0,
            errors: false,
            items,
        })
    }
}
