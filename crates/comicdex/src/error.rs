//! 💀 Error types: the many flavors of "that didn't work".
//!
//! 🧠 Knowledge graph:
//! - [`FetchError`]: one comic failed to arrive. Isolated. The collector logs it and moves on.
//! - [`ConnectError`]: the cluster would not shake hands. Fatal, and raised BEFORE any fetching.
//! - [`BulkError`]: the batching sink. `Item` is shrug-and-skip, `Construction`/`Close` end the run.
//! - [`SearchError`]: the read path. Single shot, so everything propagates.
//!
//! Everything above the component seams is `anyhow` with context strings.

use reqwest::StatusCode;
use thiserror::Error;

/// 📡 A single comic fetch that went sideways. Always carries the offending ID.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("💀 comic #{id}: request to {url} never completed")]
    Transport {
        id: u32,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("💀 comic #{id}: {url} answered HTTP {status}")]
    Status {
        id: u32,
        url: String,
        status: StatusCode,
    },
    #[error("💀 comic #{id}: body from {url} is not a comic")]
    Decode {
        id: u32,
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn id(&self) -> u32 {
        match self {
            FetchError::Transport { id, .. }
            | FetchError::Status { id, .. }
            | FetchError::Decode { id, .. } => *id,
        }
    }

    /// 🔌 Network-class failure (no response, or a non-2xx one).
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. } | FetchError::Status { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode { .. })
    }
}

/// 🤝 The cluster handshake failed. Nothing gets fetched after this.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("💀 no Elasticsearch urls configured; give us at least one node to talk to")]
    NoNodes,
    #[error("💀 the HTTP client refused to be born")]
    Client(#[source] reqwest::Error),
    #[error("💀 Elasticsearch at {url} is unreachable")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("💀 Elasticsearch at {url} rejected the handshake with HTTP {status}: {body}")]
    Rejected {
        url: String,
        status: StatusCode,
        body: String,
    },
}

/// 🚰 Batching sink failures.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("💀 bulk indexer could not be constructed: {0}")]
    Construction(String),
    #[error("⚠️ document {document_id} was not queued: {reason}")]
    Item { document_id: String, reason: String },
    #[error("💀 bulk worker {worker} did not shut down cleanly")]
    Close {
        worker: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// 🔎 Query failures. The read path has no partial results to salvage.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("💀 could not encode the query")]
    Encode(#[source] serde_json::Error),
    #[error("💀 search request to {url} never completed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("💀 Elasticsearch reported HTTP {status} for the search: {error}")]
    Remote {
        status: StatusCode,
        error: serde_json::Value,
    },
    #[error("💀 search response did not match the expected envelope")]
    Decode(#[source] serde_json::Error),
}
