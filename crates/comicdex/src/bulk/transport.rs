//! 📡 Bulk transport: pure I/O, zero buffering.
//!
//! A transport receives a fully rendered NDJSON payload and gets it to the cluster.
//! It does not batch, it does not retry, it does not judge. The flush workers upstream
//! already decided what goes in the payload; this layer only ships it and reads the receipt.
//!
//! 🧠 Knowledge graph:
//! - [`BulkTransport`] trait → [`ElasticsearchTransport`] (prod) and the in-memory one (tests).
//! - [`BulkResponse`] is the receipt: one outcome per document, in request order.
//! - Request-level failures come back as `Err`; per-document failures live inside an `Ok`.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Context;
use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::Method;
use serde::Deserialize;
use tracing::trace;

use crate::elasticsearch::EsClient;

/// 🕳️ Sends one rendered `_bulk` payload.
///
/// `&self`, not `&mut self`: every flush worker shares the same transport.
#[async_trait]
pub trait BulkTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, payload: String) -> anyhow::Result<BulkResponse>;
}

/// 🧾 The `_bulk` receipt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    /// ⚠️ `true` when at least one item failed. The items say which.
    #[serde(default)]
    pub errors: bool,
    /// 📋 One single-key map per document: `{"index": {...}}`.
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItemOutcome>>,
}

impl BulkResponse {
    pub fn outcomes(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().flat_map(|item| item.values())
    }
}

/// 🎯 What happened to one document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkItemOutcome {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkItemOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }
}

/// 📡 `POST /_bulk` with `application/x-ndjson`, optionally gzipped.
#[derive(Debug, Clone)]
pub struct ElasticsearchTransport {
    client: EsClient,
    compress: bool,
}

impl ElasticsearchTransport {
    pub fn new(client: EsClient, compress: bool) -> Self {
        Self { client, compress }
    }
}

fn gzip(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 4), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

#[async_trait]
impl BulkTransport for ElasticsearchTransport {
    async fn send(&self, payload: String) -> anyhow::Result<BulkResponse> {
        let (url, request) = self.client.request(Method::POST, "/_bulk");
        // ⚠️ application/x-ndjson, not application/json. ES gets cranky otherwise.
        let request = request.header("Content-Type", "application/x-ndjson");
        let request = if self.compress {
            let body = gzip(payload.as_bytes())
                .context("💀 gzip choked on a perfectly good bulk payload")?;
            trace!(raw = payload.len(), compressed = body.len(), "🫁 squished bulk payload");
            request.header("Content-Encoding", "gzip").body(body)
        } else {
            request.body(payload)
        };

        let response = request
            .send()
            .await
            .with_context(|| format!("💀 The bulk request to {url} never made it. The network was not vibing with it."))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("💀 {url} answered the bulk request with HTTP {status}: {body}");
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("💀 The bulk receipt from {url} got lost mid-stream"))?;
        serde_json::from_slice(&body)
            .with_context(|| format!("💀 The bulk receipt from {url} is not a bulk receipt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elasticsearch::ElasticsearchConfig;
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    const PAYLOAD: &str = "{\"index\":{\"_index\":\"xkcd\",\"_id\":\"1\"}}\n{\"num\":1}\n";

    fn transport_for(server: &MockServer, compress: bool) -> ElasticsearchTransport {
        let config = ElasticsearchConfig {
            urls: vec![server.uri()],
            ..ElasticsearchConfig::default()
        };
        let client = EsClient::new(&config).expect("💀 client should build");
        ElasticsearchTransport::new(client, compress)
    }

    /// 🫁 Answers 200 only if the body un-gzips back into the expected NDJSON.
    struct GunzipCheck;

    impl Respond for GunzipCheck {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let mut decoded = String::new();
            let ok = GzDecoder::new(request.body.as_slice())
                .read_to_string(&mut decoded)
                .is_ok();
            if ok && decoded == PAYLOAD {
                ResponseTemplate::new(200).set_body_json(json!({
                    "took": 1, "errors": false,
                    "items": [{"index": {"_index": "xkcd", "_id": "1", "status": 201, "result": "created"}}]
                }))
            } else {
                ResponseTemplate::new(400).set_body_string("that was not gzip")
            }
        }
    }

    #[tokio::test]
    async fn the_one_where_the_receipt_lists_every_outcome() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "took": 3,
                "errors": true,
                "items": [
                    {"index": {"_index": "xkcd", "_id": "1", "status": 201, "result": "created"}},
                    {"index": {"_index": "xkcd", "_id": "2", "status": 400,
                               "error": {"type": "mapper_parsing_exception", "reason": "nope"}}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = transport_for(&server, false).send(PAYLOAD.to_string()).await?;
        assert!(receipt.errors);
        let outcomes: Vec<&BulkItemOutcome> = receipt.outcomes().collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_success());
        assert_eq!(outcomes[0].result.as_deref(), Some("created"));
        assert!(!outcomes[1].is_success());
        assert_eq!(outcomes[1].id, "2");
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_cranky_cluster_fails_the_whole_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(ResponseTemplate::new(429).set_body_string("es_rejected_execution_exception"))
            .mount(&server)
            .await;

        let err = transport_for(&server, false)
            .send(PAYLOAD.to_string())
            .await
            .expect_err("💀 a 429 is not a success, no matter how you squint");
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn the_one_where_gzip_bodies_round_trip_through_the_wire() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-encoding", "gzip"))
            .respond_with(GunzipCheck)
            .expect(1)
            .mount(&server)
            .await;

        let receipt = transport_for(&server, true).send(PAYLOAD.to_string()).await?;
        assert_eq!(receipt.outcomes().count(), 1);
        Ok(())
    }
}
