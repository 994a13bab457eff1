//! 🔎 The read path: one query in, one fully typed envelope out.
//!
//! The `_search` response nests like a set of matryoshka dolls: shards, hits, hits
//! inside hits, and finally the comic itself in `_source`. We decode all of it in one
//! pass. A missing required field fails the whole thing; there is no partial envelope.
//!
//! 🧠 Knowledge graph:
//! - [`QuerySpec`] → JSON body (`{"size": N, "query": {...}}`).
//! - [`SearchClient::search`] → `POST /{index}/_search`.
//! - Non-2xx → [`SearchError::Remote`] carrying whatever error body the cluster sent.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::comic::Comic;
use crate::elasticsearch::EsClient;
use crate::error::SearchError;

/// 🔧 Defaults for the search command.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_size() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
        }
    }
}

/// 📝 The request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    pub size: usize,
    pub query: serde_json::Value,
}

impl QuerySpec {
    /// 🎯 `{"size": N, "query": {"match_all": {}}}`
    pub fn match_all(size: usize) -> Self {
        Self {
            size,
            query: serde_json::json!({ "match_all": {} }),
        }
    }

    pub fn new(size: usize, query: serde_json::Value) -> Self {
        Self { size, query }
    }
}

/// 📬 The whole `_search` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchEnvelope {
    /// ⏱️ Milliseconds the cluster spent.
    pub took: u64,
    pub timed_out: bool,
    #[serde(rename = "_shards")]
    pub shards: ShardStats,
    pub hits: HitsSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ShardStats {
    pub total: u32,
    pub successful: u32,
    pub skipped: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HitsSection {
    pub total: TotalHits,
    /// `null` when the query does not score.
    pub max_score: Option<f64>,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    pub relation: TotalRelation,
}

/// 🔢 Is `value` exact or a floor?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalRelation {
    Eq,
    Gte,
}

impl std::fmt::Display for TotalRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TotalRelation::Eq => f.write_str("eq"),
            TotalRelation::Gte => f.write_str("gte"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    #[serde(rename = "_source")]
    pub source: Comic,
}

/// 🔎 Searches one index.
#[derive(Debug, Clone)]
pub struct SearchClient {
    client: EsClient,
    index: String,
}

impl SearchClient {
    pub fn new(client: EsClient, index: impl Into<String>) -> Self {
        Self {
            client,
            index: index.into(),
        }
    }

    /// 📡 One round trip. No paging, no scrolling, no retry.
    pub async fn search(&self, query: &QuerySpec) -> Result<SearchEnvelope, SearchError> {
        let body = serde_json::to_vec(query).map_err(SearchError::Encode)?;
        let (url, request) = self
            .client
            .request(Method::POST, &format!("/{}/_search", self.index));
        debug!(%url, size = query.size, "🔎 initiating search");

        let response = request
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| SearchError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| SearchError::Transport { url, source })?;

        if !status.is_success() {
            // -- 📜 keep the cluster's own words; fall back to raw text if they aren't JSON
            let error = serde_json::from_slice::<serde_json::Value>(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
            });
            return Err(SearchError::Remote { status, error });
        }

        let envelope: SearchEnvelope = serde_json::from_slice(&bytes).map_err(SearchError::Decode)?;
        info!(
            total = envelope.hits.total.value,
            relation = %envelope.hits.total.relation,
            returned = envelope.hits.hits.len(),
            took_ms = envelope.took,
            "✅ results found"
        );
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comic::sample_comic;
    use crate::elasticsearch::ElasticsearchConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SearchClient {
        let config = ElasticsearchConfig {
            urls: vec![server.uri()],
            ..ElasticsearchConfig::default()
        };
        SearchClient::new(EsClient::new(&config).expect("💀 client should build"), "xkcd")
    }

    fn envelope_json(total: u64, relation: &str, nums: &[u32]) -> serde_json::Value {
        let hits: Vec<serde_json::Value> = nums
            .iter()
            .map(|&n| {
                json!({
                    "_index": "xkcd",
                    "_id": n.to_string(),
                    "_score": 1.0,
                    "_source": sample_comic(n),
                })
            })
            .collect();
        json!({
            "took": 4,
            "timed_out": false,
            "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
            "hits": {
                "total": {"value": total, "relation": relation},
                "max_score": 1.0,
                "hits": hits,
            }
        })
    }

    #[test]
    fn the_one_where_match_all_looks_like_the_docs_say() -> anyhow::Result<()> {
        let body = serde_json::to_value(QuerySpec::match_all(5))?;
        assert_eq!(body, json!({"size": 5, "query": {"match_all": {}}}));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_five_of_three_thousand_come_back_typed() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xkcd/_search"))
            .and(body_json(json!({"size": 5, "query": {"match_all": {}}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope_json(3000, "eq", &[1, 2, 3, 4, 5])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let envelope = client_for(&server).search(&QuerySpec::match_all(5)).await?;

        assert_eq!(envelope.hits.hits.len(), 5);
        assert_eq!(envelope.hits.total.value, 3000);
        assert!(matches!(envelope.hits.total.relation, TotalRelation::Eq | TotalRelation::Gte));
        assert_eq!(envelope.shards.successful, 1);
        assert!(!envelope.timed_out);
        for hit in &envelope.hits.hits {
            assert!((1..=3000).contains(&hit.source.num));
            assert_eq!(hit.id, hit.source.num.to_string());
        }
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_echo_matches_what_was_indexed() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xkcd/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope_json(10_000, "gte", &[327])))
            .mount(&server)
            .await;

        let envelope = client_for(&server)
            .search(&QuerySpec::new(1, json!({"term": {"num": 327}})))
            .await?;

        assert_eq!(envelope.hits.total.relation, TotalRelation::Gte);
        assert_eq!(envelope.hits.hits[0].source, sample_comic(327));
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_the_cluster_complains_in_its_own_words() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xkcd/_search"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"type": "index_not_found_exception", "reason": "no such index [xkcd]"},
                "status": 404
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search(&QuerySpec::match_all(5))
            .await
            .expect_err("💀 a missing index returned results");
        match err {
            SearchError::Remote { status, error } => {
                assert_eq!(status.as_u16(), 404);
                assert_eq!(error["error"]["type"], "index_not_found_exception");
            }
            other => panic!("💀 expected Remote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn the_one_where_a_hollow_envelope_is_a_decode_failure() {
        let server = MockServer::start().await;
        let mut hollow = envelope_json(1, "eq", &[1]);
        hollow["hits"]
            .as_object_mut()
            .expect("hits is an object")
            .remove("total");
        Mock::given(method("POST"))
            .and(path("/xkcd/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(hollow))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search(&QuerySpec::match_all(1))
            .await
            .expect_err("💀 decoded an envelope with no total");
        assert!(matches!(err, SearchError::Decode(_)));
    }

    #[tokio::test]
    async fn the_one_where_a_mangled_source_spoils_the_whole_envelope() {
        let server = MockServer::start().await;
        let mut mangled = envelope_json(1, "eq", &[1]);
        mangled["hits"]["hits"][0]["_source"]["num"] = json!("one");
        Mock::given(method("POST"))
            .and(path("/xkcd/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mangled))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .search(&QuerySpec::match_all(1))
            .await
            .expect_err("💀 'one' decoded as a number");
        assert!(matches!(err, SearchError::Decode(_)));
    }
}
