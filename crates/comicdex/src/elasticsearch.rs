//! # 📡 THE ELASTICSEARCH CLIENT
//!
//! 🚀 One `reqwest::Client`, a ring of node URLs, and an auth header. That's it.
//! The bulk transport and the search client both borrow this thing to talk to the cluster.
//!
//! 🧠 Knowledge graph:
//! - [`EsClient::connect`] = build + ping. If the ping fails, nothing else happens.
//!   No comics get fetched into a void that can't be indexed.
//! - 🔒 Auth priority: API key wins over basic auth. This is not a democracy.
//! - 🔄 Multiple `urls` are rotated round-robin, one node per request.
//!
//! ⚠️ No retries live here. Retries are the caller's problem, and the caller declined.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConnectError;

/// 🔧 How to reach the cluster and which index the comics call home.
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    /// 📡 One or more node URLs, scheme + port included.
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
    /// 🔒 Basic auth username. Ignored when `api_key` is set.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key. The velvet rope variant of authentication.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 📦 Target index for writes and searches.
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_urls() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_index() -> String {
    "xkcd".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
            username: None,
            password: None,
            api_key: None,
            index: default_index(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone)]
enum Auth {
    Anonymous,
    Basic {
        username: String,
        password: Option<String>,
    },
    ApiKey(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🔒 never print secrets, not even in debug output at 3am
        match self {
            Auth::Anonymous => f.write_str("Anonymous"),
            Auth::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Auth::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

impl Auth {
    fn from_config(config: &ElasticsearchConfig) -> Self {
        if let Some(api_key) = &config.api_key {
            Auth::ApiKey(api_key.clone())
        } else if let Some(username) = &config.username {
            Auth::Basic {
                username: username.clone(),
                password: config.password.clone(),
            }
        } else {
            Auth::Anonymous
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::Anonymous => request,
            Auth::Basic { username, password } => request.basic_auth(username, password.as_ref()),
            Auth::ApiKey(key) => request.header("Authorization", format!("ApiKey {key}")),
        }
    }
}

/// 📡 A cheap-to-clone handle on the cluster.
#[derive(Debug, Clone)]
pub struct EsClient {
    http: reqwest::Client,
    nodes: Arc<[String]>,
    cursor: Arc<AtomicUsize>,
    auth: Auth,
}

impl EsClient {
    /// 🏗️ Build the client without touching the network.
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, ConnectError> {
        let nodes: Vec<String> = config
            .urls
            .iter()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .collect();
        if nodes.is_empty() {
            return Err(ConnectError::NoNodes);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ConnectError::Client)?;

        Ok(Self {
            http,
            nodes: nodes.into(),
            cursor: Arc::new(AtomicUsize::new(0)),
            auth: Auth::from_config(config),
        })
    }

    /// 🤝 Build, then say hello. Bad URL, bad credentials, sleeping cluster: all fail here.
    pub async fn connect(config: &ElasticsearchConfig) -> Result<Self, ConnectError> {
        let client = Self::new(config)?;
        client.ping().await?;
        Ok(client)
    }

    /// 📡 `GET /` on the next node. Anything but 2xx is a rejection.
    pub async fn ping(&self) -> Result<(), ConnectError> {
        let (url, request) = self.request(Method::GET, "/");
        let response = request
            .send()
            .await
            .map_err(|source| ConnectError::Unreachable {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::Rejected { url, status, body });
        }

        info!(%url, "✅ Elasticsearch answered the handshake");
        Ok(())
    }

    /// 🔄 Pick the next node and build an authenticated request for `path`.
    ///
    /// Returns the full URL alongside the builder so errors can name it.
    pub(crate) fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let url = format!("{}/{}", self.next_node(), path.trim_start_matches('/'));
        debug!(%method, %url, "📡 preparing request");
        let request = self.auth.apply(self.http.request(method, &url));
        (url, request)
    }

    fn next_node(&self) -> &str {
        let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        &self.nodes[slot]
    }
}
