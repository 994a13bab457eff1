//! 📡 The fetcher: one ID in, one comic out. No retries, no feelings.
//!
//! 🧠 Knowledge graph:
//! - [`ComicFetcher`] is the seam the collector depends on. Tests script it; prod uses HTTP.
//! - [`HttpComicFetcher`] builds `{base_url}/{id}/info.0.json` and decodes the body.
//! - The fetcher has no idea 404 is cursed. [`crate::comic::IdPlan`] keeps it away.
//!
//! ⚠️ Non-2xx is a transport-class failure. A 200 with garbage is a decode failure.
//! Both carry the ID so the log line at 3am tells you which comic ghosted us.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::trace;

use crate::comic::Comic;
use crate::error::FetchError;

/// 🔧 Where the comics live and how patient we are with them.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// 📡 Scheme + host. Comics are at `{base_url}/{id}/info.0.json`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_first_id")]
    pub first_id: u32,
    /// 🔢 Highest ID to fetch. `None` asks `{base_url}/info.0.json` for today's number.
    #[serde(default)]
    pub last_id: Option<u32>,
    /// 🕳️ IDs that are known to never resolve.
    #[serde(default = "default_skip_ids")]
    pub skip_ids: Vec<u32>,
    /// 🚦 Cap on simultaneous fetches. `None` = every ID at once.
    #[serde(default)]
    pub max_in_flight: Option<usize>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

fn default_base_url() -> String {
    "https://xkcd.com".to_string()
}

fn default_first_id() -> u32 {
    1
}

// -- 🕳️ there is no xkcd 404. asking for it gets you a 404. the joke writes itself.
fn default_skip_ids() -> Vec<u32> {
    vec![404]
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_show_progress() -> bool {
    true
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            first_id: default_first_id(),
            last_id: None,
            skip_ids: default_skip_ids(),
            max_in_flight: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            show_progress: default_show_progress(),
        }
    }
}

/// 🦸 Anything that can turn an ID into a [`Comic`].
///
/// # Contract 📜
/// - One call, one network round trip (or one pretend round trip, in tests).
/// - No retries. No caching. No special-casing of any ID.
/// - Errors always report the ID they were asked about.
#[async_trait]
pub trait ComicFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, id: u32) -> Result<Comic, FetchError>;
}

/// 📡 The real thing: reqwest against xkcd (or anything that quacks like it).
#[derive(Debug, Clone)]
pub struct HttpComicFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpComicFetcher {
    pub fn new(config: &SourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("💀 Could not build the HTTP client for the comic source. The TLS stack sends its regrets.")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 🔗 `https://xkcd.com/123/info.0.json` for id 123. Pure template substitution.
    pub fn comic_url(&self, id: u32) -> String {
        format!("{}/{}/info.0.json", self.base_url, id)
    }

    pub fn latest_url(&self) -> String {
        format!("{}/info.0.json", self.base_url)
    }

    /// 🗓️ Today's comic. Its `num` is the highest ID that exists right now.
    pub async fn fetch_latest(&self) -> anyhow::Result<Comic> {
        let url = self.latest_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("💀 Could not ask {url} for the latest comic"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("💀 {url} answered HTTP {status} when asked for the latest comic");
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("💀 The latest comic body from {url} got lost mid-stream"))?;
        serde_json::from_slice(&body)
            .with_context(|| format!("💀 The latest comic from {url} is not shaped like a comic"))
    }
}

#[async_trait]
impl ComicFetcher for HttpComicFetcher {
    async fn fetch(&self, id: u32) -> Result<Comic, FetchError> {
        let url = self.comic_url(id);
        trace!("📡 GET {url}");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Transport { id, url, source }),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { id, url, status });
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => return Err(FetchError::Transport { id, url, source }),
        };

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { id, url, source })
    }
}
