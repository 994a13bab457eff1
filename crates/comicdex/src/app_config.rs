//! 🔧 App Configuration: env vars and an optional TOML file, folded into one struct.
//!
//! 📡 Every key has a default, so an empty environment and no file still gives you a
//! working config pointed at `localhost:9200` and the real xkcd. Whether that is what
//! you wanted is between you and your ops team. 🦆

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::bulk::BulkConfig;
use crate::elasticsearch::ElasticsearchConfig;
use crate::fetcher::SourceConfig;
use crate::search::SearchConfig;

/// 📦 Everything the pipeline and the query client need to know.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 📡 Where the comics come from, and how hard to hit it.
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    #[serde(default)]
    pub bulk: BulkConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// 🚀 Load the config.
///
/// `COMICDEX_*` env vars form the base layer; nested keys use a double underscore
/// (`COMICDEX_BULK__WORKERS=8`). If `config_file_name` is given, the TOML file is merged
/// on top and wins on conflicts. A missing file contributes nothing.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("COMICDEX_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (COMICDEX_*). \
             Somewhere in there is a typo with your name on it.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (COMICDEX_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}
