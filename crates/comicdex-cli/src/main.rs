//! 🚀 comicdex-cli: the front door. Parses flags, sets up logging, hands off to the library.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 Two subcommands: `index` pulls every comic into Elasticsearch, `search` asks for
//! some back. Everything interesting lives in the `comicdex` crate. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use comicdex::report;
use comicdex::search::QuerySpec;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 📚 Index every xkcd comic into Elasticsearch, then search it.
#[derive(Debug, Parser)]
#[command(name = "comicdex", version, about)]
struct Cli {
    /// 🔧 TOML config file. Used only if it exists; COMICDEX_* env vars apply either way.
    #[arg(long, short, global = true, default_value = "comicdex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 🚚 Fetch every comic and bulk-index it.
    Index,
    /// 🔎 Run one query against the comic index.
    Search {
        /// How many hits to return. Defaults to `[search] size`.
        #[arg(long, short)]
        size: Option<usize>,
        /// Raw query DSL, e.g. '{"match":{"title":"bobby tables"}}'. Defaults to match_all.
        #[arg(long, short)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion one layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("is unreachable")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like Elasticsearch (or xkcd.com) isn't reachable. \
                Check that the cluster is running and that [elasticsearch] urls point at it. \
                If you're using Docker, `docker ps` shows what's up and \
                `docker compose up -d` resurrects it. ☕"
            );
        }

        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_file = existing_config_file(&cli.config)?;
    let app_config = comicdex::app_config::load_config(config_file).context(
        "💀 Couldn't load the configuration. Take a look at the file and the COMICDEX_* env vars.",
    )?;

    match cli.command {
        Command::Index => {
            let run = comicdex::run_index(app_config).await?;
            println!("{}", report::collect_table(&run.collect));
            println!("{}", report::stats_table(run.stats()));
            if !run.load.skipped.is_empty() {
                println!("⚠️  {} comics skipped before queueing", run.load.skipped.len());
            }
        }
        Command::Search { size, query } => {
            let size = size.unwrap_or(app_config.search.size);
            let spec = match query {
                Some(raw) => {
                    let query: serde_json::Value = serde_json::from_str(&raw)
                        .with_context(|| format!("💀 --query is not valid JSON: {raw}"))?;
                    QuerySpec::new(size, query)
                }
                None => QuerySpec::match_all(size),
            };
            let envelope = comicdex::run_search(&app_config, &spec).await?;
            println!("{}", report::envelope_summary(&envelope));
            println!("{}", report::hits_table(&envelope));
        }
    }
    Ok(())
}

/// 🔒 `Some(path)` if the config file is there, `None` if it isn't. Errors only when we can't tell.
fn existing_config_file(path: &Path) -> anyhow::Result<Option<&Path>> {
    let exists = path.try_exists().with_context(|| {
        format!(
            "💀 Couldn't check whether the config file exists. Maybe a permissions thing, \
             maybe a cwd thing. Was checking here: '{}'",
            path.display()
        )
    })?;
    Ok(exists.then_some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_search_flags_parse() {
        let cli = Cli::try_parse_from(["comicdex", "--config", "x.toml", "search", "--size", "3"])
            .expect("💀 flags should parse");
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Command::Search { size: Some(3), query: None }));
    }

    #[test]
    fn the_one_where_a_missing_config_file_is_just_skipped() -> anyhow::Result<()> {
        let missing = Path::new("definitely/not/here/comicdex.toml");
        assert!(existing_config_file(missing)?.is_none());
        Ok(())
    }

    #[test]
    fn the_one_where_the_cli_definition_holds_together() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
