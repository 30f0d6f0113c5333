use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use koeln_presse::api::{self, ItemResponse};
use koeln_presse::{Config, FeedStore, HttpFeedSource, QueryEngine};

#[derive(Parser, Debug)]
#[command(
    name = "koeln-presse",
    version,
    about = "Press releases of the city of Cologne as a cached JSON API"
)]
struct Args {
    /// Config file (default: ~/.config/koeln-presse/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Listen address, overrides config and HOST
        #[arg(long)]
        host: Option<String>,
        /// Listen port, overrides config and PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the newest press releases
    Latest {
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
    /// Search press releases
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a single press release
    Get { id: String },
    /// List all categories
    Categories,
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let mut config = match path.or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from '{}'", path.display()))?,
        None => Config::default(),
    };
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment override")?;
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config(args.config)?;

    let source = HttpFeedSource::new(config.feed.url.clone(), config.http_timeout())
        .context("Failed to build HTTP client")?;
    tracing::debug!(url = %source.url(), "Using press feed");
    let engine = QueryEngine::new(FeedStore::new(source, config.store_settings()));

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = config.listen_addr()?;
            api::run_server(addr, engine)
                .await
                .context("HTTP server failed")?;
        }
        Command::Latest { n } => {
            let items = engine.latest(n).await?;
            print_json(&items.iter().map(ItemResponse::from).collect::<Vec<_>>())?;
        }
        Command::Search { query, limit } => {
            let items = engine.search(&query, limit).await?;
            print_json(&items.iter().map(ItemResponse::from).collect::<Vec<_>>())?;
        }
        Command::Get { id } => match engine.get_by_id(&id).await? {
            Some(item) => print_json(&ItemResponse::from(&item))?,
            None => anyhow::bail!("Press item not found: {id}"),
        },
        Command::Categories => {
            print_json(&engine.list_categories().await?)?;
        }
    }

    Ok(())
}
