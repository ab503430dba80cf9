mod config;
mod error;
mod history;
mod openai;
mod reply;
mod request;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production.
    let dotenv = dotenvy::dotenv();

    init_tracing();
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();
    let addr = cli.bind_addr()?;
    let config = cli.into_config();

    server::start_server(config, addr)
        .await
        .context("chat relay server failed")
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_relay=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
