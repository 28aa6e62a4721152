//! Binary entry point: parse options, open storage, load dictionaries,
//! start the bot, and shut down cleanly on Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reminisce::bot::Bot;
use reminisce::config::Options;
use reminisce::replies::ReplyCatalog;
use reminisce::store::Stores;
use reminisce::telegram::TelegramApi;

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Options::parse();

    let default_level = if opts.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // No storage, no service: a failed open is fatal.
    let stores = Stores::open(&opts.db_path, opts.capacity)
        .with_context(|| format!("failed to open database at {}", opts.db_path.display()))?;

    let catalog = ReplyCatalog::load(&opts.reply_path).with_context(|| {
        format!(
            "failed to load reply dictionaries from {}",
            opts.reply_path.display()
        )
    })?;

    let api = TelegramApi::new(&opts.token)?;
    let bot = Bot::new(Arc::new(opts), stores, catalog, api);

    info!("bot starting");
    tokio::select! {
        result = bot.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            bot.shutdown().await;
            Ok(())
        }
    }
}
