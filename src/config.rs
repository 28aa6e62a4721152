//! Command-line options.
//!
//! One flat struct shared by every component that needs a knob. The watcher
//! reads the admission bounds and the idle/window settings, the stores read
//! the capacity and database path, and main reads the rest.

use clap::Parser;
use std::path::PathBuf;

/// Runtime options for the bot.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "reminisce",
    about = "Remembers chat messages and resurfaces one after a lull"
)]
pub struct Options {
    /// Minimal message length eligible for recording (in words).
    #[arg(long, default_value_t = 4)]
    pub min_words: usize,

    /// Maximal message length eligible for recording (in words).
    #[arg(long, default_value_t = 65_535)]
    pub max_words: usize,

    /// How long a chat must stay quiet before a recall is considered
    /// (in minutes).
    #[arg(long, short = 't', default_value_t = 10)]
    pub timeout: i64,

    /// First hour of the daily window in which recalls may fire (0-23).
    #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub hour_start: u32,

    /// First hour past the daily recall window (0-23). At this hour and
    /// later no recall fires.
    #[arg(long, default_value_t = 23, value_parser = clap::value_parser!(u32).range(0..=23))]
    pub hour_end: u32,

    /// How many messages to remember per chat.
    #[arg(long, short = 'c', default_value_t = 2048)]
    pub capacity: usize,

    /// Path to the embedded database.
    #[arg(long, short = 'd', default_value = "./db")]
    pub db_path: PathBuf,

    /// Path to the directory with reply phrase dictionaries.
    #[arg(long, short = 'r', default_value = "./replies")]
    pub reply_path: PathBuf,

    /// Verbose logging (debug level unless RUST_LOG overrides it).
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Bot token from @BotFather.
    #[arg(env = "RECALL_BOT_TOKEN")]
    pub token: String,
}

// ── Tests ───────────────────────────────────────────────────────
