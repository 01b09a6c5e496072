//! Command-line interface for the bot.
//!
//! Every option can also come from the environment, which is how the
//! scheduled runner configures the bot without a wrapper script.

use clap::Parser;

/// One scheduled run: fetch candidates, summarize new ones, post them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the posted-articles store file
    #[arg(short, long, env = "POSTED_STORE_PATH", default_value = "posted_articles.json")]
    pub store_path: String,

    /// Maximum articles to post in a single run
    #[arg(long, env = "MAX_POSTS_PER_RUN", default_value_t = 3)]
    pub max_posts: usize,

    /// Wall-clock budget for the whole run, in seconds
    #[arg(long, env = "RUN_DEADLINE_SECS", default_value_t = 600)]
    pub deadline_secs: u64,

    /// Summarize and compose posts but do not publish or record anything
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// News source index page to scrape
    #[arg(
        long,
        env = "NEWS_SOURCE_URL",
        default_value = "https://www.georgia-news-japan.online/"
    )]
    pub source_url: String,
}
