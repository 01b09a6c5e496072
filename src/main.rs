//! # Georgia News Bot
//!
//! A scheduled bot that discovers Georgia-related news articles, summarizes
//! each one through an LLM completion API, and posts the summary to X —
//! without ever posting the same article twice across independent,
//! stateless invocations.
//!
//! ## Pipeline
//!
//! 1. **Fetch**: scrape candidate articles from the news source index page
//! 2. **Dedup**: drop candidates already recorded in the posted-articles store
//! 3. **Summarize**: generate a post-length Japanese summary via OpenRouter
//! 4. **Publish**: OAuth1-signed post to the X API
//! 5. **Record**: persist the article identity only after a confirmed publish
//! 6. **Report**: log posted/duplicate/skipped counts with per-item reasons
//!
//! ## Usage
//!
//! ```sh
//! georgia_news_bot --store-path ./posted_articles.json --max-posts 1
//! ```
//!
//! Credentials come from the environment: `X_API_KEY`, `X_API_SECRET`,
//! `X_ACCESS_TOKEN`, `X_ACCESS_SECRET`, `OPENROUTER_API_KEY`. A missing
//! credential is a fatal startup error.
//!
//! Exit code is 0 whenever the run reached its final report, even with
//! per-item skips; non-zero means a fatal startup, store, fetch, or
//! authentication failure.

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod models;
mod oauth;
mod run;
mod scrapers;
mod store;
mod twitter;
mod utils;

use api::Summarizer;
use cli::Cli;
use config::Credentials;
use oauth::OAuth1;
use run::Pipeline;
use scrapers::georgia::GeorgiaScraper;
use store::PostedStore;
use twitter::TwitterPublisher;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("georgia_news_bot starting up");

    let args = Cli::parse();
    debug!(?args, "parsed CLI arguments");

    match run_once(args).await {
        Ok(true) => {
            info!(elapsed = ?start_time.elapsed(), "run complete");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            error!(elapsed = ?start_time.elapsed(), "run ended with a fatal error");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

/// Build the pipeline and execute one run. `Ok(true)` means the run
/// reached its report without a run-scoped failure.
async fn run_once(args: Cli) -> Result<bool, Box<dyn Error>> {
    // Fail fast on missing credentials, before any network traffic.
    let credentials = Credentials::from_env()?;

    let store = PostedStore::load(&args.store_path)?;
    let source = GeorgiaScraper::new(&args.source_url)?;
    let summarizer = Summarizer::openrouter(credentials.openrouter_api_key.clone());
    let signer = OAuth1::new(
        credentials.api_key,
        credentials.api_secret,
        credentials.access_token,
        credentials.access_secret,
    );
    let publisher = TwitterPublisher::new(signer);

    let mut pipeline = Pipeline::new(
        source,
        summarizer,
        publisher,
        store,
        args.max_posts,
        Duration::from_secs(args.deadline_secs),
        args.dry_run,
    );

    let outcome = pipeline.run().await;
    Ok(outcome.fatal.is_none())
}
