//! Run orchestration: FETCH → DEDUP → (SUMMARIZE → PUBLISH → RECORD)* → REPORT.
//!
//! Failures in SUMMARIZE or PUBLISH are item-scoped: the article is
//! reported as skipped and the loop moves on. Only an authentication
//! failure or a broken store halts the loop, because both would make
//! every remaining item fail identically or unsafely. The REPORT state
//! always runs, fatal or not.
//!
//! Nothing reaches RECORD except a confirmed publish or a
//! duplicate-content rejection, which proves the text is already up.

use crate::api::{CompleteChat, Summarizer};
use crate::error::{FetchError, PublishError, StoreError, SummarizeError};
use crate::models::{Article, ItemOutcome, RunReport, Summary};
use crate::scrapers::georgia::GeorgiaScraper;
use crate::store::PostedStore;
use crate::twitter::Publish;
use crate::utils::compose_post;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Run-scoped failure. Any of these terminates the run early; all are
/// surfaced next to the final report.
#[derive(Debug, Error)]
pub enum RunFatal {
    #[error("source fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("dedup store failed: {0}")]
    Store(#[from] StoreError),

    #[error("authentication failed: {0}")]
    Auth(PublishError),
}

/// Candidate discovery plus per-article body extraction.
pub trait Source {
    async fn fetch_candidates(&self) -> Result<Vec<Article>, FetchError>;
    async fn fetch_article_body(&self, url: &str) -> Result<Option<String>, FetchError>;
}

impl Source for GeorgiaScraper {
    async fn fetch_candidates(&self) -> Result<Vec<Article>, FetchError> {
        GeorgiaScraper::fetch_candidates(self).await
    }

    async fn fetch_article_body(&self, url: &str) -> Result<Option<String>, FetchError> {
        GeorgiaScraper::fetch_article_body(self, url).await
    }
}

/// Summarization seam, so runs can be tested without an LLM endpoint.
pub trait SummarizeItem {
    async fn summarize(
        &self,
        article: &Article,
        content: Option<&str>,
    ) -> Result<Summary, SummarizeError>;
}

impl<T: CompleteChat> SummarizeItem for Summarizer<T> {
    async fn summarize(
        &self,
        article: &Article,
        content: Option<&str>,
    ) -> Result<Summary, SummarizeError> {
        Summarizer::summarize(self, article, content).await
    }
}

/// Everything REPORT needs: the per-item outcomes plus the fatal error
/// that stopped the loop, if any.
pub struct RunOutcome {
    pub report: RunReport,
    pub fatal: Option<RunFatal>,
}

pub struct Pipeline<F, S, P> {
    source: F,
    summarizer: S,
    publisher: P,
    store: PostedStore,
    max_posts: usize,
    deadline: Duration,
    dry_run: bool,
}

/// Article bodies shorter than this carry no more information than the
/// headline does.
const MIN_BODY_CHARS: usize = 50;

impl<F, S, P> Pipeline<F, S, P>
where
    F: Source,
    S: SummarizeItem,
    P: Publish,
{
    pub fn new(
        source: F,
        summarizer: S,
        publisher: P,
        store: PostedStore,
        max_posts: usize,
        deadline: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            source,
            summarizer,
            publisher,
            store,
            max_posts,
            deadline,
            dry_run,
        }
    }

    /// Execute one full run. Always reaches REPORT; a fatal error shows
    /// up in the outcome rather than short-circuiting past it.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&mut self) -> RunOutcome {
        let started = Instant::now();
        let mut report = RunReport::default();

        // FETCH
        let candidates = match self.source.fetch_candidates().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "source fetch failed; ending run");
                return RunOutcome {
                    report,
                    fatal: Some(RunFatal::Fetch(e)),
                };
            }
        };
        report.candidates = candidates.len();

        // DEDUP
        let new_items = self.store.filter_new(&candidates);
        report.new_items = new_items.len();
        info!(
            candidates = report.candidates,
            new = report.new_items,
            "dedup filter applied"
        );

        // Per-item loop, bounded by the post cap and the run deadline.
        let mut fatal = None;
        let mut posted = 0usize;
        for article in new_items {
            if posted >= self.max_posts {
                info!(cap = self.max_posts, "per-run post cap reached");
                break;
            }
            if started.elapsed() >= self.deadline {
                warn!(elapsed = ?started.elapsed(), "run deadline exceeded; stopping early");
                break;
            }

            let budget = self.deadline.saturating_sub(started.elapsed());
            let (outcome, item_fatal) = self.process_item(&article, budget).await;
            if !matches!(outcome, ItemOutcome::Skipped { .. }) {
                posted += 1;
            }
            report.items.push((article, outcome));
            if item_fatal.is_some() {
                fatal = item_fatal;
                break;
            }
        }

        // REPORT
        log_report(&report, fatal.as_ref());
        RunOutcome { report, fatal }
    }

    /// SUMMARIZE → PUBLISH → RECORD for one article. A `Some` second
    /// element means the run must stop after this item; the first element
    /// still describes what actually happened to it, because a store
    /// failure can land after the post is already live.
    async fn process_item(
        &mut self,
        article: &Article,
        budget: Duration,
    ) -> (ItemOutcome, Option<RunFatal>) {
        // Body extraction failure is item-local: the headline still makes
        // an acceptable summary input.
        let body = match self.source.fetch_article_body(&article.url).await {
            Ok(b) => b.filter(|t| t.chars().count() >= MIN_BODY_CHARS),
            Err(e) => {
                warn!(url = %article.url, error = %e, "body fetch failed; summarizing headline only");
                None
            }
        };

        let summary = match self.summarizer.summarize(article, body.as_deref()).await {
            Ok(s) => {
                debug!(article_id = %s.article_id, "summary generated");
                s
            }
            Err(e) => {
                warn!(url = %article.url, error = %e, "summarization failed; skipping item");
                return (
                    ItemOutcome::Skipped {
                        reason: format!("summarize: {e}"),
                    },
                    None,
                );
            }
        };

        let text = compose_post(&summary.text, &article.url);
        if self.dry_run {
            info!(%text, "dry run; not publishing");
            return (
                ItemOutcome::Skipped {
                    reason: "dry run".to_string(),
                },
                None,
            );
        }

        match self.publisher.publish(&text, budget).await {
            Ok(result) => match self.store.mark_posted(article) {
                Ok(()) => (
                    ItemOutcome::Posted {
                        tweet_id: result.id,
                    },
                    None,
                ),
                Err(e) => {
                    error!(url = %article.url, error = %e, "post is live but recording it failed; halting run");
                    (
                        ItemOutcome::PostedUnrecorded {
                            tweet_id: result.id,
                        },
                        Some(RunFatal::Store(e)),
                    )
                }
            },
            Err(PublishError::Duplicate) => {
                // The platform already has this text; record it so the
                // next runs stop retrying.
                warn!(url = %article.url, "platform reports duplicate content; recording as posted");
                match self.store.mark_posted(article) {
                    Ok(()) => (ItemOutcome::Duplicate, None),
                    Err(e) => (ItemOutcome::Duplicate, Some(RunFatal::Store(e))),
                }
            }
            Err(e @ PublishError::Auth { .. }) => {
                error!(error = %e, "authentication failed; halting run");
                let reason = e.to_string();
                (
                    ItemOutcome::Skipped { reason },
                    Some(RunFatal::Auth(e)),
                )
            }
            Err(e) => {
                warn!(url = %article.url, error = %e, "publish failed; skipping item");
                (
                    ItemOutcome::Skipped {
                        reason: format!("publish: {e}"),
                    },
                    None,
                )
            }
        }
    }
}

fn log_report(report: &RunReport, fatal: Option<&RunFatal>) {
    for (article, outcome) in &report.items {
        match outcome {
            ItemOutcome::Posted { tweet_id } => {
                info!(url = %article.url, %tweet_id, "item posted")
            }
            ItemOutcome::PostedUnrecorded { tweet_id } => {
                error!(url = %article.url, %tweet_id, "item posted but not recorded in the store")
            }
            ItemOutcome::Duplicate => {
                info!(url = %article.url, "item already on platform (duplicate)")
            }
            ItemOutcome::Skipped { reason } => {
                warn!(url = %article.url, %reason, "item skipped")
            }
        }
    }
    match fatal {
        Some(e) => error!(
            candidates = report.candidates,
            new = report.new_items,
            posted = report.posted(),
            posted_unrecorded = report.posted_unrecorded(),
            duplicates = report.duplicates(),
            skipped = report.skipped(),
            error = %e,
            "run ended early"
        ),
        None => info!(
            candidates = report.candidates,
            new = report.new_items,
            posted = report.posted(),
            duplicates = report.duplicates(),
            skipped = report.skipped(),
            "run complete"
        ),
    }
}
