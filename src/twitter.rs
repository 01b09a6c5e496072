//! Posting to the social platform with OAuth1-signed requests.
//!
//! Failure classes drive the orchestrator's control flow: `Auth` aborts
//! the run (every later publish would fail the same way), `RateLimited`
//! gets a bounded in-run retry and then skips the item, and `Duplicate`
//! is success-equivalent because it proves the text is already up.

use crate::error::PublishError;
use crate::oauth::OAuth1;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

const TWEETS_URL: &str = "https://api.twitter.com/2/tweets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Total attempts for one post when the platform asks us to slow down.
const MAX_ATTEMPTS: usize = 3;

/// Never sleep longer than this on a rate limit; the platform's 15-minute
/// windows do not fit inside a run deadline, so long waits become skips.
/// The caller's remaining budget clamps the wait further.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// Confirmation of a successful publish.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub id: String,
}

/// Seam between the orchestrator and the platform client.
///
/// `budget` is the wall-clock time the caller can still afford to spend
/// on this one post; rate-limit waits never exceed it.
pub trait Publish {
    async fn publish(&self, text: &str, budget: Duration) -> Result<PublishResult, PublishError>;
}

/// OAuth1-signing client for the v2 tweets endpoint.
pub struct TwitterPublisher {
    http: Client,
    signer: OAuth1,
}

impl TwitterPublisher {
    pub fn new(signer: OAuth1) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with static config");
        Self { http, signer }
    }

    async fn attempt(&self, text: &str) -> Result<PublishResult, PublishError> {
        // The JSON body is not part of the OAuth1 signature; only the
        // method and URL are signed for this endpoint.
        let authorization = self.signer.authorization_header("POST", TWEETS_URL, &[]);

        let response = self
            .http
            .post(TWEETS_URL)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response.text().await?;

        classify_response(status, retry_after, &body)
    }
}

impl Publish for TwitterPublisher {
    #[instrument(level = "info", skip_all, fields(chars = text.chars().count()))]
    async fn publish(&self, text: &str, budget: Duration) -> Result<PublishResult, PublishError> {
        let started = Instant::now();
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            match self.attempt(text).await {
                Ok(result) => {
                    info!(tweet_id = %result.id, "post published");
                    return Ok(result);
                }
                Err(PublishError::RateLimited { retry_after_secs }) if attempt < MAX_ATTEMPTS => {
                    let remaining = budget.saturating_sub(started.elapsed());
                    match rate_limit_wait(retry_after_secs, remaining) {
                        Some(wait) => {
                            warn!(attempt, ?wait, "rate limited; backing off before retry");
                            sleep(wait).await;
                        }
                        None => {
                            warn!(attempt, ?remaining, "rate limited with no time left to wait");
                            return Err(PublishError::RateLimited { retry_after_secs });
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// How long to wait out a rate limit, if it fits the remaining budget.
/// `None` means the wait cannot complete in time and the item is skipped.
fn rate_limit_wait(retry_after_secs: Option<u64>, remaining: Duration) -> Option<Duration> {
    let wait = retry_after_secs
        .map(Duration::from_secs)
        .unwrap_or(MAX_RATE_LIMIT_WAIT)
        .min(MAX_RATE_LIMIT_WAIT);
    (wait <= remaining).then_some(wait)
}

#[derive(Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

/// Map a platform response onto the publish failure taxonomy.
pub fn classify_response(
    status: u16,
    retry_after_secs: Option<u64>,
    body: &str,
) -> Result<PublishResult, PublishError> {
    match status {
        200 | 201 => match serde_json::from_str::<TweetResponse>(body) {
            Ok(parsed) => Ok(PublishResult { id: parsed.data.id }),
            Err(_) => Err(PublishError::Api {
                status,
                body: truncate_for_log(body, 300),
            }),
        },
        403 if body.to_lowercase().contains("duplicate content") => Err(PublishError::Duplicate),
        401 | 403 => Err(PublishError::Auth {
            status,
            body: truncate_for_log(body, 300),
        }),
        429 => Err(PublishError::RateLimited { retry_after_secs }),
        _ => Err(PublishError::Api {
            status,
            body: truncate_for_log(body, 300),
        }),
    }
}
