//! LLM summarization with exponential backoff retry logic.
//!
//! The completion endpoint is the least reliable external dependency in
//! the pipeline, so everything here is built to keep its failures local
//! to one article: transient errors are retried with backoff and jitter,
//! an empty response is re-asked once, and anything worse fails just the
//! item at hand.
//!
//! The module uses a trait-based design:
//! - [`CompleteChat`]: one prompt in, one raw completion out
//! - [`OpenRouterClient`]: implements it against the OpenRouter API
//! - [`RetryChat`]: decorator adding retry with exponential backoff
//! - [`Summarizer`]: turns an article into a post-ready [`Summary`]

use crate::error::SummarizeError;
use crate::models::{Article, Summary};
use crate::utils::{MAX_POST_CHARS, WRAPPED_LINK_CHARS, truncate_at_boundary, truncate_for_log};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "mistralai/devstral-small:free";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);
const MAX_COMPLETION_TOKENS: u32 = 300;

/// A cleaned summary shorter than this carries no real information and
/// the headline is used instead.
const MIN_USEFUL_CHARS: usize = 10;

/// One chat completion: prompt in, raw model text out.
pub trait CompleteChat {
    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError>;
}

/// Retry decorator for any [`CompleteChat`] implementation.
///
/// Delay doubles per attempt from `base_delay`, capped at `max_delay`,
/// with 0-250ms of jitter to avoid thundering herd against a shared
/// free-tier endpoint. The backoff budget applies to transport failures
/// only; a response the endpoint returned but that carries no usable
/// text (`Empty`, `Malformed`) is re-asked once and then fails.
pub struct RetryChat<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: CompleteChat> RetryChat<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T: CompleteChat> CompleteChat for RetryChat<T> {
    #[instrument(level = "info", skip_all)]
    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        let mut attempt = 0usize;
        loop {
            let attempt_t0 = Instant::now();
            match self.inner.complete(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    // A well-formed HTTP exchange that yielded no usable
                    // text is not transient the way a 502 or timeout is;
                    // re-ask once, then give up.
                    let budget = match &e {
                        SummarizeError::Empty | SummarizeError::Malformed(_) => 1,
                        _ => self.max_retries,
                    };
                    if attempt > budget {
                        warn!(
                            attempt,
                            max = budget,
                            error = %e,
                            "completion exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rand::rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms = attempt_t0.elapsed().as_millis() as u64,
                        ?delay,
                        error = %e,
                        "completion attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Bearer-authenticated client for the OpenRouter completions endpoint.
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with static config");
        Self { http, api_key }
    }
}

impl CompleteChat for OpenRouterClient {
    #[instrument(level = "info", skip_all)]
    async fn complete(&self, prompt: &str) -> Result<String, SummarizeError> {
        let body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let response = self
            .http
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&text, 300),
            });
        }

        extract_content(&text)
    }
}

/// Pull the generated text out of a completions response body.
pub fn extract_content(body: &str) -> Result<String, SummarizeError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| SummarizeError::Malformed(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(SummarizeError::Empty);
    }
    Ok(content)
}

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[\w/:%#\$&\?\(\)~\.=\+\-]+").unwrap());
static LEAD_IN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(詳細はこちら|続きを読む|詳しくは下記リンクをご覧ください|詳細は以下のリンクから)[\s\S]*").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize raw model output into post text: drop URLs (the link is
/// appended separately), cut boilerplate lead-ins and everything after
/// them, collapse whitespace.
pub fn clean_summary(raw: &str) -> String {
    let no_urls = URL_RE.replace_all(raw, "");
    let no_lead_ins = LEAD_IN_RE.replace_all(&no_urls, "");
    WS_RE.replace_all(&no_lead_ins, " ").trim().to_string()
}

/// Prompt asking for a Japanese post-length summary. The model is told
/// to end on a sentence boundary and leave the URL out; both rules are
/// enforced again in [`clean_summary`] and the length fitting because
/// free-tier models follow instructions loosely.
fn build_prompt(title: &str, content: &str) -> String {
    format!(
        "以下の記事タイトルと内容から、SNSに投稿する魅力的な紹介文を日本語で作成してください。\n\n\
         記事タイトル: {title}\n\
         記事内容: {content}\n\n\
         要件:\n\
         - 最大130文字以内（URLは含めない）\n\
         - 記事の最も重要なポイントを簡潔に伝える\n\
         - 政治的な記事の場合は、関係者の立場や対立点を明確にする\n\
         - 必ず文の最後は「。」で終わるようにする\n\
         - 「詳細はこちら」「続きを読む」などの表現は不要\n\
         - URLは含めない（別途追加されます）"
    )
}

/// Article-to-summary pipeline stage.
pub struct Summarizer<T> {
    chat: T,
}

impl Summarizer<RetryChat<OpenRouterClient>> {
    /// Production wiring: OpenRouter behind 3 retries starting at 1s.
    pub fn openrouter(api_key: String) -> Self {
        Self {
            chat: RetryChat::new(OpenRouterClient::new(api_key), 3, Duration::from_secs(1)),
        }
    }
}

impl<T: CompleteChat> Summarizer<T> {
    pub fn new(chat: T) -> Self {
        Self { chat }
    }

    /// Summarize one article into post-ready text.
    ///
    /// # Arguments
    ///
    /// * `article` - The candidate article being summarized
    /// * `content` - Scraped body text when the fetcher managed to extract
    ///   one; `None` summarizes the title alone, mirroring what the bot
    ///   posts when a page resists scraping
    ///
    /// # Returns
    ///
    /// A [`Summary`] whose text is cleaned of URLs and boilerplate and fits
    /// the post budget with room for the appended link.
    ///
    /// # Errors
    ///
    /// Propagates the completion error once the inner retry budget is
    /// spent; the caller skips just this item.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn summarize(
        &self,
        article: &Article,
        content: Option<&str>,
    ) -> Result<Summary, SummarizeError> {
        let body = content.unwrap_or(&article.title);
        let prompt = build_prompt(&article.title, body);

        let raw = self.chat.complete(&prompt).await?;
        let mut cleaned = clean_summary(&raw);

        // One re-ask when cleanup left nothing; a second empty answer
        // falls back to the headline rather than failing the item.
        if cleaned.chars().count() < MIN_USEFUL_CHARS {
            warn!(
                cleaned = %truncate_for_log(&cleaned, 80),
                "summary too short after cleanup; re-asking once"
            );
            match self.chat.complete(&prompt).await {
                Ok(raw2) => cleaned = clean_summary(&raw2),
                Err(e) => warn!(error = %e, "re-ask failed; falling back to title"),
            }
        }
        if cleaned.chars().count() < MIN_USEFUL_CHARS {
            cleaned = article.title.clone();
        }

        let budget = MAX_POST_CHARS - WRAPPED_LINK_CHARS - 1;
        let fitted = truncate_at_boundary(&cleaned, budget);
        debug!(chars = fitted.chars().count(), "summary ready");
        info!(summary = %truncate_for_log(&fitted, 120), "generated summary");

        Ok(Summary {
            article_id: article.id(),
            text: fitted,
        })
    }
}
