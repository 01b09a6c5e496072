//! Data models for candidate articles, summaries, and the run report.
//!
//! Article identity is a SHA-1 digest of the normalized URL: query string
//! and fragment are stripped and any trailing slash is trimmed before
//! hashing, so tracking parameters appended by the source do not make an
//! already-posted article look new.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use url::Url;

/// A candidate news article discovered on the source index page.
#[derive(Debug, Clone)]
pub struct Article {
    /// Headline text as it appeared in the index link.
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    /// The source the article was discovered on.
    pub source: String,
}

impl Article {
    /// Stable identity for dedup purposes: SHA-1 hex of the normalized URL.
    pub fn id(&self) -> String {
        article_id(&self.url)
    }
}

/// Compute the dedup identity for an article URL.
///
/// URLs that fail to parse are hashed verbatim; a malformed href still
/// gets a stable identity rather than failing the item.
pub fn article_id(url: &str) -> String {
    let normalized = normalize_url(url);
    let digest = Sha1::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim().to_string(),
    }
}

/// Durable proof that an article was already published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    /// Article identity ([`article_id`] of the URL).
    pub id: String,
    /// Original URL, kept for operator inspection of the store file.
    pub url: String,
    /// When the publish was confirmed.
    pub posted_at: DateTime<Utc>,
}

/// A post-ready summary for one article. Ephemeral; never persisted.
#[derive(Debug, Clone)]
pub struct Summary {
    pub article_id: String,
    pub text: String,
}

/// Per-item outcome folded into the run report.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Published and recorded.
    Posted { tweet_id: String },
    /// Published, but recording it in the store failed. The post is live;
    /// a later run may re-post it once until the store recovers.
    PostedUnrecorded { tweet_id: String },
    /// Platform rejected as duplicate content; recorded to stop retry storms.
    Duplicate,
    /// Item-scoped failure; the article stays unrecorded and may be
    /// retried on a later run.
    Skipped { reason: String },
}

/// Terminal REPORT state of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub candidates: usize,
    pub new_items: usize,
    pub items: Vec<(Article, ItemOutcome)>,
}

impl RunReport {
    pub fn posted(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Posted { .. }))
            .count()
    }

    pub fn posted_unrecorded(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::PostedUnrecorded { .. }))
            .count()
    }

    pub fn duplicates(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Duplicate))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, o)| matches!(o, ItemOutcome::Skipped { .. }))
            .count()
    }
}
