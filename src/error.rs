//! Failure taxonomy for the pipeline.
//!
//! Errors are split by scope: item-scoped failures ([`SummarizeError`],
//! most [`PublishError`] variants) skip one article and let the run
//! continue, while run-scoped failures ([`FetchError`], [`StoreError`],
//! [`PublishError::Auth`]) terminate the run early.

use thiserror::Error;

/// Source page could not be fetched or parsed. Fails the run for this
/// source; individual unparsable entries are skipped without raising this.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("source returned HTTP {status}")]
    Status { status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Summarization failed for a single article. Always item-scoped.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    Malformed(String),

    #[error("model returned an empty summary")]
    Empty,
}

/// Publishing failed. `Auth` is fatal for the whole run; `RateLimited`
/// is retried a bounded number of times then skipped; `Duplicate` is
/// treated as success-equivalent by the orchestrator.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("authentication rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("rate limited by the platform")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("platform rejected the post as duplicate content")]
    Duplicate,

    #[error("platform returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The dedup store could not be read or written. Fatal: without the
/// store, duplicate-post risk is unbounded.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
