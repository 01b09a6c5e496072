//! News source scrapers.
//!
//! One source is wired in today. Each scraper follows the same two-phase
//! pattern:
//!
//! 1. **Indexing**: discover candidate articles from the source's index page
//! 2. **Fetching**: download the body text of one selected article
//!
//! Unparsable entries are skipped, never fatal; only a source that cannot
//! be reached at all fails the run for that source.

pub mod georgia;
