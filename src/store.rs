//! Durable dedup store: the set of article identities that were already
//! posted, persisted as a JSON file across stateless runs.
//!
//! Every flush writes a temp file next to the store and renames it into
//! place, so a crash mid-write leaves the previous file intact. The one
//! remaining gap is the window between a confirmed publish and the flush:
//! if the process dies inside it, the article may be posted once more on a
//! later run. That at-most-duplicate-once risk is accepted; the platform's
//! duplicate-content rejection catches most of those anyway.

use crate::error::StoreError;
use crate::models::{Article, PostRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Upper bound on retained records. The source publishes a handful of
/// articles a day, so this covers weeks of history while keeping the
/// file small.
const MAX_RECORDS: usize = 200;

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PostedLog {
    records: Vec<PostRecord>,
}

/// Identity-set membership service over the posted-articles file.
pub struct PostedStore {
    path: PathBuf,
    log: PostedLog,
    ids: HashSet<String>,
}

impl PostedStore {
    /// Load the store, treating a missing file as an empty store.
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the posted-articles JSON file
    ///
    /// # Returns
    ///
    /// A store backed by `path`, empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// A file that exists but does not parse is fatal: running without
    /// dedup state would risk unbounded duplicate posts.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let log = match fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str::<PostedLog>(&contents).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.display().to_string(),
                        source,
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no posted-articles file found, starting with an empty store");
                PostedLog::default()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let ids = log.records.iter().map(|r| r.id.clone()).collect();
        info!(records = log.records.len(), "loaded posted-articles store");
        Ok(Self { path, log, ids })
    }

    /// Drop every candidate that was already posted.
    ///
    /// # Arguments
    ///
    /// * `candidates` - Articles discovered on the index page, newest first
    ///
    /// # Returns
    ///
    /// The subset not yet recorded, in input order.
    pub fn filter_new(&self, candidates: &[Article]) -> Vec<Article> {
        let new: Vec<Article> = candidates
            .iter()
            .filter(|a| !self.ids.contains(&a.id()))
            .cloned()
            .collect();
        debug!(
            candidates = candidates.len(),
            new = new.len(),
            "filtered candidates against store"
        );
        new
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.log.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.records.is_empty()
    }

    /// Record a confirmed publish and flush. Idempotent: re-marking an
    /// already-recorded article is a no-op.
    ///
    /// Called only after the publisher confirmed success (or the platform
    /// rejected the text as duplicate content, which proves it was posted).
    ///
    /// # Arguments
    ///
    /// * `article` - The article whose publish was just confirmed
    ///
    /// # Errors
    ///
    /// Fails when the store file cannot be written; the caller must treat
    /// that as fatal, because the publish is already live.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub fn mark_posted(&mut self, article: &Article) -> Result<(), StoreError> {
        let id = article.id();
        if !self.ids.insert(id.clone()) {
            debug!(%id, "article already recorded");
            return Ok(());
        }

        self.log.records.push(PostRecord {
            id,
            url: article.url.clone(),
            posted_at: Utc::now(),
        });

        // Retention trim: drop the oldest records beyond the bound.
        if self.log.records.len() > MAX_RECORDS {
            let excess = self.log.records.len() - MAX_RECORDS;
            for dropped in self.log.records.drain(..excess) {
                self.ids.remove(&dropped.id);
            }
        }

        self.flush()
    }

    /// Atomic replace: serialize to a sibling temp file, then rename over
    /// the store. Rename is atomic on the same filesystem, so readers
    /// never observe a truncated file.
    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.log).map_err(|source| {
            StoreError::Corrupt {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        debug!(records = self.log.records.len(), "flushed posted-articles store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn article(url: &str) -> Article {
        Article {
            title: "A headline long enough to pass the filter".to_string(),
            url: url.to_string(),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = PostedStore::load(dir.path().join("posted.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_posted_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");
        let a = article("https://e.com/post/1");

        let mut store = PostedStore::load(&path).unwrap();
        store.mark_posted(&a).unwrap();

        let store = PostedStore::load(&path).unwrap();
        assert!(store.contains(&a.id()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_filter_new_preserves_order_and_excludes_posted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");
        let a = article("https://e.com/post/a");
        let b = article("https://e.com/post/b");
        let c = article("https://e.com/post/c");

        let mut store = PostedStore::load(&path).unwrap();
        store.mark_posted(&a).unwrap();

        let new = store.filter_new(&[a.clone(), b.clone(), c.clone()]);
        let urls: Vec<&str> = new.iter().map(|x| x.url.as_str()).collect();
        assert_eq!(urls, vec!["https://e.com/post/b", "https://e.com/post/c"]);
    }

    #[test]
    fn test_mark_posted_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");
        let a = article("https://e.com/post/1");

        let mut store = PostedStore::load(&path).unwrap();
        store.mark_posted(&a).unwrap();
        store.mark_posted(&a).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_query_string_variant_counts_as_posted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");

        let mut store = PostedStore::load(&path).unwrap();
        store.mark_posted(&article("https://e.com/post/1")).unwrap();

        let variant = article("https://e.com/post/1?utm_source=x");
        assert!(store.filter_new(&[variant]).is_empty());
    }

    #[test]
    fn test_retention_trims_oldest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");

        let mut store = PostedStore::load(&path).unwrap();
        for i in 0..(MAX_RECORDS + 5) {
            store
                .mark_posted(&article(&format!("https://e.com/post/{i}")))
                .unwrap();
        }
        assert_eq!(store.len(), MAX_RECORDS);
        // Oldest dropped, newest retained.
        assert!(!store.contains(&article("https://e.com/post/0").id()));
        let last = format!("https://e.com/post/{}", MAX_RECORDS + 4);
        assert!(store.contains(&article(&last).id()));
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");
        fs::write(&path, "{ not json").unwrap();

        let err = PostedStore::load(&path).err().expect("load should fail");
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_flush_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("posted.json");

        let mut store = PostedStore::load(&path).unwrap();
        store.mark_posted(&article("https://e.com/post/1")).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
