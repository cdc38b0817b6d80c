//! Cached history of past root decompositions
//!
//! A bounded, deduplicated, most-recent-first list of prior analyses,
//! persisted write-through as a single JSON blob so a past solution can be
//! restored instantly without re-calling the service. Only the root step
//! list is cached; substep expansions are cheap to refetch and are not
//! persisted.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::tree::StepContent;

/// Maximum number of entries kept; oldest beyond this are evicted
pub const HISTORY_CAP: usize = 20;

/// A cached prior root decomposition, keyed by the original query text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Creation timestamp in unix millis, adjusted to be strictly monotonic
    pub id: i64,
    /// The originally submitted solution text (exact-match dedup key)
    pub query: String,
    /// When the entry was recorded
    pub created_at: DateTime<Utc>,
    /// The full fetched step list, enough to rebuild the tree without the service
    pub root_steps: Vec<StepContent>,
}

/// Persisted, bounded history of past analyses
///
/// Sole writer of its file. Loads once at startup; every successful
/// [`record`] persists immediately. Concurrent processes sharing one file can
/// lose updates; single-process use is the design point.
///
/// [`record`]: HistoryStore::record
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    cap: usize,
}

impl HistoryStore {
    /// Create an empty store that will persist to the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            cap: HISTORY_CAP,
        }
    }

    /// Open a store, reading any persisted entries
    ///
    /// Fails soft: a missing file or malformed blob yields an empty store
    /// with a warning, never an error.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);

        match fs::read_to_string(&store.path).await {
            Ok(content) => match serde_json::from_str::<Vec<HistoryEntry>>(&content) {
                Ok(entries) => {
                    debug!(count = entries.len(), path = ?store.path, "load: history read");
                    store.entries = entries;
                    store.entries.truncate(store.cap);
                }
                Err(e) => {
                    warn!(error = %e, path = ?store.path, "load: corrupt history blob, starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?store.path, "load: no history file yet");
            }
            Err(e) => {
                warn!(error = %e, path = ?store.path, "load: failed to read history, starting empty");
            }
        }

        store
    }

    /// Insert-or-replace an analysis by exact query match
    ///
    /// The entry moves to the front (most recent first); anything beyond the
    /// cap is evicted; the file is rewritten before returning.
    pub async fn record(&mut self, query: &str, root_steps: Vec<StepContent>) -> Result<&[HistoryEntry]> {
        self.entries.retain(|e| e.query != query);

        let now = Utc::now();
        let entry = HistoryEntry {
            id: self.next_id(now.timestamp_millis()),
            query: query.to_string(),
            created_at: now,
            root_steps,
        };

        self.entries.insert(0, entry);
        self.entries.truncate(self.cap);
        self.persist().await?;

        debug!(count = self.entries.len(), "record: history updated");
        Ok(&self.entries)
    }

    /// Monotonic id token: bumps past the newest existing id when two
    /// recordings land in the same millisecond
    fn next_id(&self, now_ms: i64) -> i64 {
        match self.entries.iter().map(|e| e.id).max() {
            Some(max) if now_ms <= max => max + 1,
            _ => now_ms,
        }
    }

    /// All entries, most recent first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Look up an entry by id
    pub fn find(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries and persist the empty list
    pub async fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.persist().await
    }

    /// Rewrite the blob with the current entry list
    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create history directory")?;
        }

        let blob = serde_json::to_string_pretty(&self.entries).context("Failed to serialize history")?;
        fs::write(&self.path, blob)
            .await
            .context("Failed to write history file")?;

        Ok(())
    }
}
