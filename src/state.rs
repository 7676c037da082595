//! Durable per-rule transfer state for resumable backups
//!
//! One JSON document holds the state of every rule that has unfinished work:
//!
//! ```json
//! {
//!   "r-0001": {
//!     "copied": ["DCIM/a.jpg", "DCIM/b.jpg"],
//!     "failed": [{"path": "DCIM/c.jpg", "error": "copy failed"}],
//!     "status": "in_progress",
//!     "last_run": "2026-08-27T10:00:00Z",
//!     "total_files": 120
//!   }
//! }
//! ```
//!
//! There are no other top-level keys; external tools interoperate with this
//! exact shape. The file is rewritten with atomic replace (write temp, then
//! rename) on every mutation — one durable write per transferred file — so a
//! crash loses at most the in-flight file's completion record. A rule that
//! reaches `completed` has its record deleted outright; no stale resumable
//! state lingers for a finished job.
//!
//! The store is designed for sequential, single-process access. Concurrent
//! writers to the same backing file are unsupported.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::utils::atomic_write;

/// File name of the state document inside the state directory
const STATE_FILE: &str = "state.json";

/// Lifecycle status of a resumable job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    /// No progress recorded yet
    New,
    /// Partially transferred; survives process restarts
    InProgress,
    /// All candidates transferred; the record is about to be deleted
    Completed,
}

impl Default for RuleStatus {
    fn default() -> Self {
        RuleStatus::New
    }
}

/// One recorded per-file failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    /// Relative path that failed to transfer
    pub path: String,
    /// Why it failed
    #[serde(default)]
    pub error: String,
}

/// Persisted state of one rule's resumable job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleState {
    /// Relative paths already transferred; monotonically non-decreasing
    /// within one logical job
    #[serde(default)]
    pub copied: BTreeSet<String>,
    /// Per-file failures recorded during the job
    #[serde(default)]
    pub failed: Vec<TransferFailure>,
    /// Job status
    #[serde(default)]
    pub status: RuleStatus,
    /// Timestamp of the most recent state mutation
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Candidate file count at job start
    #[serde(default)]
    pub total_files: u64,
}

impl RuleState {
    /// Candidate paths not yet transferred, in candidate order
    pub fn remaining(&self, candidates: &[String]) -> Vec<String> {
        candidates
            .iter()
            .filter(|path| !self.copied.contains(*path))
            .cloned()
            .collect()
    }

    /// Whether this state represents a job worth resuming
    pub fn has_progress(&self) -> bool {
        !self.copied.is_empty() || self.status == RuleStatus::InProgress
    }

    /// Human-readable progress line
    pub fn summary(&self) -> String {
        let copied = self.copied.len();
        let failed = self.failed.len();
        if copied == 0 {
            return "No previous progress".to_string();
        }
        if self.total_files > 0 {
            let percent = copied as f64 / self.total_files as f64 * 100.0;
            format!(
                "{}/{} files ({:.1}%) - {} failed",
                copied, self.total_files, percent, failed
            )
        } else {
            format!("{} files copied - {} failed", copied, failed)
        }
    }
}

/// Store for per-rule resumable state, backed by one JSON file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given state directory
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        StateStore {
            path: state_dir.as_ref().join(STATE_FILE),
        }
    }

    /// Create a store under the platform's application-state directory
    pub fn open_default(app_name: &str) -> Result<Self> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| SyncError::state_store("no application-state directory available"))?;
        Ok(StateStore::new(base.join(app_name)))
    }

    /// Path of the backing state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state for one rule; absent rules read as a fresh default
    pub fn load_rule(&self, rule_id: &str) -> RuleState {
        self.load_all().remove(rule_id).unwrap_or_default()
    }

    /// Persist one rule's state, stamping `last_run`
    pub fn save_rule(&self, rule_id: &str, state: &RuleState) -> Result<()> {
        let mut all = self.load_all();
        let mut record = state.clone();
        record.last_run = Some(Utc::now());
        all.insert(rule_id.to_string(), record);
        self.save_all(&all)
    }

    /// Record a single transferred file and advance status to `in_progress`
    ///
    /// This is the per-file durable write: once it returns, that file's
    /// completion survives a crash.
    pub fn mark_copied(&self, rule_id: &str, relative_path: &str) -> Result<()> {
        let mut state = self.load_rule(rule_id);
        state.copied.insert(relative_path.to_string());
        state.status = RuleStatus::InProgress;
        self.save_rule(rule_id, &state)
    }

    /// Record a per-file failure without advancing status past `in_progress`
    pub fn mark_failed(&self, rule_id: &str, relative_path: &str, error: &str) -> Result<()> {
        let mut state = self.load_rule(rule_id);
        let failure = TransferFailure {
            path: relative_path.to_string(),
            error: error.to_string(),
        };
        if !state.failed.contains(&failure) {
            state.failed.push(failure);
        }
        state.status = RuleStatus::InProgress;
        self.save_rule(rule_id, &state)
    }

    /// Mark a rule completed by deleting its record
    ///
    /// A finished job leaves no state behind; a later run starts fresh.
    pub fn clear_rule(&self, rule_id: &str) -> Result<()> {
        let mut all = self.load_all();
        if all.remove(rule_id).is_some() {
            debug!(rule_id, "clearing completed rule state");
            self.save_all(&all)?;
        }
        Ok(())
    }

    /// Whether a rule has resumable progress recorded
    pub fn has_resume_state(&self, rule_id: &str) -> bool {
        self.load_rule(rule_id).has_progress()
    }

    /// Load the whole state document
    ///
    /// A missing file reads as empty. A corrupt file also reads as empty:
    /// losing resume progress is preferable to refusing to run, and the
    /// discarded parse error is surfaced as a warning.
    pub fn load_all(&self) -> BTreeMap<String, RuleState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(all) => all,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "state file corrupt, starting over");
                BTreeMap::new()
            }
        }
    }

    fn save_all(&self, all: &BTreeMap<String, RuleState>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let bytes = serde_json::to_vec_pretty(all)?;
        atomic_write(&self.path, &bytes)
    }
}
