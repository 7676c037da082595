//! Core data types used throughout the treesync library
//!
//! This module contains the fundamental data structures shared across
//! components:
//!
//! - **Rules**: [`Rule`], [`RuleMode`] - what the user asked the engine to do
//! - **Tree State**: [`TreeEntry`], [`EntryKind`] - filesystem nodes discovered
//!   during a walk
//! - **Results**: [`TransferStats`] - per-run counters and throughput totals
//!
//! Rules are created by rule management (out of scope for this crate) and are
//! read-only to the engine; they are validated once at the load boundary via
//! [`Rule::validate`], not ad hoc at each access site.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{Result, SyncError};
use crate::utils::{format_bytes, format_duration};

/// Transfer policy selected by a rule
///
/// The direction of a transfer is fixed by the mode, not configurable
/// per-rule: `Copy`, `Move` and `Backup` read from the device namespace and
/// write to the desktop; `Sync` mirrors the desktop onto the device, with the
/// desktop as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Copy device files to the desktop, never deleting anything
    Copy,
    /// Copy device files to the desktop, then delete verified copies from
    /// the device
    Move,
    /// Mirror a desktop tree onto the device, deleting extraneous entries
    Sync,
    /// Copy-style transfer whose per-file progress survives restarts
    Backup,
}

impl RuleMode {
    /// Whether this mode is ever allowed to delete entries
    pub fn may_delete(&self) -> bool {
        matches!(self, RuleMode::Move | RuleMode::Sync)
    }
}

impl std::fmt::Display for RuleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuleMode::Copy => "copy",
            RuleMode::Move => "move",
            RuleMode::Sync => "sync",
            RuleMode::Backup => "backup",
        };
        write!(f, "{}", s)
    }
}

/// A user-declared transfer rule
///
/// `source_path` and `dest_path` are namespace-relative: for `Copy`, `Move`
/// and `Backup` the source is a device path and the destination a desktop
/// path; for `Sync` the source is a desktop path and the destination a device
/// path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier (e.g. "r-0001")
    pub id: String,
    /// Transfer policy
    pub mode: RuleMode,
    /// Namespace-relative source path
    pub source_path: String,
    /// Namespace-relative destination path
    pub dest_path: String,
    /// Excluded from unattended runs when set
    #[serde(default)]
    pub manual_only: bool,
}

impl Rule {
    /// Validate required fields once, at the boundary where rules are loaded
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SyncError::invalid_rule("<unnamed>", "empty rule id"));
        }
        if self.source_path.trim().is_empty() {
            return Err(SyncError::invalid_rule(&self.id, "empty source path"));
        }
        if self.dest_path.trim().is_empty() {
            return Err(SyncError::invalid_rule(&self.id, "empty destination path"));
        }
        Ok(())
    }
}

/// Kind of a filesystem node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl EntryKind {
    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }
}

/// One filesystem node discovered by the walker
///
/// Ephemeral: produced per walk, never persisted. The path is relative to
/// the walk root; for a single-level listing it is just the entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the walk root
    pub path: PathBuf,
    /// Node kind
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl TreeEntry {
    /// Final path component as a string
    ///
    /// Walker-produced entries always have a non-empty UTF-8 name; an entry
    /// that somehow lacks one yields an empty string rather than panicking.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Counters and throughput totals for one rule execution
///
/// Owned exclusively by the reconciler during a run and handed to the caller
/// and analyzer afterwards as an immutable snapshot. Every run, dry or real,
/// produces a complete `TransferStats` even in the presence of per-file
/// errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStats {
    /// Files transferred successfully
    pub copied: u64,
    /// Files given a conflict-free destination name
    pub renamed: u64,
    /// Entries deleted (files, plus emptied directories for sync)
    pub deleted: u64,
    /// Files left untouched (unchanged for sync, already-copied for backup)
    pub skipped: u64,
    /// Per-file failures that did not abort the traversal
    pub errors: u64,
    /// Destination directories created
    pub folders: u64,
    /// Bytes transferred
    pub bytes: u64,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
    #[serde(skip)]
    started: Option<Instant>,
}

impl Default for TransferStats {
    fn default() -> Self {
        TransferStats::new()
    }
}

impl TransferStats {
    /// Create a fresh stats record and start its clock
    pub fn new() -> Self {
        TransferStats {
            copied: 0,
            renamed: 0,
            deleted: 0,
            skipped: 0,
            errors: 0,
            folders: 0,
            bytes: 0,
            duration_ms: 0,
            started: Some(Instant::now()),
        }
    }

    /// Record a successful file transfer of `size` bytes
    pub fn record_copied(&mut self, size: u64) {
        self.copied += 1;
        self.bytes += size;
    }

    /// Freeze the elapsed wall time into `duration_ms`
    pub fn finish(&mut self) {
        self.duration_ms = self.elapsed().as_millis() as u64;
    }

    /// Elapsed wall time since the record was created
    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(t) => t.elapsed(),
            None => Duration::from_millis(self.duration_ms),
        }
    }

    /// Average throughput in bytes per second, or 0.0 before any time passed
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes as f64 / secs
    }

    /// Whether the run changed anything at either endpoint
    pub fn has_changes(&self) -> bool {
        self.copied > 0 || self.deleted > 0 || self.renamed > 0
    }

    /// Fold another run's counters into this one (batch totals)
    pub fn merge(&mut self, other: &TransferStats) {
        self.copied += other.copied;
        self.renamed += other.renamed;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.folders += other.folders;
        self.bytes += other.bytes;
        self.duration_ms += other.duration_ms;
    }

    /// One-line human-readable summary for reporting
    pub fn summary_line(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() < 1 {
            return format!("{} files, {}", self.copied, format_bytes(self.bytes));
        }
        format!(
            "{} files, {} in {} (avg {}/s)",
            self.copied,
            format_bytes(self.bytes),
            format_duration(elapsed),
            format_bytes(self.throughput() as u64),
        )
    }
}
