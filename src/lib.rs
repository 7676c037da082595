//! # treesync - rule-driven tree reconciliation
//!
//! A reconciliation engine for file trees living in two different storage
//! namespaces: a "device" side reached through a virtual filesystem address
//! space (MTP, GVFS mounts and friends) and a "desktop" side on the local
//! disk. User-declared rules describe what should happen between them; the
//! engine walks both trees, decides what to copy, delete, skip or rename,
//! and audits preview runs before anything destructive executes.
//!
//! ## Policies
//!
//! - **copy** - device to desktop, never deletes anything
//! - **move** - copy, verify, then delete exactly the verified source files
//! - **sync** - mirror a desktop tree onto the device, pruning extras
//! - **backup** - resumable copy whose per-file progress survives restarts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use treesync::{LocalFs, Rule, RuleMode, StateStore, TransferEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vfs = LocalFs::new();
//! let engine = TransferEngine::new(&vfs, StateStore::open_default("treesync")?);
//!
//! let rule = Rule {
//!     id: "r-0001".to_string(),
//!     mode: RuleMode::Copy,
//!     source_path: "/DCIM/Camera".to_string(),
//!     dest_path: "~/Pictures/phone".to_string(),
//!     manual_only: false,
//! };
//!
//! // Preview first; the analysis gates real execution.
//! let (batch, analysis) = engine.preview(
//!     std::slice::from_ref(&rule),
//!     "mtp://[usb:003,009]/",
//!     false,
//! );
//! println!("{}", analysis.summary());
//!
//! if analysis.is_safe() {
//!     let stats = engine.run_rule(&rule, "mtp://[usb:003,009]/")?;
//!     println!("{}", stats.summary_line());
//! }
//! # let _ = batch;
//! # Ok(())
//! # }
//! ```
//!
//! ## Safety model
//!
//! Every policy can run in dry-run mode, where no mutating filesystem call
//! is issued but statistics are produced as if the run had executed. The
//! [`analyzer`] checks those statistics against per-mode invariants (copy
//! must never delete, move must delete exactly what it copied, sync
//! deletions must stay plausible) and one blocker anywhere in a batch
//! withholds permission to execute the whole batch.
//!
//! Transfers are not transactional: partial completion is an expected
//! outcome, surfaced through complete statistics and - for backup rules -
//! through durable per-file resume state, never rolled back.
//!
//! ## Module Organization
//!
//! - [`types`]: rules, tree entries and transfer statistics
//! - [`address`]: device path addressing and desktop path expansion
//! - [`vfs`]: the filesystem-access collaborator interface
//! - [`walker`]: ordered directory traversal
//! - [`resolver`]: destination-name conflict resolution
//! - [`reconciler`]: the copy / move / sync policies
//! - [`state`]: durable resumable-transfer state
//! - [`backup`]: the resumable backup policy
//! - [`analyzer`]: dry-run safety analysis
//! - [`engine`]: caller-facing rule execution surface
//! - [`error`]: error types and handling

pub mod address;
pub mod analyzer;
pub mod backup;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod resolver;
pub mod state;
pub mod types;
pub mod vfs;
pub mod walker;

mod utils;

// Re-export main types for convenience
pub use analyzer::{analyze, AnalysisResult, Issue, Severity};
pub use engine::TransferEngine;
pub use error::{Result, SyncError};
pub use reconciler::Reconciler;
pub use state::{RuleState, RuleStatus, StateStore, TransferFailure};
pub use types::{EntryKind, Rule, RuleMode, TransferStats, TreeEntry};
pub use vfs::{EntryInfo, LocalFs, Vfs};
pub use walker::Walker;
