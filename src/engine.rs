//! Caller-facing transfer engine
//!
//! `TransferEngine` ties the pieces together for a rule-execution frontend
//! (CLI, dashboard - both out of scope here): it resolves a rule's two
//! endpoints, dispatches to the right policy, runs batches sequentially, and
//! produces the preview/analysis pair an orchestrator needs before being
//! allowed to execute for real.
//!
//! Rules run strictly sequentially. The resumable state store's durable
//! writes are not designed for concurrent writers, and two rules could
//! otherwise race on the backing file during its read-modify-write cycle.

use tracing::{info, warn};

use crate::address;
use crate::analyzer::{self, AnalysisResult};
use crate::backup;
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::state::StateStore;
use crate::types::{Rule, RuleMode, TransferStats};
use crate::vfs::Vfs;

/// Engine executing transfer rules against one connected device
///
/// Holds the filesystem-access layer, the resumable state store and the
/// preview flag. One engine runs one rule at a time.
pub struct TransferEngine<'a> {
    vfs: &'a dyn Vfs,
    state: StateStore,
    dry_run: bool,
}

impl<'a> TransferEngine<'a> {
    /// Create an engine over an access layer and a state store
    pub fn new(vfs: &'a dyn Vfs, state: StateStore) -> Self {
        TransferEngine {
            vfs,
            state,
            dry_run: false,
        }
    }

    /// Toggle preview mode: no mutating operation is issued when set
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether this engine is in preview mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute one rule against a device rooted at `device_root`
    ///
    /// Resolves both endpoints (the device side through the address scheme,
    /// the desktop side through home/variable expansion) and dispatches on
    /// the rule's mode. Per-file failures end up in the returned statistics;
    /// an `Err` here means the rule itself was unusable.
    pub fn run_rule(&self, rule: &Rule, device_root: &str) -> Result<TransferStats> {
        rule.validate()?;
        let reconciler = Reconciler::new(self.vfs, self.dry_run);

        match rule.mode {
            RuleMode::Copy => {
                let (source, dest) = self.device_to_desktop(rule, device_root);
                reconciler.run_copy(&source, &dest)
            }
            RuleMode::Move => {
                let (source, dest) = self.device_to_desktop(rule, device_root);
                reconciler.run_move(&source, &dest)
            }
            RuleMode::Sync => {
                let source = address::expand_desktop(&rule.source_path)
                    .to_string_lossy()
                    .into_owned();
                let dest = address::resolve(device_root, &rule.dest_path);
                reconciler.run_sync(&source, &dest)
            }
            RuleMode::Backup => {
                let (source, dest) = self.device_to_desktop(rule, device_root);
                backup::run_backup(self.vfs, &self.state, &rule.id, &source, &dest, self.dry_run)
            }
        }
    }

    /// Resolve endpoints for the device-to-desktop modes
    fn device_to_desktop(&self, rule: &Rule, device_root: &str) -> (String, String) {
        let source = address::resolve(device_root, &rule.source_path);
        let dest = address::expand_desktop(&rule.dest_path)
            .to_string_lossy()
            .into_owned();
        (source, dest)
    }

    /// Execute a batch of rules sequentially
    ///
    /// `unattended` skips rules marked `manual_only`. A rule that fails to
    /// run does not abort the batch; its error is kept alongside the
    /// successful runs so the caller can report partial success faithfully.
    pub fn run_rules(
        &self,
        rules: &[Rule],
        device_root: &str,
        unattended: bool,
    ) -> Vec<(Rule, Result<TransferStats>)> {
        let mut runs = Vec::with_capacity(rules.len());
        for rule in rules {
            if unattended && rule.manual_only {
                info!(rule_id = %rule.id, "skipping manual-only rule in unattended run");
                continue;
            }
            let result = self.run_rule(rule, device_root);
            if let Err(err) = &result {
                warn!(rule_id = %rule.id, %err, "rule failed");
            }
            runs.push((rule.clone(), result));
        }
        runs
    }

    /// Preview a batch and audit the outcome
    ///
    /// Runs every rule with `dry_run` forced on, then feeds the resulting
    /// statistics through the safety analyzer. The analysis - not any single
    /// rule's outcome - decides whether an orchestrator may proceed from
    /// preview to execution. Rules that fail to preview are logged and
    /// excluded from the analyzed batch.
    pub fn preview(
        &self,
        rules: &[Rule],
        device_root: &str,
        unattended: bool,
    ) -> (Vec<(Rule, TransferStats)>, AnalysisResult) {
        let preview_engine = TransferEngine {
            vfs: self.vfs,
            state: self.state.clone(),
            dry_run: true,
        };
        let batch: Vec<(Rule, TransferStats)> = preview_engine
            .run_rules(rules, device_root, unattended)
            .into_iter()
            .filter_map(|(rule, result)| match result {
                Ok(stats) => Some((rule, stats)),
                Err(_) => None,
            })
            .collect();
        let analysis = analyzer::analyze(&batch);
        (batch, analysis)
    }
}
