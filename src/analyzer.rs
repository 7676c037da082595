//! Dry-run safety analysis
//!
//! Independently audits the statistics a preview run produced against
//! mode-specific invariants, before anything destructive executes. The
//! analyzer is a pure function over `(Rule, TransferStats)` pairs: no run
//! history, no hidden state, identical input yields identical findings.
//!
//! Findings come in three severities. A **blocker** is strong enough to
//! withhold permission to execute the previewed batch for real; **warnings**
//! flag suspicious but not invariant-breaking shapes; **info** records runs
//! that would change nothing. `is_safe` gates on the whole batch: one
//! blocker anywhere withholds execution for everything, because the batch
//! was previewed as a unit.

use serde::{Deserialize, Serialize};

use crate::types::{Rule, RuleMode, TransferStats};

/// Warn when a non-sync rule would delete more than this many files
const LARGE_DELETE_COUNT: u64 = 100;
/// Warn on any rule deleting more than this while copying almost nothing
const MASS_DELETE_THRESHOLD: u64 = 1000;
/// "Almost nothing" for the mass-deletion check
const MASS_DELETE_MIN_COPIED: u64 = 100;
/// Sync warning: deleting this many times more than copying
const SYNC_DELETE_RATIO: u64 = 5;
/// Sync warning: absolute deletion count
const SYNC_LARGE_DELETE: u64 = 500;

/// Severity of an analysis finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Withholds permission to execute the previewed batch
    Blocker,
    /// Suspicious but not invariant-breaking
    Warning,
    /// A run that would change nothing
    Info,
}

/// One analysis finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Finding severity
    pub severity: Severity,
    /// Rule the finding applies to
    pub rule_id: String,
    /// Mode of that rule
    pub mode: RuleMode,
    /// Human-readable explanation
    pub message: String,
}

/// Findings for one analyzed batch, grouped by severity
///
/// Ephemeral and derived purely from the batch; lists preserve the order in
/// which findings fired.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Findings that withhold execution
    pub blockers: Vec<Issue>,
    /// Suspicious findings
    pub warnings: Vec<Issue>,
    /// Informational findings
    pub info: Vec<Issue>,
}

impl AnalysisResult {
    /// Whether the batch may proceed from preview to execution
    pub fn is_safe(&self) -> bool {
        self.blockers.is_empty()
    }

    /// Whether any warnings fired
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn push(&mut self, severity: Severity, rule: &Rule, message: String) {
        let issue = Issue {
            severity,
            rule_id: rule.id.clone(),
            mode: rule.mode,
            message,
        };
        match severity {
            Severity::Blocker => self.blockers.push(issue),
            Severity::Warning => self.warnings.push(issue),
            Severity::Info => self.info.push(issue),
        }
    }

    /// Plain-text report of all findings, blockers first
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let sections: [(&str, &Vec<Issue>); 3] = [
            ("BLOCKERS - execution withheld:", &self.blockers),
            ("Warnings:", &self.warnings),
            ("Info:", &self.info),
        ];
        for (heading, issues) in sections {
            if issues.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(heading);
            for issue in issues {
                out.push_str(&format!("\n  [{}] {}", issue.rule_id, issue.message));
            }
        }
        if out.is_empty() {
            out.push_str("No findings.");
        }
        out
    }
}

/// Analyze a batch of previewed rule runs
///
/// Every check runs for every rule regardless of mode; mode-specific checks
/// simply do not fire for other modes.
pub fn analyze(batch: &[(Rule, TransferStats)]) -> AnalysisResult {
    let mut result = AnalysisResult::default();
    for (rule, stats) in batch {
        check_copy_safety(rule, stats, &mut result);
        check_move_safety(rule, stats, &mut result);
        check_sync_patterns(rule, stats, &mut result);
        check_large_operations(rule, stats, &mut result);
        check_zero_operations(rule, stats, &mut result);
    }
    result
}

/// Copy and backup runs should never delete anything
fn check_copy_safety(rule: &Rule, stats: &TransferStats, result: &mut AnalysisResult) {
    if !matches!(rule.mode, RuleMode::Copy | RuleMode::Backup) {
        return;
    }
    if stats.deleted > 0 {
        result.push(
            Severity::Blocker,
            rule,
            format!(
                "SAFETY VIOLATION: {} mode deleted {} files (should never delete)",
                rule.mode, stats.deleted
            ),
        );
    }
}

/// Move runs must delete exactly the files they copied
fn check_move_safety(rule: &Rule, stats: &TransferStats, result: &mut AnalysisResult) {
    if rule.mode != RuleMode::Move {
        return;
    }
    if stats.deleted == stats.copied {
        return;
    }
    let message = if stats.skipped > 0 {
        format!(
            "SAFETY VIOLATION: move copied {} files but deleted {}; \
             {} files were skipped but should remain on the source",
            stats.copied, stats.deleted, stats.skipped
        )
    } else {
        format!(
            "SAFETY VIOLATION: move copied {} files but deleted {} (must match exactly)",
            stats.copied, stats.deleted
        )
    };
    result.push(Severity::Blocker, rule, message);
}

/// Sync runs: flag extreme delete/copy imbalances
fn check_sync_patterns(rule: &Rule, stats: &TransferStats, result: &mut AnalysisResult) {
    if rule.mode != RuleMode::Sync {
        return;
    }
    if stats.deleted > stats.copied * SYNC_DELETE_RATIO && stats.copied < 10 {
        result.push(
            Severity::Warning,
            rule,
            format!(
                "sync will delete {} files but only copy {} new files; \
                 verify the source path is correct",
                stats.deleted, stats.copied
            ),
        );
    }
    if stats.deleted > SYNC_LARGE_DELETE {
        result.push(
            Severity::Warning,
            rule,
            format!(
                "large sync deletion: {} files will be removed from the destination",
                stats.deleted
            ),
        );
    }
}

/// Any mode: unusually large deletion footprints
fn check_large_operations(rule: &Rule, stats: &TransferStats, result: &mut AnalysisResult) {
    if stats.deleted > MASS_DELETE_THRESHOLD && stats.copied < MASS_DELETE_MIN_COPIED {
        result.push(
            Severity::Warning,
            rule,
            format!(
                "mass deletion detected: {} files deleted but only {} copied",
                stats.deleted, stats.copied
            ),
        );
    }
    // Sync has its own thresholds above.
    if stats.deleted > LARGE_DELETE_COUNT && rule.mode != RuleMode::Sync {
        result.push(
            Severity::Warning,
            rule,
            format!("large deletion: {} files will be removed", stats.deleted),
        );
    }
}

/// Any mode: note runs that would change nothing
fn check_zero_operations(rule: &Rule, stats: &TransferStats, result: &mut AnalysisResult) {
    if stats.copied != 0 || stats.deleted != 0 || stats.renamed != 0 {
        return;
    }
    let message = if stats.skipped > 0 {
        format!(
            "no changes needed: all {} files already exist at the destination",
            stats.skipped
        )
    } else {
        "no changes needed: source is empty or already synchronized".to_string()
    };
    result.push(Severity::Info, rule, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, mode: RuleMode) -> Rule {
        Rule {
            id: id.to_string(),
            mode,
            source_path: "/src".to_string(),
            dest_path: "/dst".to_string(),
            manual_only: false,
        }
    }

    fn stats(copied: u64, deleted: u64, skipped: u64) -> TransferStats {
        let mut stats = TransferStats::new();
        stats.copied = copied;
        stats.deleted = deleted;
        stats.skipped = skipped;
        stats
    }

    #[test]
    fn test_copy_deletion_is_blocker() {
        let batch = vec![(rule("r-1", RuleMode::Copy), stats(5, 1, 0))];
        let result = analyze(&batch);
        assert_eq!(result.blockers.len(), 1);
        assert!(result.warnings.is_empty());
        assert!(!result.is_safe());
    }

    #[test]
    fn test_backup_deletion_is_blocker() {
        let batch = vec![(rule("r-1", RuleMode::Backup), stats(0, 3, 0))];
        let result = analyze(&batch);
        assert_eq!(result.blockers.len(), 1);
        assert!(result.blockers[0].message.contains("should never delete"));
    }

    #[test]
    fn test_move_mismatch_is_blocker_with_counts() {
        let batch = vec![(rule("r-1", RuleMode::Move), stats(10, 12, 0))];
        let result = analyze(&batch);
        assert_eq!(result.blockers.len(), 1);
        let msg = &result.blockers[0].message;
        assert!(msg.contains("copied 10"));
        assert!(msg.contains("deleted 12"));
    }

    #[test]
    fn test_move_mismatch_mentions_skipped() {
        let batch = vec![(rule("r-1", RuleMode::Move), stats(8, 10, 2))];
        let result = analyze(&batch);
        assert!(result.blockers[0].message.contains("skipped"));
    }

    #[test]
    fn test_move_balanced_is_safe() {
        let batch = vec![(rule("r-1", RuleMode::Move), stats(10, 10, 0))];
        assert!(analyze(&batch).is_safe());
    }

    #[test]
    fn test_sync_imbalance_warns_not_blocks() {
        let batch = vec![(rule("r-1", RuleMode::Sync), stats(2, 50, 0))];
        let result = analyze(&batch);
        assert!(result.is_safe());
        assert!(result.has_warnings());
        let msg = &result.warnings[0].message;
        assert!(msg.contains("50"));
        assert!(msg.contains("2"));
    }

    #[test]
    fn test_sync_large_deletion_warns() {
        let batch = vec![(rule("r-1", RuleMode::Sync), stats(600, 501, 0))];
        let result = analyze(&batch);
        assert!(result.is_safe());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("large sync deletion")));
    }

    #[test]
    fn test_mass_deletion_warns_any_mode() {
        let batch = vec![(rule("r-1", RuleMode::Sync), stats(50, 1500, 0))];
        let result = analyze(&batch);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.message.contains("mass deletion")));
    }

    #[test]
    fn test_zero_op_info_messages() {
        let batch = vec![
            (rule("r-1", RuleMode::Copy), stats(0, 0, 7)),
            (rule("r-2", RuleMode::Copy), stats(0, 0, 0)),
        ];
        let result = analyze(&batch);
        assert_eq!(result.info.len(), 2);
        assert!(result.info[0].message.contains("already exist"));
        assert!(result.info[1].message.contains("source is empty"));
    }

    #[test]
    fn test_one_blocker_gates_whole_batch() {
        let batch = vec![
            (rule("r-1", RuleMode::Move), stats(10, 10, 0)),
            (rule("r-2", RuleMode::Copy), stats(5, 1, 0)),
        ];
        let result = analyze(&batch);
        assert!(!result.is_safe());
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let batch = vec![
            (rule("r-1", RuleMode::Move), stats(10, 12, 1)),
            (rule("r-2", RuleMode::Sync), stats(2, 50, 3)),
        ];
        assert_eq!(analyze(&batch), analyze(&batch));
    }

    #[test]
    fn test_summary_lists_blockers_first() {
        let batch = vec![
            (rule("r-2", RuleMode::Sync), stats(2, 50, 0)),
            (rule("r-1", RuleMode::Copy), stats(5, 1, 0)),
        ];
        let report = analyze(&batch).summary();
        let blocker_pos = report.find("BLOCKERS").unwrap();
        let warning_pos = report.find("Warnings").unwrap();
        assert!(blocker_pos < warning_pos);
        assert!(report.contains("[r-1]"));
    }
}
