//! Resumable backup: copy-style transfer with durable per-file progress
//!
//! Layered on the walker and the state store rather than on the copy
//! traversal: the full candidate file list is computed up front so that the
//! remaining set (candidates minus already-copied) is known before the first
//! transfer. Each successful file is durably recorded before moving on;
//! interrupting the process at any point loses at most the in-flight file.
//!
//! Unlike copy mode, backup preserves relative paths exactly (no conflict
//! renaming — path identity is what makes resumption meaningful) and
//! transfers with overwrite allowed, so a file that landed just before a
//! crash is simply rewritten on resume instead of failing.

use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::state::{RuleStatus, StateStore};
use crate::types::TransferStats;
use crate::utils::join_addr;
use crate::vfs::Vfs;
use crate::walker::Walker;

/// Run a resumable backup of the tree at `source` into `dest`
///
/// Consults and updates the persisted state for `rule_id`: paths already in
/// the `copied` set are skipped, each new success is durably recorded, and a
/// pass that exhausts the remaining set with zero new failures completes the
/// job and deletes its record. In dry-run mode nothing is transferred and no
/// state is written.
pub fn run_backup(
    vfs: &dyn Vfs,
    store: &StateStore,
    rule_id: &str,
    source: &str,
    dest: &str,
    dry_run: bool,
) -> Result<TransferStats> {
    info!(rule_id, source, dest, dry_run, "backup rule");
    let mut stats = TransferStats::new();

    let walker = Walker::new(vfs);
    let mut sizes: HashMap<String, u64> = HashMap::new();
    let mut candidates: Vec<String> = Vec::new();
    for entry in walker.walk(source) {
        if !entry.kind.is_dir() {
            let rel = entry.path.to_string_lossy().into_owned();
            sizes.insert(rel.clone(), entry.size);
            candidates.push(rel);
        }
    }

    let mut state = store.load_rule(rule_id);
    if state.has_progress() {
        info!(rule_id, "resuming: {}", state.summary());
    }
    let remaining = state.remaining(&candidates);
    stats.skipped = (candidates.len() - remaining.len()) as u64;

    if !dry_run {
        state.total_files = candidates.len() as u64;
        if !remaining.is_empty() {
            state.status = RuleStatus::InProgress;
        }
        store.save_rule(rule_id, &state)?;
    }

    if !dry_run && !vfs.mkdir(dest, true) {
        warn!(dest, "failed to create backup destination");
    }

    let mut made_dirs: HashSet<String> = HashSet::new();
    let mut new_failures = 0u64;

    for rel in &remaining {
        let src_addr = join_addr(source, rel);
        let dest_addr = join_addr(dest, rel);
        let size = sizes.get(rel).copied().unwrap_or(0);

        if dry_run {
            stats.record_copied(size);
            continue;
        }

        if let Some((parent, _)) = rel.rsplit_once('/') {
            // Every ancestor counts once, not just the deepest directory.
            let mut prefix = String::new();
            for component in parent.split('/') {
                if !prefix.is_empty() {
                    prefix.push('/');
                }
                prefix.push_str(component);
                if made_dirs.insert(prefix.clone()) {
                    let dir_addr = join_addr(dest, &prefix);
                    if vfs.mkdir(&dir_addr, true) {
                        stats.folders += 1;
                    }
                }
            }
        }

        if vfs.copy_file(&src_addr, &dest_addr, true) {
            debug!(rel, "backed up");
            stats.record_copied(size);
            store.mark_copied(rule_id, rel)?;
        } else {
            warn!(rel, "backup transfer failed");
            stats.errors += 1;
            new_failures += 1;
            store.mark_failed(rule_id, rel, "copy failed")?;
        }
    }

    if !dry_run && new_failures == 0 {
        // Clean terminal state: a completed job leaves no record behind.
        store.clear_rule(rule_id)?;
    }

    stats.finish();
    Ok(stats)
}
