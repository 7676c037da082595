//! Tree reconciliation policies: copy, move and mirror-sync
//!
//! All three policies share one recursive traversal shape: for each source
//! entry, directories are ensured at the destination and recursed into,
//! files get a mode-specific transfer action. They differ in bookkeeping:
//!
//! - **copy** never deletes anything on the source
//! - **move** queues every *verified* transfer and deletes exactly those
//!   source files afterwards, so a mid-run failure leaves precisely the
//!   uncopied files behind
//! - **sync** mirrors the desktop tree onto the device in two passes:
//!   additive first, then subtractive once the complete expected set is
//!   known
//!
//! The `dry_run` flag is an explicit field threaded through every call: in
//! preview mode no mutating [`Vfs`] call is ever issued and would-be
//! transfers and deletions are counted as if they had succeeded. This keeps
//! preview-vs-execute trivially testable and leaves no ambient global state.
//!
//! Sync treats size equality as the sole "unchanged" heuristic. A same-size,
//! different-content edit is silently skipped; this is a deliberate,
//! documented approximation, not an oversight, and matches what the access
//! layer can answer cheaply for remote namespaces.

use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

use crate::error::Result;
use crate::resolver;
use crate::types::TransferStats;
use crate::utils::join_addr;
use crate::vfs::Vfs;
use crate::walker::Walker;

/// Tree reconciler bound to a filesystem-access layer
///
/// One instance runs one rule at a time; statistics are owned exclusively by
/// the running policy and handed back as a snapshot.
pub struct Reconciler<'a> {
    vfs: &'a dyn Vfs,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler; `dry_run` disables every mutating operation
    pub fn new(vfs: &'a dyn Vfs, dry_run: bool) -> Self {
        Reconciler { vfs, dry_run }
    }

    /// Whether this reconciler is in preview mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Copy a tree from `source` to `dest` without ever deleting
    ///
    /// Conflicting destination names are renamed with the `"name (n).ext"`
    /// convention.
    pub fn run_copy(&self, source: &str, dest: &str) -> Result<TransferStats> {
        info!(source, dest, dry_run = self.dry_run, "copy rule");
        let mut stats = TransferStats::new();
        self.make_dir(dest);
        self.copy_tree(source, dest, &mut stats, None)?;
        stats.finish();
        Ok(stats)
    }

    /// Move a tree from `source` to `dest`
    ///
    /// Runs the copy traversal first, queuing each transfer whose
    /// destination was verified to exist with nonzero size. Only then are
    /// the queued source files deleted, one by one; there is deliberately no
    /// "copied N, so delete N" shortcut. Emptied source subdirectories are
    /// removed best-effort afterwards, excluding the walk root.
    pub fn run_move(&self, source: &str, dest: &str) -> Result<TransferStats> {
        info!(source, dest, dry_run = self.dry_run, "move rule");
        let mut stats = TransferStats::new();
        self.make_dir(dest);

        let mut verified: Vec<String> = Vec::new();
        self.copy_tree(source, dest, &mut stats, Some(&mut verified))?;

        for src_addr in &verified {
            if self.delete(src_addr) {
                stats.deleted += 1;
            } else {
                warn!(addr = %src_addr, "failed to delete moved source file");
                stats.errors += 1;
            }
        }

        self.remove_emptied_dirs(source);
        stats.finish();
        Ok(stats)
    }

    /// Mirror the desktop tree at `source` onto the device tree at `dest`
    ///
    /// Pass 1 copies new and changed files (size inequality) and accumulates
    /// the set of expected relative paths. Pass 2 deletes device files
    /// outside that set and best-effort-removes emptied directories. The
    /// two-pass shape is required: extraneous-entry detection needs the
    /// complete expected set before any deletion is safe.
    pub fn run_sync(&self, source: &str, dest: &str) -> Result<TransferStats> {
        info!(source, dest, dry_run = self.dry_run, "sync rule");
        let mut stats = TransferStats::new();

        if self.vfs.stat(source).is_none() {
            warn!(source, "sync source does not exist");
            stats.errors += 1;
            stats.finish();
            return Ok(stats);
        }

        self.make_dir(dest);

        let mut expected: HashSet<String> = HashSet::new();
        self.sync_pass(source, dest, "", &mut expected, &mut stats);
        self.prune_extraneous(dest, "", &expected, &mut stats);

        stats.finish();
        Ok(stats)
    }

    /// Shared recursive traversal for copy and move
    ///
    /// When `verified` is given (move mode), each successful transfer is
    /// re-stated at the destination and queued for later source deletion;
    /// verification is skipped in preview mode, where nothing was
    /// materialized.
    fn copy_tree(
        &self,
        source: &str,
        dest: &str,
        stats: &mut TransferStats,
        mut verified: Option<&mut Vec<String>>,
    ) -> Result<()> {
        let walker = Walker::new(self.vfs);
        let mut existing: HashSet<String> = self.vfs.list(dest).into_iter().collect();

        for entry in walker.list(source) {
            let name = entry.name();
            let entry_addr = join_addr(source, name);

            if entry.kind.is_dir() {
                let sub_dest = join_addr(dest, name);
                if self.make_dir(&sub_dest) {
                    stats.folders += 1;
                    self.copy_tree(&entry_addr, &sub_dest, stats, verified.as_deref_mut())?;
                } else {
                    warn!(addr = %sub_dest, "failed to create destination directory");
                    stats.errors += 1;
                }
                continue;
            }

            // Conflicts are always renamed for copy/move; skip never applies.
            let final_name = match resolver::resolve(&existing, name, true)? {
                Some(final_name) => final_name,
                None => continue,
            };
            if final_name != name {
                debug!(from = name, to = %final_name, "renaming duplicate");
                stats.renamed += 1;
            }
            existing.insert(final_name.clone());
            let dest_addr = join_addr(dest, &final_name);

            if !self.transfer(&entry_addr, &dest_addr, false) {
                stats.errors += 1;
                continue;
            }

            match verified.as_deref_mut() {
                Some(queue) => {
                    if self.dry_run || self.dest_materialized(&dest_addr) {
                        stats.record_copied(entry.size);
                        queue.push(entry_addr);
                    } else {
                        warn!(addr = %dest_addr, "copy verification failed");
                        stats.errors += 1;
                    }
                }
                None => stats.record_copied(entry.size),
            }
        }
        Ok(())
    }

    fn sync_pass(
        &self,
        source: &str,
        dest: &str,
        rel_prefix: &str,
        expected: &mut HashSet<String>,
        stats: &mut TransferStats,
    ) {
        let walker = Walker::new(self.vfs);
        for entry in walker.list(source) {
            let name = entry.name();
            let entry_addr = join_addr(source, name);
            let rel = join_rel(rel_prefix, name);

            if entry.kind.is_dir() {
                let sub_dest = join_addr(dest, name);
                self.make_dir(&sub_dest);
                self.sync_pass(&entry_addr, &sub_dest, &rel, expected, stats);
                continue;
            }

            expected.insert(rel);
            let dest_addr = join_addr(dest, name);

            if let Some(info) = self.vfs.stat(&dest_addr) {
                if !info.kind.is_dir() && info.size == entry.size {
                    trace!(addr = %dest_addr, "unchanged, skipping");
                    stats.skipped += 1;
                    continue;
                }
            }

            if self.transfer(&entry_addr, &dest_addr, true) {
                stats.record_copied(entry.size);
            } else {
                stats.errors += 1;
            }
        }
    }

    fn prune_extraneous(
        &self,
        dest: &str,
        rel_prefix: &str,
        expected: &HashSet<String>,
        stats: &mut TransferStats,
    ) {
        let walker = Walker::new(self.vfs);
        for entry in walker.list(dest) {
            let name = entry.name();
            let entry_addr = join_addr(dest, name);
            let rel = join_rel(rel_prefix, name);

            if entry.kind.is_dir() {
                self.prune_extraneous(&entry_addr, &rel, expected, stats);
                // Only counts once actually emptied; in preview the children
                // are still present, so the directory stays.
                if self.vfs.list(&entry_addr).is_empty() && self.delete(&entry_addr) {
                    stats.deleted += 1;
                }
            } else if !expected.contains(&rel) {
                debug!(addr = %entry_addr, "deleting extraneous file");
                if self.delete(&entry_addr) {
                    stats.deleted += 1;
                } else {
                    stats.errors += 1;
                }
            }
        }
    }

    /// Best-effort bottom-up removal of source directories after a move
    ///
    /// A non-empty directory is expected here, not an error; failure is
    /// discarded on purpose.
    fn remove_emptied_dirs(&self, root: &str) {
        let walker = Walker::new(self.vfs);
        for entry in walker.list(root) {
            if entry.kind.is_dir() {
                let sub = join_addr(root, entry.name());
                self.remove_emptied_dirs(&sub);
                let _removed = self.delete(&sub);
            }
        }
    }

    /// A transferred file counts only once its destination demonstrably
    /// exists with nonzero size
    fn dest_materialized(&self, addr: &str) -> bool {
        matches!(self.vfs.stat(addr), Some(info) if !info.kind.is_dir() && info.size > 0)
    }

    fn transfer(&self, src: &str, dst: &str, overwrite: bool) -> bool {
        if self.dry_run {
            trace!(src, dst, "dry-run transfer");
            return true;
        }
        self.vfs.copy_file(src, dst, overwrite)
    }

    fn delete(&self, addr: &str) -> bool {
        if self.dry_run {
            trace!(addr, "dry-run delete");
            return true;
        }
        self.vfs.remove(addr)
    }

    fn make_dir(&self, addr: &str) -> bool {
        if self.dry_run {
            return true;
        }
        self.vfs.mkdir(addr, true)
    }
}

/// Join a name onto a slash-separated relative path
fn join_rel(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::LocalFs;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn addr(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn tree(root: &Path, files: &[(&str, &str)]) {
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn test_copy_never_deletes_source() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "aa"), ("sub/b.txt", "bbb")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_copy(&addr(src.path()), &addr(dst.path()))
            .unwrap();

        assert_eq!(stats.copied, 2);
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.folders, 1);
        assert_eq!(stats.bytes, 5);
        assert!(src.path().join("a.txt").exists());
        assert!(dst.path().join("sub/b.txt").exists());
    }

    #[test]
    fn test_copy_renames_duplicates() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        tree(src.path(), &[("x.txt", "new")]);
        tree(dst.path(), &[("x.txt", "old"), ("x (1).txt", "older")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_copy(&addr(src.path()), &addr(dst.path()))
            .unwrap();

        assert_eq!(stats.copied, 1);
        assert_eq!(stats.renamed, 1);
        assert_eq!(fs::read(dst.path().join("x (2).txt")).unwrap(), b"new");
        assert_eq!(fs::read(dst.path().join("x.txt")).unwrap(), b"old");
    }

    #[test]
    fn test_move_deletes_only_verified_copies() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "a"), ("sub/b.txt", "b"), ("sub/c.txt", "c")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_move(&addr(src.path()), &addr(dst.path()))
            .unwrap();

        assert_eq!(stats.copied, 3);
        assert_eq!(stats.deleted, 3);
        assert_eq!(stats.errors, 0);
        assert!(!src.path().join("a.txt").exists());
        // Emptied subdirectory removed, walk root kept.
        assert!(!src.path().join("sub").exists());
        assert!(src.path().exists());
        assert!(dst.path().join("sub/b.txt").exists());
    }

    #[test]
    fn test_sync_mirror_and_prune() {
        let desktop = TempDir::new().unwrap();
        let device = TempDir::new().unwrap();
        tree(desktop.path(), &[("keep.txt", "same"), ("new.txt", "fresh")]);
        tree(
            device.path(),
            &[("keep.txt", "same"), ("stale.txt", "gone"), ("old/drop.txt", "x")],
        );

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_sync(&addr(desktop.path()), &addr(device.path()))
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.copied, 1);
        // stale.txt, old/drop.txt, and the emptied "old" directory.
        assert_eq!(stats.deleted, 3);
        assert!(device.path().join("new.txt").exists());
        assert!(!device.path().join("stale.txt").exists());
        assert!(!device.path().join("old").exists());
    }

    #[test]
    fn test_sync_rerun_is_idempotent() {
        let desktop = TempDir::new().unwrap();
        let device = TempDir::new().unwrap();
        tree(desktop.path(), &[("a.txt", "1"), ("sub/b.txt", "22")]);

        let vfs = LocalFs::new();
        let reconciler = Reconciler::new(&vfs, false);
        reconciler
            .run_sync(&addr(desktop.path()), &addr(device.path()))
            .unwrap();
        let second = reconciler
            .run_sync(&addr(desktop.path()), &addr(device.path()))
            .unwrap();

        assert_eq!(second.copied, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.deleted, 0);
    }

    #[test]
    fn test_sync_same_size_is_skipped() {
        // Size equality is the only unchanged heuristic; equal-size edits
        // are not detected.
        let desktop = TempDir::new().unwrap();
        let device = TempDir::new().unwrap();
        tree(desktop.path(), &[("a.txt", "abc")]);
        tree(device.path(), &[("a.txt", "xyz")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_sync(&addr(desktop.path()), &addr(device.path()))
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.copied, 0);
        assert_eq!(fs::read(device.path().join("a.txt")).unwrap(), b"xyz");
    }

    #[test]
    fn test_sync_missing_source_reports_error() {
        let device = TempDir::new().unwrap();
        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, false)
            .run_sync("/no/such/desktop/dir", &addr(device.path()))
            .unwrap();

        assert_eq!(stats.errors, 1);
        assert_eq!(stats.copied, 0);
        assert_eq!(stats.deleted, 0);
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        tree(src.path(), &[("a.txt", "a"), ("sub/b.txt", "b")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, true)
            .run_move(&addr(src.path()), &addr(dst.path()))
            .unwrap();

        // Counted as if executed, but nothing materialized or removed.
        assert_eq!(stats.copied, 2);
        assert_eq!(stats.deleted, 2);
        assert!(src.path().join("a.txt").exists());
        assert!(src.path().join("sub/b.txt").exists());
        assert!(fs::read_dir(dst.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_dry_run_sync_counts_deletions_without_deleting() {
        let desktop = TempDir::new().unwrap();
        let device = TempDir::new().unwrap();
        tree(desktop.path(), &[("a.txt", "1")]);
        tree(device.path(), &[("a.txt", "1"), ("stale.txt", "x")]);

        let vfs = LocalFs::new();
        let stats = Reconciler::new(&vfs, true)
            .run_sync(&addr(desktop.path()), &addr(device.path()))
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.deleted, 1);
        assert!(device.path().join("stale.txt").exists());
    }
}
