//! Ordered directory traversal over a [`Vfs`] namespace
//!
//! The walker produces stable enumerations for the reconciler: within one
//! directory, subdirectories come first, then files, both sorted
//! case-insensitively by name. A location that is missing or inaccessible
//! yields an empty sequence rather than an error; for reconciliation
//! purposes the distinction does not matter, and the access layer already
//! collapsed timeouts into "absent".

use std::path::PathBuf;
use tracing::trace;

use crate::types::{EntryKind, TreeEntry};
use crate::utils::join_addr;
use crate::vfs::Vfs;

/// Directory walker bound to a filesystem-access layer
pub struct Walker<'a> {
    vfs: &'a dyn Vfs,
}

impl<'a> Walker<'a> {
    /// Create a walker over the given access layer
    pub fn new(vfs: &'a dyn Vfs) -> Self {
        Walker { vfs }
    }

    /// Enumerate one directory level in stable order
    ///
    /// Entry paths are bare names. Entries whose stat probe fails are
    /// dropped; they may have vanished between list and stat.
    pub fn list(&self, addr: &str) -> Vec<TreeEntry> {
        let mut entries: Vec<TreeEntry> = self
            .vfs
            .list(addr)
            .into_iter()
            .filter_map(|name| {
                let info = self.vfs.stat(&join_addr(addr, &name))?;
                Some(TreeEntry {
                    path: PathBuf::from(name),
                    kind: info.kind,
                    size: info.size,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            let group = |e: &TreeEntry| if e.kind.is_dir() { 0 } else { 1 };
            group(a)
                .cmp(&group(b))
                .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
        });

        trace!(addr, count = entries.len(), "listed directory");
        entries
    }

    /// Depth-first enumeration of a whole tree
    ///
    /// Entry paths are relative to `addr`. Directories appear before their
    /// contents (pre-order), in the same stable per-level order as
    /// [`Walker::list`].
    pub fn walk(&self, addr: &str) -> Vec<TreeEntry> {
        let mut out = Vec::new();
        self.walk_into(addr, PathBuf::new(), &mut out);
        out
    }

    fn walk_into(&self, addr: &str, prefix: PathBuf, out: &mut Vec<TreeEntry>) {
        for entry in self.list(addr) {
            let rel = prefix.join(&entry.path);
            let entry_addr = join_addr(addr, entry.name());
            out.push(TreeEntry {
                path: rel.clone(),
                kind: entry.kind,
                size: entry.size,
            });
            if entry.kind.is_dir() {
                self.walk_into(&entry_addr, rel, out);
            }
        }
    }
}
