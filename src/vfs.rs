//! Filesystem-access collaborator interface
//!
//! The engine never touches a storage backend directly; every list, stat,
//! copy, remove and mkdir goes through the [`Vfs`] trait. The remote device
//! namespace is expected to be served by an external access layer (GVFS,
//! MTP, network mounts) implementing this trait; the desktop namespace is
//! served by [`LocalFs`].
//!
//! The trait's error model is deliberately coarse: a failed or timed-out
//! probe is indistinguishable from an absent entry, and mutating calls
//! report plain success/failure. The reconciler turns per-file failures into
//! counters rather than aborting, so richer error types would buy nothing
//! here. Implementations are responsible for wrapping remote calls in
//! bounded timeouts; nothing in this crate blocks indefinitely on a probe.

use std::fs;
use std::path::Path;
use tracing::{debug, trace};

use crate::types::EntryKind;

/// Kind and size of a filesystem node, as reported by [`Vfs::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// Node kind
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

/// Primitive filesystem operations over an opaque address space
///
/// Addresses are plain strings: filesystem paths for the desktop namespace,
/// scheme-qualified addresses (e.g. `mtp://…`) for a device namespace.
pub trait Vfs {
    /// List entry names in a directory; empty on any failure or timeout
    fn list(&self, addr: &str) -> Vec<String>;

    /// Kind and size of an entry; `None` if absent or inaccessible
    fn stat(&self, addr: &str) -> Option<EntryInfo>;

    /// Copy a single file; `false` on failure or on an existing destination
    /// when `overwrite` is not set
    fn copy_file(&self, src: &str, dst: &str, overwrite: bool) -> bool;

    /// Remove a file or an empty directory; `false` on failure
    fn remove(&self, addr: &str) -> bool;

    /// Create a directory, optionally with parents; `false` on failure
    fn mkdir(&self, addr: &str, parents: bool) -> bool;
}

/// [`Vfs`] implementation over the local filesystem
///
/// Treats every address as a plain path. This serves the desktop side of all
/// transfers and doubles as the test backend for the whole engine.
#[derive(Debug, Default, Clone)]
pub struct LocalFs;

impl LocalFs {
    /// Create a local filesystem accessor
    pub fn new() -> Self {
        LocalFs
    }
}

impl Vfs for LocalFs {
    fn list(&self, addr: &str) -> Vec<String> {
        let entries = match fs::read_dir(addr) {
            Ok(entries) => entries,
            Err(err) => {
                trace!(addr, %err, "list failed, treating as empty");
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect()
    }

    fn stat(&self, addr: &str) -> Option<EntryInfo> {
        let metadata = fs::metadata(addr).ok()?;
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Some(EntryInfo {
            kind,
            size: if kind.is_dir() { 0 } else { metadata.len() },
        })
    }

    fn copy_file(&self, src: &str, dst: &str, overwrite: bool) -> bool {
        if !overwrite && Path::new(dst).exists() {
            debug!(dst, "destination exists and overwrite is off");
            return false;
        }
        match fs::copy(src, dst) {
            Ok(_) => true,
            Err(err) => {
                debug!(src, dst, %err, "copy failed");
                false
            }
        }
    }

    fn remove(&self, addr: &str) -> bool {
        let path = Path::new(addr);
        let result = if path.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                debug!(addr, %err, "remove failed");
                false
            }
        }
    }

    fn mkdir(&self, addr: &str, parents: bool) -> bool {
        let result = if parents {
            fs::create_dir_all(addr)
        } else {
            fs::create_dir(addr)
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                debug!(addr, %err, "mkdir failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn addr(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let fs = LocalFs::new();
        assert!(fs.list("/definitely/not/a/real/path").is_empty());
    }

    #[test]
    fn test_stat_and_list() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), b"hello").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let vfs = LocalFs::new();
        let mut names = vfs.list(&addr(temp.path()));
        names.sort();
        assert_eq!(names, vec!["a.txt", "sub"]);

        let info = vfs.stat(&addr(&temp.path().join("a.txt"))).unwrap();
        assert_eq!(info.kind, EntryKind::File);
        assert_eq!(info.size, 5);

        let info = vfs.stat(&addr(&temp.path().join("sub"))).unwrap();
        assert_eq!(info.kind, EntryKind::Directory);
        assert_eq!(info.size, 0);

        assert!(vfs.stat(&addr(&temp.path().join("ghost"))).is_none());
    }

    #[test]
    fn test_copy_respects_overwrite() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.txt");
        let dst = temp.path().join("dst.txt");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        let vfs = LocalFs::new();
        assert!(!vfs.copy_file(&addr(&src), &addr(&dst), false));
        assert_eq!(fs::read(&dst).unwrap(), b"old");

        assert!(vfs.copy_file(&addr(&src), &addr(&dst), true));
        assert_eq!(fs::read(&dst).unwrap(), b"new");
    }

    #[test]
    fn test_remove_file_and_empty_dir() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        let empty = temp.path().join("empty");
        let full = temp.path().join("full");
        fs::write(&file, b"x").unwrap();
        fs::create_dir(&empty).unwrap();
        fs::create_dir(&full).unwrap();
        fs::write(full.join("kept.txt"), b"x").unwrap();

        let vfs = LocalFs::new();
        assert!(vfs.remove(&addr(&file)));
        assert!(vfs.remove(&addr(&empty)));
        // Non-empty directory removal fails rather than recursing.
        assert!(!vfs.remove(&addr(&full)));
        assert!(full.join("kept.txt").exists());
    }
}
