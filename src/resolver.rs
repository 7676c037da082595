//! Destination-name conflict resolution
//!
//! Given a candidate file name and the set of names already present in the
//! destination directory, decide what the file should actually be called, or
//! whether it should be skipped. Renaming follows the familiar
//! `"name (1).ext"`, `"name (2).ext"` convention.

use std::collections::HashSet;

use crate::error::{Result, SyncError};

/// Upper bound on rename probes before giving up
///
/// Past this point a silent infinite loop is a bigger risk than strict
/// completeness, so exhaustion is a hard error rather than a skip.
pub const MAX_CONFLICT_PROBES: u32 = 1000;

/// Resolve a destination name against the existing directory contents
///
/// Returns the candidate unchanged when it is free, `Ok(None)` when it
/// conflicts and renaming is disabled (the file is skipped), or the first
/// free `"{stem} (n).{ext}"` variant otherwise.
///
/// # Errors
///
/// [`SyncError::ConflictProbesExhausted`] if no free name is found within
/// [`MAX_CONFLICT_PROBES`] attempts.
pub fn resolve(
    existing: &HashSet<String>,
    candidate: &str,
    rename_on_conflict: bool,
) -> Result<Option<String>> {
    if !existing.contains(candidate) {
        return Ok(Some(candidate.to_string()));
    }
    if !rename_on_conflict {
        return Ok(None);
    }

    let (stem, ext) = split_name(candidate);
    for counter in 1..=MAX_CONFLICT_PROBES {
        let probe = match ext {
            Some(ext) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", stem, counter),
        };
        if !existing.contains(&probe) {
            return Ok(Some(probe));
        }
    }

    Err(SyncError::ConflictProbesExhausted {
        name: candidate.to_string(),
        probes: MAX_CONFLICT_PROBES,
    })
}

/// Split a file name at its last dot into stem and extension
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn names(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_free_name_unchanged() {
        let existing = names(&["other.txt"]);
        assert_eq!(
            resolve(&existing, "x.txt", true).unwrap(),
            Some("x.txt".to_string())
        );
    }

    #[test]
    fn test_conflict_without_rename_skips() {
        let existing = names(&["x.txt"]);
        assert_eq!(resolve(&existing, "x.txt", false).unwrap(), None);
    }

    #[test]
    fn test_probes_in_order() {
        let existing = names(&["x.txt", "x (1).txt"]);
        assert_eq!(
            resolve(&existing, "x.txt", true).unwrap(),
            Some("x (2).txt".to_string())
        );
    }

    #[test]
    fn test_no_extension() {
        let existing = names(&["README"]);
        assert_eq!(
            resolve(&existing, "README", true).unwrap(),
            Some("README (1)".to_string())
        );
    }

    #[test]
    fn test_probe_exhaustion_is_fatal() {
        let mut existing = names(&["x.txt"]);
        for i in 1..=MAX_CONFLICT_PROBES {
            existing.insert(format!("x ({}).txt", i));
        }
        assert!(matches!(
            resolve(&existing, "x.txt", true),
            Err(SyncError::ConflictProbesExhausted { probes: 1000, .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_resolved_name_never_collides(
            candidate in "[a-z]{1,8}(\\.[a-z]{1,3})?",
            taken in proptest::collection::hash_set("[a-z]{1,8}(\\.[a-z]{1,3})?", 0..16),
        ) {
            if let Some(resolved) = resolve(&taken, &candidate, true).unwrap() {
                prop_assert!(!taken.contains(&resolved));
            }
        }
    }
}
