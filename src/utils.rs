//! Utility functions for treesync
//!
//! Small helpers shared across the engine: atomic file writing for the state
//! store, address joining for walker/reconciler traversals, and
//! human-readable formatting for throughput reporting.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Join an entry name onto a namespace address
///
/// Addresses are opaque strings separated by `/`; a trailing separator on the
/// base is tolerated so that callers never produce a doubled slash.
pub fn join_addr(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Atomic file write (write to temp file then rename)
///
/// Ensures the target file is never left in a partially written state: either
/// the whole file is replaced or the previous content survives. This is the
/// durability guarantee the resumable state store relies on.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Format bytes in human-readable form
///
/// Uses binary units (1024-based). Values under 1 KB are shown as whole
/// numbers, larger values with two decimal places.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration as a compact `1h 15m` / `5m 30s` / `42s` string
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
