//! Path addressing for the device and desktop namespaces
//!
//! The device side of a transfer is addressed through a virtual filesystem
//! scheme (e.g. `mtp://[usb:003,009]/Internal storage/DCIM/Camera`). A rule
//! stores only the namespace-relative part; this module maps that relative
//! path, plus an optional storage-area prefix, onto the device's base
//! address.
//!
//! Supported spellings for the device path:
//!
//! - `/DCIM/Camera` or `DCIM/Camera` — default storage area
//! - `~/is/DCIM/Camera` — internal storage shortcut
//! - `~/sd/Music` — SD card shortcut
//! - `Internal storage/DCIM` / `SD Card/Music` — explicit area label
//!
//! Resolution is a pure, total function: malformed input degrades to the
//! default storage area at its root rather than failing.

use std::path::PathBuf;

/// Storage area used when a device path carries no explicit prefix
pub const DEFAULT_STORAGE_AREA: &str = "Internal storage";

/// Secondary storage area label
pub const SD_STORAGE_AREA: &str = "SD Card";

/// Split a device path into its storage area and path segments
///
/// Empty segments are dropped; both `/` and `\` act as separators.
pub fn normalize_device_path(device_path: &str) -> (&'static str, Vec<String>) {
    let trimmed = device_path.trim();

    let (area, remainder) = if let Some(rest) = trimmed.strip_prefix("~/is/") {
        (DEFAULT_STORAGE_AREA, rest)
    } else if let Some(rest) = trimmed.strip_prefix("~/sd/") {
        (SD_STORAGE_AREA, rest)
    } else if let Some(rest) = strip_area_label(trimmed, DEFAULT_STORAGE_AREA) {
        (DEFAULT_STORAGE_AREA, rest)
    } else if let Some(rest) = strip_area_label(trimmed, SD_STORAGE_AREA) {
        (SD_STORAGE_AREA, rest)
    } else if let Some(rest) = trimmed.strip_prefix('/') {
        (DEFAULT_STORAGE_AREA, rest)
    } else {
        (DEFAULT_STORAGE_AREA, trimmed)
    };

    let segments = remainder
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    (area, segments)
}

/// Strip an explicit `"{label}/"` or `"{label}\"` prefix
fn strip_area_label<'a>(path: &'a str, label: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(label)?;
    rest.strip_prefix('/').or_else(|| rest.strip_prefix('\\'))
}

/// Build the fully qualified device address for a namespace-relative path
///
/// Each segment is percent-encoded so that spaces and punctuation survive
/// the address scheme; the storage-area label itself is not encoded since
/// the access layer expects it verbatim.
pub fn resolve(base_address: &str, device_path: &str) -> String {
    let mut address = base_address.to_string();
    if !address.ends_with('/') {
        address.push('/');
    }

    let (area, segments) = normalize_device_path(device_path);
    address.push_str(area);

    for segment in &segments {
        address.push('/');
        address.push_str(&percent_encode(segment));
    }

    address
}

/// Percent-encode a single path segment
///
/// Everything outside the RFC 3986 unreserved set is escaped, including `/`,
/// so a segment can never smuggle in extra path components.
pub fn percent_encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Expand a desktop path: `~` to the home directory, `$VAR` to environment
/// values
///
/// Unset variables expand to the empty string, matching shell behavior
/// closely enough for rule paths. The result is made absolute against the
/// current working directory, so a relative rule path does not drift when
/// the process changes directory between runs.
pub fn expand_desktop(path: &str) -> PathBuf {
    let mut expanded = String::with_capacity(path.len());

    let with_home = if path == "~" || path.starts_with("~/") {
        match dirs::home_dir() {
            Some(home) => format!("{}{}", home.display(), &path[1..]),
            None => path.to_string(),
        }
    } else {
        path.to_string()
    };

    let mut chars = with_home.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            expanded.push(c);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            expanded.push('$');
        } else if let Ok(value) = std::env::var(&name) {
            expanded.push_str(&value);
        }
    }

    let path = PathBuf::from(expanded);
    std::path::absolute(&path).unwrap_or(path)
}
