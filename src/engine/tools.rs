//! Path, text and filter utilities

use std::path::{Path, PathBuf};

use crate::utils::config::TIMESTAMP_FORMAT;

/// Convert absolute path to relative path from base
pub fn path_relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    path.strip_prefix(base).ok().map(|p| p.to_path_buf())
}

/// Path as stored in the tracking DB: lossy UTF-8 with forward slashes.
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// First `max_chars` characters of `s` (never splits a code point).
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Local time in the tracking record format.
pub fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Lower-case an extension and make sure it starts with `.` (`"EDF"` → `".edf"`).
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

/// Lower-cased extension of `path` including the leading `.`, if any.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

/// Check if a file should be excluded based on OS-specific metadata files
pub fn is_os_hidden_file(path: &Path) -> bool {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        match name {
            // macOS
            ".DS_Store" | ".AppleDouble" | ".LSOverride" => true,
            // Windows
            "Thumbs.db" | "ehthumbs.db" | "Desktop.ini" => true,
            // Linux
            ".directory" => true,
            // macOS resource fork files start with ._
            _ => name.starts_with("._"),
        }
    } else {
        false
    }
}

/// True for the tracking DB and its `-wal` / `-shm` / `-journal` siblings.
pub fn is_tracking_db_file(path: &Path, db_path: &Path) -> bool {
    let (Some(name), Some(db_name)) = (path.file_name(), db_path.file_name()) else {
        return false;
    };
    let name = name.to_string_lossy();
    let db_name = db_name.to_string_lossy();
    name == db_name
        || name
            .strip_prefix(db_name.as_ref())
            .is_some_and(|rest| matches!(rest, "-wal" | "-shm" | "-journal"))
}
