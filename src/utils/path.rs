//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `decode_file_path` / `encode_file_path` - entry paths on the wire
//! - `is_under_any` - root membership

use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters escaped by `encode_file_path`
const FILE_PATH: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'#').add(b'?');

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Decode a `%XX`-encoded file path.
///
/// Mirrors `decodeURIComponent`: `+` stays a plus sign, and a sequence
/// decoding to invalid UTF-8 is an error.
pub fn decode_file_path(encoded: &str) -> Result<PathBuf, std::str::Utf8Error> {
    let decoded = percent_decode_str(encoded).decode_utf8()?;
    Ok(PathBuf::from(decoded.into_owned()))
}

/// Encode a path so `decode_file_path` returns it unchanged.
pub fn encode_file_path(path: &Path) -> String {
    utf8_percent_encode(&path.to_string_lossy(), FILE_PATH).to_string()
}

/// Whether `path` lies under one of `roots` (or is one of them).
pub fn is_under_any(path: &Path, roots: &[PathBuf]) -> bool {
    roots.iter().any(|root| path.starts_with(root))
}
