use std::path::Path;

use docscribe_common::api::{ExtractError, ExtractResult};

/// Read a plain-text file and return its content unchanged.
///
/// The file must be valid UTF-8; anything else is reported as a read error
/// rather than lossily decoded.
pub fn extract(path: &Path) -> ExtractResult {
    std::fs::read_to_string(path).map_err(|e| ExtractError::read(path, e))
}

/// Check if a file is plain text based on extension.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}
