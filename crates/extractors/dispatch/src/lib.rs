use std::path::Path;

use docscribe_common::api::{ExtractError, ExtractResult, FileKind};
use tracing::debug;

/// Route a document to its extractor by kind.
///
/// Only document kinds (text, word document, pdf) are handled here; audio
/// needs a speech model and an output path, and archives are batch
/// processed, so both come back as [`ExtractError::Unsupported`].
pub fn dispatch_from_path(path: &Path, kind: FileKind) -> ExtractResult {
    debug!("extracting {} as {kind}", path.display());
    match kind {
        FileKind::Text => docscribe_extract_text::extract(path),
        FileKind::WordDocument => docscribe_extract_office::extract(path),
        FileKind::Pdf => docscribe_extract_pdf::extract(path),
        FileKind::Audio | FileKind::Archive => Err(ExtractError::unsupported(path, kind)),
    }
}

/// Like [`dispatch_from_path`], deriving the kind from the file extension.
pub fn dispatch(path: &Path) -> ExtractResult {
    match FileKind::from_path(path) {
        Some(kind) => dispatch_from_path(path, kind),
        None => Err(ExtractError::unsupported(path, "unknown")),
    }
}
