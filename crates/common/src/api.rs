use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// The closed set of input kinds the service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Archive,
    Audio,
    Text,
    WordDocument,
    Pdf,
}

impl FileKind {
    /// Classify a bare extension (no leading dot).  Case-insensitive.
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "zip" => Some(Self::Archive),
            "m4a" | "mp3" | "wav" => Some(Self::Audio),
            "txt" => Some(Self::Text),
            "docx" => Some(Self::WordDocument),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Classify a file by the text after the last `.` of its name.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(ext_of)
            .and_then(Self::from_ext)
    }

    /// Text, word documents and PDFs go through the document extractors.
    pub fn is_document(self) -> bool {
        matches!(self, Self::Text | Self::WordDocument | Self::Pdf)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Audio => "audio",
            Self::Text => "text",
            Self::WordDocument => "word-document",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension of a file name: the text after the last `.`, or `None` if the
/// name has no dot.
pub fn ext_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Failure of a single extraction or transcription.
///
/// The `Display` form is the human-readable message written into output
/// files and HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Error reading {path}: {cause}")]
    Read { path: String, cause: String },

    #[error("Error extracting text from {path}: {cause}")]
    Extract { path: String, cause: String },

    #[error("Error transcribing {path}: {cause}")]
    Transcribe { path: String, cause: String },

    #[error("Unsupported file type for {path}: {kind}")]
    Unsupported { path: String, kind: String },
}

impl ExtractError {
    pub fn read(path: &Path, cause: impl fmt::Display) -> Self {
        Self::Read { path: path.display().to_string(), cause: cause.to_string() }
    }

    pub fn extract(path: &Path, cause: impl fmt::Display) -> Self {
        Self::Extract { path: path.display().to_string(), cause: cause.to_string() }
    }

    pub fn transcribe(path: &Path, cause: impl fmt::Display) -> Self {
        Self::Transcribe { path: path.display().to_string(), cause: cause.to_string() }
    }

    pub fn unsupported(path: &Path, kind: impl fmt::Display) -> Self {
        Self::Unsupported { path: path.display().to_string(), kind: kind.to_string() }
    }

    /// Path of the file that failed.
    pub fn path(&self) -> &str {
        match self {
            Self::Read { path, .. }
            | Self::Extract { path, .. }
            | Self::Transcribe { path, .. }
            | Self::Unsupported { path, .. } => path,
        }
    }
}

pub type ExtractResult = Result<String, ExtractError>;

/// Collapse an extraction result into the text shown to users: the
/// extracted text on success, the rendered error otherwise.
pub fn render(result: ExtractResult) -> String {
    result.unwrap_or_else(|e| e.to_string())
}

/// POST /api/upload success body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub result: String,
}

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /api/health body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Extensions accepted by the upload endpoint.
pub const ALLOWED_EXTENSIONS: &[&str] = &["zip", "m4a", "mp3", "wav", "txt", "docx", "pdf"];

/// True if `filename` contains a `.` and its extension is in
/// [`ALLOWED_EXTENSIONS`].
pub fn allowed_file(filename: &str) -> bool {
    ext_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Make a client-supplied filename safe to join onto the upload directory.
///
/// The name is NFKD-normalized so accented letters keep their base letter,
/// remaining non-ASCII characters are dropped, path separators become spaces,
/// whitespace runs collapse to `_`, anything outside `[A-Za-z0-9_.-]` is
/// removed, and leading/trailing `.`/`_` are stripped.  May return an empty
/// string.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
