use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use docscribe_common::config::TranscriptionSettings;

/// A speech recognition backend: WAV file in, transcript out.
pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, wav: &Path) -> Result<String>;
}

/// Backend used when the crate is built without a speech recognizer.
/// Every call fails with the stored reason.
pub struct UnavailableModel {
    reason: String,
}

impl UnavailableModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl SpeechToText for UnavailableModel {
    fn transcribe(&self, _wav: &Path) -> Result<String> {
        bail!("speech-to-text unavailable: {}", self.reason)
    }
}

/// Build the configured backend.
///
/// With the `whisper` feature this is a lazily loaded whisper.cpp model;
/// without it, an [`UnavailableModel`].
pub fn from_settings(settings: &TranscriptionSettings) -> Arc<dyn SpeechToText> {
    #[cfg(feature = "whisper")]
    {
        Arc::new(crate::whisper::WhisperModel::new(settings))
    }
    #[cfg(not(feature = "whisper"))]
    {
        tracing::warn!(
            "built without the `whisper` feature; audio transcription is disabled (model {})",
            settings.model_path.display()
        );
        Arc::new(UnavailableModel::new("built without the `whisper` feature"))
    }
}
