use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerAppConfig {
    #[serde(default)]
    pub server: ServerAppSettings,
    #[serde(default)]
    pub transcription: TranscriptionSettings,
    #[serde(default)]
    pub log: LogSettings,
}

impl ServerAppConfig {
    /// Load a config file.  When `required` is false a missing file yields
    /// the defaults; a file that exists but does not parse is always an error.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&config_str).context("parsing server config")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAppSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Where uploads are saved.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Where transcripts and archive outputs are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Parent of the per-call `temp_extracted*` scratch directories.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Request body limit in MB; 0 disables the limit.
    #[serde(default)]
    pub max_upload_mb: usize,
    /// Return 422 instead of the confirmation message when an uploaded
    /// archive is missing or unreadable.
    #[serde(default)]
    pub report_archive_errors: bool,
}

impl Default for ServerAppSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            scratch_dir: default_scratch_dir(),
            max_upload_mb: 0,
            report_archive_errors: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".into()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("uploads/output")
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionSettings {
    /// whisper.cpp GGML model file.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// ISO 639-1 code; `None` lets the model detect the language.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            language: None,
            threads: None,
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/ggml-base.bin")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    /// Regexes matched against `target: message`; matching events are dropped.
    #[serde(default)]
    pub ignore: Vec<String>,
}
