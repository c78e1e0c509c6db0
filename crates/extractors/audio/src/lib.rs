//! Audio transcription pipeline.
//!
//! A call runs four stages in order:
//!
//! 1. format normalization to `<stem>_temp.wav` (fatal on failure)
//! 2. noise reduction to `<stem>_processed.wav` (skipped on failure)
//! 3. speech-to-text on the best waveform available (fatal on failure)
//! 4. persistence of `[timestamp] transcript` to the output file (failure
//!    logged, transcript still returned)
//!
//! Both temporaries live in a directory private to the call, removed when
//! the call returns whatever happened.  Files next to the input are never
//! touched.

pub mod convert;
pub mod denoise;
pub mod model;
#[cfg(feature = "whisper")]
pub mod whisper;

use std::path::{Path, PathBuf};

use anyhow::Context;
use docscribe_common::api::{ExtractError, ExtractResult};
use docscribe_common::output::write_to_text_file;
use tracing::{debug, warn};

pub use model::{from_settings, SpeechToText, UnavailableModel};

/// Prefix of the per-call directory holding the working waveforms.
pub const WORKDIR_PREFIX: &str = "docscribe_audio";

/// A finished transcription and the outcome of saving it.
#[derive(Debug)]
pub struct Transcript {
    pub text: String,
    /// Set when the `[timestamp] transcript` record could not be written.
    pub save_error: Option<std::io::Error>,
}

/// Transcribe `input` with `model` and persist the transcript to `output`.
///
/// Returns the transcript, or an [`ExtractError::Transcribe`] if the audio
/// could not be decoded or recognized.  Never panics on bad input.
pub fn transcribe_audio(input: &Path, output: &Path, model: &dyn SpeechToText) -> ExtractResult {
    transcribe_and_save(input, output, model).map(|t| t.text)
}

/// Like [`transcribe_audio`], but also reports whether the record was saved.
pub fn transcribe_and_save(
    input: &Path,
    output: &Path,
    model: &dyn SpeechToText,
) -> Result<Transcript, ExtractError> {
    let temps = TempWavs::for_input(input)
        .map_err(|e| ExtractError::transcribe(input, format!("creating work dir: {e}")))?;
    let text = run_stages(input, &temps, model)
        .map_err(|e| ExtractError::transcribe(input, format!("{e:#}")))?;

    let save_error = write_to_text_file(&text, output).err();
    if let Some(e) = &save_error {
        warn!("could not save transcript to {}: {e}", output.display());
    }
    Ok(Transcript { text, save_error })
}

fn run_stages(input: &Path, temps: &TempWavs, model: &dyn SpeechToText) -> anyhow::Result<String> {
    convert::convert_to_wav(input, &temps.normalized).context("Failed to convert audio to wav")?;

    if let Err(e) = denoise::reduce_noise(&temps.normalized, &temps.processed) {
        debug!("noise reduction skipped for {}: {e:#}", input.display());
    }

    let waveform = if temps.processed.exists() {
        &temps.processed
    } else {
        &temps.normalized
    };
    model.transcribe(waveform).context("speech-to-text failed")
}

/// The two working waveforms of one transcription call, inside a fresh
/// temporary directory.  Dropping the guard deletes the directory; deletion
/// errors are ignored.
pub struct TempWavs {
    pub normalized: PathBuf,
    pub processed: PathBuf,
    dir: tempfile::TempDir,
}

impl TempWavs {
    /// `<stem>_temp.wav` and `<stem>_processed.wav` in a new directory
    /// under the system temp dir.
    pub fn for_input(input: &Path) -> std::io::Result<Self> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let dir = tempfile::Builder::new().prefix(WORKDIR_PREFIX).tempdir()?;
        Ok(Self {
            normalized: dir.path().join(format!("{stem}_temp.wav")),
            processed: dir.path().join(format!("{stem}_processed.wav")),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Check if a file is transcribable audio based on extension.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(is_audio_ext)
        .unwrap_or(false)
}

pub fn is_audio_ext(ext: &str) -> bool {
    matches!(ext.to_lowercase().as_str(), "m4a" | "mp3" | "wav")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use docscribe_common::output::parse_record;

    /// Records the waveform it was handed and answers with a fixed transcript.
    struct FakeModel {
        reply: anyhow::Result<String>,
        seen: Mutex<Vec<PathBuf>>,
    }

    impl FakeModel {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.to_string()), seen: Mutex::new(vec![]) }
        }

        fn failing(msg: &str) -> Self {
            Self { reply: Err(anyhow::anyhow!(msg.to_string())), seen: Mutex::new(vec![]) }
        }
    }

    impl SpeechToText for FakeModel {
        fn transcribe(&self, wav: &Path) -> anyhow::Result<String> {
            assert!(wav.exists(), "waveform handed to the model must exist");
            self.seen.lock().unwrap().push(wav.to_path_buf());
            match &self.reply {
                Ok(t) => Ok(t.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn write_tone(path: &Path) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..1600 {
            w.write_sample(((i as f32 * 0.1).sin() * 3000.0) as i16).unwrap();
        }
        w.finalize().unwrap();
    }

    fn leftover_wavs(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with("_temp.wav") || n.ends_with("_processed.wav"))
            .collect()
    }

    #[test]
    fn test_temp_names() {
        let t = TempWavs::for_input(Path::new("uploads/call.m4a")).unwrap();
        assert_eq!(t.normalized, t.dir().join("call_temp.wav"));
        assert_eq!(t.processed, t.dir().join("call_processed.wav"));
        assert!(!t.dir().starts_with("uploads"));

        let dir = t.dir().to_path_buf();
        assert!(dir.is_dir());
        drop(t);
        assert!(!dir.exists());
    }

    #[test]
    fn test_neighbouring_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("voice.wav");
        write_tone(&input);
        let neighbour = dir.path().join("voice_temp.wav");
        let other = dir.path().join("voice_processed.wav");
        std::fs::write(&neighbour, b"someone else's file").unwrap();
        std::fs::write(&other, b"another one").unwrap();
        let model = FakeModel::ok("spoken");

        transcribe_audio(&input, &dir.path().join("voice.txt"), &model).unwrap();

        assert_eq!(std::fs::read(&neighbour).unwrap(), b"someone else's file");
        assert_eq!(std::fs::read(&other).unwrap(), b"another one");
        let seen = model.seen.lock().unwrap();
        assert!(!seen[0].starts_with(dir.path()));
        // The work dir is gone once the call returns.
        assert!(!seen[0].parent().unwrap().exists());
    }

    #[test]
    fn test_transcribe_persists_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        let output = dir.path().join("out/memo.wav.txt");
        write_tone(&input);
        let model = FakeModel::ok("hello world");

        let text = transcribe_audio(&input, &output, &model).unwrap();

        assert_eq!(text, "hello world");
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(parse_record(&content).map(|(_, body)| body), Some("hello world"));
        assert!(leftover_wavs(dir.path()).is_empty());
        // The noise-reduced waveform is preferred.
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].ends_with("memo_processed.wav"));
    }

    #[test]
    fn test_conversion_failure_is_reported_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.mp3");
        let output = dir.path().join("broken.txt");
        std::fs::write(&input, b"not really an mp3").unwrap();
        let model = FakeModel::ok("unused");

        let err = transcribe_audio(&input, &output, &model).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Error transcribing"), "{msg}");
        assert!(msg.contains("Failed to convert audio to wav"), "{msg}");
        assert!(msg.contains(&input.display().to_string()));
        assert!(model.seen.lock().unwrap().is_empty());
        assert!(!output.exists());
        assert!(leftover_wavs(dir.path()).is_empty());
    }

    #[test]
    fn test_model_failure_is_reported_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        let output = dir.path().join("memo.txt");
        write_tone(&input);
        let model = FakeModel::failing("model exploded");

        let err = transcribe_audio(&input, &output, &model).unwrap_err();

        assert!(matches!(err, ExtractError::Transcribe { .. }));
        assert!(err.to_string().contains("model exploded"));
        assert!(!output.exists());
        assert!(leftover_wavs(dir.path()).is_empty());
    }

    #[test]
    fn test_persistence_failure_still_returns_text() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        write_tone(&input);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let text = transcribe_audio(&input, &blocker.join("memo.txt"), &FakeModel::ok("kept")).unwrap();

        assert_eq!(text, "kept");
        assert!(leftover_wavs(dir.path()).is_empty());
    }

    #[test]
    fn test_save_outcome_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("memo.wav");
        write_tone(&input);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();

        let saved = transcribe_and_save(&input, &dir.path().join("memo.txt"), &FakeModel::ok("a")).unwrap();
        assert!(saved.save_error.is_none());

        let unsaved = transcribe_and_save(&input, &blocker.join("memo.txt"), &FakeModel::ok("b")).unwrap();
        assert_eq!(unsaved.text, "b");
        assert!(unsaved.save_error.is_some());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("absent.m4a");

        let msg = transcribe_audio(&input, &dir.path().join("o.txt"), &FakeModel::ok("x"))
            .unwrap_err()
            .to_string();
        assert!(msg.starts_with("Error transcribing"));
    }

    #[test]
    fn test_accepts() {
        assert!(accepts(Path::new("a.m4a")));
        assert!(accepts(Path::new("a.MP3")));
        assert!(accepts(Path::new("a.wav")));
        assert!(!accepts(Path::new("a.flac")));
        assert!(!accepts(Path::new("a.txt")));
    }
}
