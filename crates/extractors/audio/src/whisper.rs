//! whisper.cpp backend (feature `whisper`).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use docscribe_common::config::TranscriptionSettings;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::denoise::read_mono;
use crate::model::SpeechToText;

/// Whisper expects 16 kHz mono input.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// A GGML whisper model, loaded on first use and shared by later calls.
///
/// A failed load is not cached; the next call tries again.
pub struct WhisperModel {
    model_path: PathBuf,
    language: Option<String>,
    threads: Option<usize>,
    ctx: Mutex<Option<Arc<WhisperContext>>>,
}

impl WhisperModel {
    pub fn new(settings: &TranscriptionSettings) -> Self {
        Self {
            model_path: settings.model_path.clone(),
            language: settings.language.clone(),
            threads: settings.threads,
            ctx: Mutex::new(None),
        }
    }

    fn context(&self) -> Result<Arc<WhisperContext>> {
        let mut guard = self.ctx.lock().map_err(|_| anyhow!("whisper context lock poisoned"))?;
        if let Some(ctx) = guard.as_ref() {
            return Ok(ctx.clone());
        }

        let path = self
            .model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path is not valid UTF-8"))?;
        if !self.model_path.exists() {
            return Err(anyhow!("model file not found: {path}"));
        }

        // CPU inference only: no GPU, no flash attention, so no half-precision math.
        let mut params = WhisperContextParameters::default();
        params.use_gpu(false);
        params.flash_attn(false);

        info!("loading whisper model {path}");
        let ctx = WhisperContext::new_with_params(path, params)
            .map_err(|e| anyhow!("failed to load whisper model {path}: {e}"))?;
        let ctx = Arc::new(ctx);
        *guard = Some(ctx.clone());
        Ok(ctx)
    }
}

impl SpeechToText for WhisperModel {
    fn transcribe(&self, wav: &Path) -> Result<String> {
        let (samples, rate) = read_mono(wav).context("reading waveform")?;
        let samples = resample(&samples, rate, WHISPER_SAMPLE_RATE)?;

        let ctx = self.context()?;
        let mut state = ctx
            .create_state()
            .map_err(|e| anyhow!("failed to create whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(self.language.as_deref());
        if let Some(threads) = self.threads {
            params.set_n_threads(i32::try_from(threads).unwrap_or(i32::MAX));
        }
        params.set_translate(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| anyhow!("inference failed: {e}"))?;

        let mut text = String::new();
        for i in 0..state.full_n_segments() {
            let segment = state
                .get_segment(i)
                .ok_or_else(|| anyhow!("missing segment {i}"))?;
            let segment_text = segment
                .to_str_lossy()
                .map_err(|e| anyhow!("reading segment {i}: {e}"))?;
            text.push_str(&segment_text);
        }
        Ok(text.trim().to_string())
    }
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(
        f64::from(to_rate) / f64::from(from_rate),
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| anyhow!("creating resampler: {e}"))?;

    let mut out = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| anyhow!("resampling: {e}"))?;
    Ok(out.remove(0))
}
