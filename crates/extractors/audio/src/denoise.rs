//! Noise reduction: mono downmix followed by a pre-emphasis filter.

use std::path::Path;

use anyhow::Result;

/// Pre-emphasis coefficient.
pub const PREEMPHASIS_COEF: f32 = 0.97;

/// Apply `y[n] = x[n] - coef * x[n-1]`.
///
/// The filter state before the first sample is `2*x[0] - x[1]`, so a signal
/// that starts on a straight line starts filtered without a step.
pub fn preemphasis(samples: &[f32], coef: f32) -> Vec<f32> {
    let Some(&first) = samples.first() else {
        return Vec::new();
    };
    let mut prev = match samples.get(1) {
        Some(&second) => 2.0 * first - second,
        None => first,
    };
    samples
        .iter()
        .map(|&x| {
            let y = x - coef * prev;
            prev = x;
            y
        })
        .collect()
}

/// Read a WAV file as mono `f32` in `[-1.0, 1.0]`, averaging channels.
/// Returns the samples and the sample rate.
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };
    Ok((mono, spec.sample_rate))
}

/// Load `src`, pre-emphasize it and write the result to `dst` as a mono
/// 32-bit float WAV at the source sample rate.
///
/// On failure `dst` is removed so callers can use its existence as the
/// success signal.
pub fn reduce_noise(src: &Path, dst: &Path) -> Result<()> {
    let result = write_preemphasized(src, dst);
    if result.is_err() {
        let _ = std::fs::remove_file(dst);
    }
    result
}

fn write_preemphasized(src: &Path, dst: &Path) -> Result<()> {
    let (samples, sample_rate) = read_mono(src)?;
    let filtered = preemphasis(&samples, PREEMPHASIS_COEF);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(dst, spec)?;
    for s in filtered {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
