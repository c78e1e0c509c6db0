//! Format normalization: decode any supported container/codec and re-encode
//! it as 16-bit PCM WAV.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Decode `src` (format hinted by its extension) and write it to `dst` as a
/// 16-bit PCM WAV with the source sample rate and channel count.
///
/// On error `dst` may be left partially written; the caller owns its cleanup.
pub fn convert_to_wav(src: &Path, dst: &Path) -> Result<()> {
    let file = File::open(src)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = src.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("no audio track found"))?;
    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut writer: Option<hound::WavWriter<BufWriter<File>>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt frames are skipped, as players do.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!("skipping undecodable packet in {}: {e}", src.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if writer.is_none() {
            let wav_spec = hound::WavSpec {
                channels: spec.channels.count() as u16,
                sample_rate: spec.rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            writer = Some(hound::WavWriter::create(dst, wav_spec)?);
        }
        let Some(w) = writer.as_mut() else { continue };

        let mut samples = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        samples.copy_interleaved_ref(decoded);
        for s in samples.samples() {
            w.write_sample(*s)?;
        }
    }

    let writer = writer.ok_or_else(|| anyhow!("no audio frames decoded"))?;
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine(path: &Path, channels: u16, rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i as f32 * 0.05).sin() * 8000.0) as i16;
            for _ in 0..channels {
                w.write_sample(v).unwrap();
            }
        }
        w.finalize().unwrap();
    }

    #[test]
    fn test_wav_round_trips_through_normalization() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tone.wav");
        let dst = dir.path().join("tone_temp.wav");
        write_sine(&src, 2, 22050, 4410);

        convert_to_wav(&src, &dst).unwrap();

        let reader = hound::WavReader::open(&dst).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 4410);
    }

    #[test]
    fn test_garbage_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("fake.mp3");
        std::fs::write(&src, b"definitely not audio").unwrap();

        assert!(convert_to_wav(&src, &dir.path().join("out.wav")).is_err());
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(convert_to_wav(&dir.path().join("absent.m4a"), &dir.path().join("out.wav")).is_err());
    }
}
