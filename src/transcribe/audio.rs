use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::decoder::Decoder;

/// Sample rate every backend expects.
pub const SAMPLE_RATE: u32 = 16_000;

/// Extract the audio track of `media` into `dir/audio.wav` as 16 kHz mono
/// 16-bit PCM.
pub fn extract_audio(decoder: &Decoder, media: &Path, dir: &Path) -> Result<PathBuf> {
    let wav = dir.join("audio.wav");
    let args: Vec<OsString> = vec![
        "-y".into(),
        "-i".into(),
        media.into(),
        "-vn".into(),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        SAMPLE_RATE.to_string().into(),
        "-acodec".into(),
        "pcm_s16le".into(),
        wav.clone().into(),
    ];
    decoder.run(args, |_| false)?;
    if !wav.is_file() {
        anyhow::bail!("Decoder finished but {} was not written", wav.display());
    }
    Ok(wav)
}

/// Read a 16-bit WAV into `f32` samples in `[-1.0, 1.0]`.
pub fn read_samples(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();
    if spec.sample_rate != SAMPLE_RATE || spec.channels != 1 {
        tracing::warn!(
            "{} is {} Hz / {} channels, expected {} Hz mono",
            path.display(),
            spec.sample_rate,
            spec.channels,
            SAMPLE_RATE
        );
    }
    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(samples)
}
