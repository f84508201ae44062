use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::FramesConfig;
use crate::decoder::Decoder;
use crate::frames::renamer::{rename_frames, RenameSummary};
use crate::frames::sampler::sample_frames;
use crate::frames::timestamps::reconstruct;
use crate::media::MediaFile;
use crate::ocr::{Classifier, ClassifySummary};
use crate::progress::Reporter;

#[derive(Debug, Clone)]
pub struct FrameSettings {
    pub decoder: Decoder,
    pub fps: u32,
    pub resolution: String,
}

impl FrameSettings {
    pub fn from_config(config: &FramesConfig) -> Self {
        Self {
            decoder: Decoder::new(
                &config.decoder,
                Duration::from_secs(config.decoder_timeout_secs),
            ),
            fps: config.fps,
            resolution: config.resolution.clone(),
        }
    }
}

/// What the frame pipeline produced for one file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub sampled: usize,
    pub renamed: RenameSummary,
    pub classified: ClassifySummary,
}

/// Sample, timestamp and classify the frames of `media`. Candidates live in
/// a temporary directory inside the output directory; legible ones end up
/// in `media.frames_dir()`.
pub fn run_frame_pipeline(
    media: &MediaFile,
    settings: &FrameSettings,
    classifier: &Classifier,
    reporter: &Reporter,
) -> Result<FrameReport> {
    std::fs::create_dir_all(&media.output_dir)
        .with_context(|| format!("Failed to create {}", media.output_dir.display()))?;
    let candidates = tempfile::Builder::new()
        .prefix(".frames-")
        .tempdir_in(&media.output_dir)
        .context("Failed to create temporary frame directory")?;

    let result = sample_and_classify(media, settings, classifier, reporter, candidates.path());

    let candidates_path = candidates.path().to_path_buf();
    if let Err(e) = candidates.close() {
        tracing::warn!(
            "Failed to remove temporary frames {}: {}",
            candidates_path.display(),
            e
        );
    }
    result
}

fn sample_and_classify(
    media: &MediaFile,
    settings: &FrameSettings,
    classifier: &Classifier,
    reporter: &Reporter,
    candidates: &Path,
) -> Result<FrameReport> {
    reporter.status(format!("Extracting frames from {}", media.path.display()));
    let lines = sample_frames(
        &settings.decoder,
        &media.path,
        candidates,
        settings.fps,
        &settings.resolution,
    )?;

    let timestamps = reconstruct(&lines);
    tracing::info!(
        "{} frames sampled from {}",
        timestamps.len(),
        media.path.display()
    );

    let renamed = rename_frames(candidates, &media.safe_stem(), &timestamps)?;
    if renamed.missing > 0 {
        tracing::warn!("{} sampled frames were missing on disk", renamed.missing);
    }

    reporter.status(format!("Checking {} frames for text", timestamps.len()));
    let classified = classifier.classify_dir(candidates, &media.frames_dir(), |done, total| {
        reporter.progress(done, total)
    })?;
    reporter.status(format!(
        "{} of {} frames kept",
        classified.legible, classified.examined
    ));

    Ok(FrameReport {
        sampled: timestamps.len(),
        renamed,
        classified,
    })
}
