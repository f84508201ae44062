use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::sampler::frame_name;
use super::timestamps::FrameTimestamp;

/// What a rename pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: usize,
    pub already_present: usize,
    pub missing: usize,
}

/// Target name for a frame of `base` sampled at `timestamp`.
pub fn timestamped_name(base: &str, timestamp: &FrameTimestamp) -> String {
    format!("frame_{}_{}.png", base, timestamp.file_label())
}

/// Give the Nth extracted frame in `dir` the name of the Nth timestamp.
/// Missing frames are logged and skipped; re-running over an already
/// renamed directory is a no-op.
pub fn rename_frames(dir: &Path, base: &str, timestamps: &[FrameTimestamp]) -> Result<RenameSummary> {
    let mut summary = RenameSummary::default();
    for (i, timestamp) in timestamps.iter().enumerate() {
        let source = dir.join(frame_name(i + 1));
        let target: PathBuf = dir.join(timestamped_name(base, timestamp));
        if source.exists() {
            std::fs::rename(&source, &target).with_context(|| {
                format!("Failed to rename {} to {}", source.display(), target.display())
            })?;
            summary.renamed += 1;
        } else if target.exists() {
            summary.already_present += 1;
        } else {
            tracing::warn!("Frame {} not found, skipping", source.display());
            summary.missing += 1;
        }
    }
    Ok(summary)
}
