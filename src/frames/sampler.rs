use std::ffi::OsString;
use std::path::Path;

use crate::decoder::{Decoder, DecoderError};

/// Name pattern the decoder writes sampled frames under.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Name of the `index`-th sampled frame (1-based, as the decoder numbers them).
pub fn frame_name(index: usize) -> String {
    format!("frame_{:06}.png", index)
}

/// Decode `media` at `fps` frames per second scaled to `resolution`,
/// writing numbered PNGs into `out_dir`. Returns the decoder's per-frame
/// log lines carrying `pts_time`, in emission order.
pub fn sample_frames(
    decoder: &Decoder,
    media: &Path,
    out_dir: &Path,
    fps: u32,
    resolution: &str,
) -> Result<Vec<String>, DecoderError> {
    let filter = format!("fps={},scale={},showinfo", fps, resolution);
    let args: Vec<OsString> = vec![
        "-i".into(),
        media.into(),
        "-vf".into(),
        filter.into(),
        out_dir.join(FRAME_PATTERN).into(),
    ];

    tracing::debug!(
        "Sampling {} at {} fps ({}) into {}",
        media.display(),
        fps,
        resolution,
        out_dir.display()
    );
    decoder.run(args, |line| line.contains("pts_time"))
}
