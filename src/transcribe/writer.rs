use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::transcribe::backend::Segment;

/// Format seconds as `HH:MM:SS,mmm`. The millisecond part is truncated,
/// like frame-name timestamps.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.trunc();
    let ms = ((seconds - whole) * 1000.0) as u64;
    let total_secs = whole as u64;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;

    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Writes a subtitle file and its plain time-coded transcript side by side.
/// Both files exist as soon as the writer is created, even if no segment is
/// ever written.
pub struct TranscriptWriter {
    srt: BufWriter<File>,
    transcript: BufWriter<File>,
    count: usize,
}

impl TranscriptWriter {
    pub fn create(srt_path: &Path, transcript_path: &Path) -> Result<Self> {
        let srt = File::create(srt_path)
            .with_context(|| format!("Failed to create {}", srt_path.display()))?;
        let transcript = File::create(transcript_path)
            .with_context(|| format!("Failed to create {}", transcript_path.display()))?;
        Ok(Self {
            srt: BufWriter::new(srt),
            transcript: BufWriter::new(transcript),
            count: 0,
        })
    }

    /// Write `segment`'s timing with `text` (the segment's own text or a
    /// translation of it).
    pub fn write_segment(&mut self, segment: &Segment, text: &str) -> Result<()> {
        let start = format_timestamp(segment.start);
        let end = format_timestamp(segment.end);
        write!(self.srt, "{}\n{} --> {}\n{}\n\n", segment.id, start, end, text)?;
        writeln!(self.transcript, "{}: {}", start, text)?;
        self.count += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.srt.flush()?;
        self.transcript.flush()?;
        Ok(self.count)
    }
}
