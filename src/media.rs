use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;

const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "flac", "m4a", "aac", "ogg", "opus", "wma", "aiff", "aif",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "mpeg", "mpg", "3gp",
];

/// Transcripts at or under this size do not count as a finished run.
const PROCESSED_MIN_BYTES: u64 = 1024;

/// Suffix of the plain time-coded transcript file.
pub const TRANSCRIPT_SUFFIX: &str = "-Fala.Cronometrada.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(OsStr::to_str)?.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Audio)
        } else {
            None
        }
    }
}

/// One input being processed. Never mutated once built.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub output_dir: PathBuf,
}

impl MediaFile {
    /// Classify `path` and derive its output directory under `output_root`
    /// (or beside the input when no root is configured).
    pub fn new(path: &Path, output_root: Option<&Path>) -> Result<Self> {
        let kind = MediaKind::from_path(path).ok_or_else(|| {
            anyhow::anyhow!("Unsupported media type: {}", path.display())
        })?;
        let stem = file_stem(path)?;
        let root = match output_root {
            Some(root) => root.to_path_buf(),
            None => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Ok(Self {
            path: path.to_path_buf(),
            kind,
            output_dir: root.join(stem),
        })
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Stem reduced to characters that are safe in any file name.
    pub fn safe_stem(&self) -> String {
        safe_file_name(&self.stem())
    }

    /// Destination for frames that passed the legibility check.
    pub fn frames_dir(&self) -> PathBuf {
        self.output_dir.join(format!("frames_{}", self.stem()))
    }

    pub fn subtitle_path(&self, language: Option<&str>) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.srt", self.stem(), language_suffix(language)))
    }

    pub fn transcript_path(&self, language: Option<&str>) -> PathBuf {
        self.output_dir.join(format!(
            "{}{}{}",
            self.stem(),
            language_suffix(language),
            TRANSCRIPT_SUFFIX
        ))
    }

    /// A previous run left a non-trivial transcript behind.
    pub fn is_processed(&self) -> bool {
        std::fs::metadata(self.transcript_path(None))
            .map(|m| m.is_file() && m.len() > PROCESSED_MIN_BYTES)
            .unwrap_or(false)
    }
}

fn language_suffix(language: Option<&str>) -> String {
    language.map(|l| format!("-{}", l)).unwrap_or_default()
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("media path has no file name: {}", path.display()))
}

/// Replace anything other than ASCII alphanumerics, `-`, `_` and `.` with `_`.
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Expand the given inputs into media files. Directories are searched
/// (recursively when asked); explicit files are kept even if their
/// extension is unknown so the caller can report them.
pub fn collect_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_dir(input, recursive, &mut found)?;
        } else {
            found.push(input.clone());
        }
    }
    Ok(found)
}

fn collect_dir(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            if recursive {
                collect_dir(&path, recursive, &mut entries)?;
            }
        } else if MediaKind::from_path(&path).is_some() {
            entries.push(path);
        }
    }
    entries.sort(); // deterministic order
    found.extend(entries);
    Ok(())
}
