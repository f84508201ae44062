use std::path::Path;

use anyhow::Result;

use crate::config::TranscriptionConfig;

/// One time-coded piece of speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Sequential, starting at 1.
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A complete transcription, materialized once per file.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    /// ISO 639-1 code of the spoken language.
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcription {
    /// Number raw `(start, end, text)` spans from 1, trimming text and
    /// clamping `end` so it never precedes `start`.
    pub fn from_spans<I, S>(language: impl Into<String>, spans: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, S)>,
        S: AsRef<str>,
    {
        let segments = spans
            .into_iter()
            .enumerate()
            .map(|(i, (start, end, text))| Segment {
                id: i + 1,
                start,
                end: end.max(start),
                text: text.as_ref().trim().to_string(),
            })
            .collect();
        Self {
            language: language.into(),
            segments,
        }
    }
}

pub trait TranscriptionBackend: Send {
    fn name(&self) -> &str;
    /// Transcribe a 16 kHz mono WAV. `language` forces the spoken language;
    /// `None` asks the model to detect it.
    fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcription>;
}

/// Why `backend` cannot be built in this binary, if it cannot.
pub fn backend_unavailable(backend: &str) -> Option<String> {
    match backend {
        "local" if !cfg!(feature = "whisper-local") => Some(
            "Local whisper backend not compiled in (enable the `whisper-local` feature)".to_string(),
        ),
        "local" | "azure" => None,
        other => Some(format!("Unknown transcription backend: {}", other)),
    }
}

/// Build the configured speech backend.
pub fn build_backend(config: &TranscriptionConfig) -> Result<Box<dyn TranscriptionBackend>> {
    match config.backend.as_str() {
        "local" => {
            #[cfg(feature = "whisper-local")]
            {
                use crate::transcribe::whisper_local::WhisperLocal;
                Ok(Box::new(WhisperLocal::new(&config.model, config.beam_size)?))
            }
            #[cfg(not(feature = "whisper-local"))]
            {
                anyhow::bail!(
                    "Local whisper backend not compiled in (enable the `whisper-local` feature)"
                )
            }
        }
        "azure" => {
            use crate::transcribe::azure_openai::AzureOpenAIBackend;
            Ok(Box::new(AzureOpenAIBackend::new(&config.azure)?))
        }
        other => anyhow::bail!("Unknown transcription backend: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_spans_numbers_and_trims() {
        let t = Transcription::from_spans(
            "en",
            vec![(0.0, 2.5, " hello "), (2.5, 5.0, "world"), (6.0, 5.5, "late")],
        );
        assert_eq!(t.segments.len(), 3);
        assert_eq!(
            t.segments.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(t.segments[0].text, "hello");
        assert_eq!(t.segments[2].end, 6.0);
        assert!(t.segments.iter().all(|s| s.start <= s.end));
    }

    #[test]
    fn test_build_backend_unknown_name() {
        let config = TranscriptionConfig {
            backend: "carrier-pigeon".to_string(),
            ..TranscriptionConfig::default()
        };
        let err = build_backend(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_backend_unavailable() {
        assert_eq!(backend_unavailable("azure"), None);
        assert!(backend_unavailable("carrier-pigeon")
            .unwrap()
            .contains("carrier-pigeon"));
        assert_eq!(
            backend_unavailable("local").is_none(),
            cfg!(feature = "whisper-local")
        );
    }

    #[test]
    fn test_build_azure_backend_requires_key() {
        if std::env::var("FRAMESCRIBE_AZURE_KEY").is_ok() {
            return;
        }
        let config = TranscriptionConfig {
            backend: "azure".to_string(),
            ..TranscriptionConfig::default()
        };
        assert!(build_backend(&config).is_err());
    }
}
