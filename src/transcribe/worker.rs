use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::{Config, TranscriptionConfig, TranslationConfig};
use crate::decoder::Decoder;
use crate::media::MediaFile;
use crate::progress::Reporter;
use crate::transcribe::audio::extract_audio;
use crate::transcribe::backend::{build_backend, Transcription, TranscriptionBackend};
use crate::transcribe::writer::TranscriptWriter;
use crate::translate::{AzureTranslator, Translator};

/// Where speech and translation models come from.
pub trait ModelProvider: Send + Sync {
    fn speech_backend(&self) -> Result<Box<dyn TranscriptionBackend>>;
    fn translator(&self, source: &str, target: &str) -> Result<Box<dyn Translator>>;
}

/// Models described by the config file.
#[derive(Debug, Clone)]
pub struct ConfiguredModels {
    transcription: TranscriptionConfig,
    translation: TranslationConfig,
}

impl ConfiguredModels {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transcription: config.transcription.clone(),
            translation: config.translation.clone(),
        }
    }
}

impl ModelProvider for ConfiguredModels {
    fn speech_backend(&self) -> Result<Box<dyn TranscriptionBackend>> {
        build_backend(&self.transcription)
    }

    fn translator(&self, source: &str, target: &str) -> Result<Box<dyn Translator>> {
        Ok(Box::new(AzureTranslator::new(
            &self.transcription.azure,
            &self.translation,
            source,
            target,
        )?))
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionSettings {
    pub decoder: Decoder,
    /// Forced source language.
    pub language: Option<String>,
    pub target_language: String,
    pub translate: bool,
}

impl TranscriptionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            decoder: Decoder::new(
                &config.frames.decoder,
                Duration::from_secs(config.frames.decoder_timeout_secs),
            ),
            language: config.transcription.language.clone(),
            target_language: config.transcription.target_language.clone(),
            translate: config.translation.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionReport {
    pub language: String,
    pub segments: usize,
    pub translated: bool,
}

/// Transcribe `media` once and write its subtitle and transcript files,
/// translating into the target language when the spoken language differs.
pub fn run_transcription(
    media: &MediaFile,
    settings: &TranscriptionSettings,
    models: &dyn ModelProvider,
    reporter: &Reporter,
) -> Result<TranscriptionReport> {
    reporter.status("Loading speech model");
    let backend = models.speech_backend()?;

    std::fs::create_dir_all(&media.output_dir)
        .with_context(|| format!("Failed to create {}", media.output_dir.display()))?;
    let transcription = transcribe_media(media, settings, backend.as_ref(), reporter)?;
    tracing::info!(
        "{}: language {}, {} segments",
        media.path.display(),
        transcription.language,
        transcription.segments.len()
    );

    let needs_translation =
        settings.translate && transcription.language != settings.target_language;
    if needs_translation {
        let translator = models.translator(&transcription.language, &settings.target_language)?;
        write_translated(media, &transcription, translator.as_ref(), reporter)?;
    } else {
        write_source(media, &transcription, reporter)?;
    }

    reporter.status("Transcription finished");
    Ok(TranscriptionReport {
        language: transcription.language,
        segments: transcription.segments.len(),
        translated: needs_translation,
    })
}

fn transcribe_media(
    media: &MediaFile,
    settings: &TranscriptionSettings,
    backend: &dyn TranscriptionBackend,
    reporter: &Reporter,
) -> Result<Transcription> {
    let scratch = tempfile::Builder::new()
        .prefix(".audio-")
        .tempdir_in(&media.output_dir)
        .context("Failed to create temporary audio directory")?;

    let result = (|| {
        reporter.status("Extracting audio");
        let wav = extract_audio(&settings.decoder, &media.path, scratch.path())?;
        reporter.status(format!("Transcribing with {}", backend.name()));
        backend.transcribe(&wav, settings.language.as_deref())
    })();

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::warn!(
            "Failed to remove temporary audio {}: {}",
            scratch_path.display(),
            e
        );
    }
    result
}

fn write_source(media: &MediaFile, transcription: &Transcription, reporter: &Reporter) -> Result<()> {
    let mut writer =
        TranscriptWriter::create(&media.subtitle_path(None), &media.transcript_path(None))?;
    let total = transcription.segments.len();
    if total == 0 {
        reporter.progress(0, 0);
    }
    for (i, segment) in transcription.segments.iter().enumerate() {
        writer.write_segment(segment, &segment.text)?;
        tracing::debug!("Segment {}: {}", segment.id, segment.text);
        reporter.progress(i + 1, total);
    }
    writer.finish()?;
    Ok(())
}

fn write_translated(
    media: &MediaFile,
    transcription: &Transcription,
    translator: &dyn Translator,
    reporter: &Reporter,
) -> Result<()> {
    let language = transcription.language.as_str();
    let mut source = TranscriptWriter::create(
        &media.subtitle_path(Some(language)),
        &media.transcript_path(Some(language)),
    )?;
    let mut target =
        TranscriptWriter::create(&media.subtitle_path(None), &media.transcript_path(None))?;

    let total = transcription.segments.len();
    if total == 0 {
        reporter.progress(0, 0);
    }
    for (i, segment) in transcription.segments.iter().enumerate() {
        source.write_segment(segment, &segment.text)?;
        let translated = translator
            .translate(&segment.text)
            .with_context(|| format!("Failed to translate segment {}", segment.id))?;
        target.write_segment(segment, &translated)?;
        tracing::debug!("Segment {}: {} | {}", segment.id, segment.text, translated);
        reporter.progress(i + 1, total);
    }
    source.finish()?;
    target.finish()?;
    Ok(())
}


#[cfg(all(test, unix))]
mod tests {
    use super::test_support::FakeModels;
    use super::*;
    use crate::decoder::test_support::fake_program;
    use crate::progress::ProgressMessage;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use tempfile::TempDir;

    /// Decoder that writes an empty file at its last argument.
    fn touching_decoder(dir: &Path) -> Decoder {
        let program = fake_program(dir, "ffmpeg.sh", "for last; do :; done\ntouch \"$last\"");
        Decoder::new(program, Duration::from_secs(10))
    }

    fn settings(dir: &Path) -> TranscriptionSettings {
        TranscriptionSettings {
            decoder: touching_decoder(dir),
            language: None,
            target_language: "pt".to_string(),
            translate: true,
        }
    }

    fn media(dir: &Path) -> MediaFile {
        let path: PathBuf = dir.join("talk.mp4");
        std::fs::write(&path, b"").unwrap();
        MediaFile::new(&path, None).unwrap()
    }

    #[test]
    fn test_same_language_writes_two_files() {
        let tmp = TempDir::new().unwrap();
        let media = media(tmp.path());
        let models = FakeModels::new(Transcription::from_spans(
            "pt",
            vec![(0.0, 2.5, "olá"), (2.5, 5.0, "mundo")],
        ));
        let (tx, rx) = mpsc::channel();

        let report = run_transcription(&media, &settings(tmp.path()), &models, &Reporter::new(tx)).unwrap();
        assert_eq!(report.segments, 2);
        assert!(!report.translated);
        assert_eq!(models.translator_loads.load(Ordering::SeqCst), 0);

        let srt = std::fs::read_to_string(media.subtitle_path(None)).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nolá\n\n"));
        assert!(!media.subtitle_path(Some("pt")).exists());

        let progress: Vec<f32> = rx
            .try_iter()
            .filter_map(|m| match m {
                ProgressMessage::Progress(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![0.5, 1.0]);

        // Only the outputs remain; the scratch audio directory is gone.
        assert_eq!(std::fs::read_dir(&media.output_dir).unwrap().count(), 2);
    }

    #[test]
    fn test_other_language_is_translated_once() {
        let tmp = TempDir::new().unwrap();
        let media = media(tmp.path());
        let models = FakeModels::new(Transcription::from_spans(
            "en",
            vec![(0.0, 2.5, "hello"), (2.5, 5.0, "world")],
        ));
        let (tx, _rx) = mpsc::channel();

        let report = run_transcription(&media, &settings(tmp.path()), &models, &Reporter::new(tx)).unwrap();
        assert!(report.translated);
        assert_eq!(models.speech_loads.load(Ordering::SeqCst), 1);
        assert_eq!(models.translator_loads.load(Ordering::SeqCst), 1);

        let source = std::fs::read_to_string(media.transcript_path(Some("en"))).unwrap();
        assert_eq!(source, "00:00:00,000: hello\n00:00:02,500: world\n");
        let target = std::fs::read_to_string(media.transcript_path(None)).unwrap();
        assert_eq!(target, "00:00:00,000: [pt] hello\n00:00:02,500: [pt] world\n");
        assert!(media.subtitle_path(Some("en")).exists());
    }

    #[test]
    fn test_translation_disabled_writes_source_only() {
        let tmp = TempDir::new().unwrap();
        let media = media(tmp.path());
        let models = FakeModels::new(Transcription::from_spans("en", vec![(0.0, 1.0, "hello")]));
        let mut settings = settings(tmp.path());
        settings.translate = false;
        let (tx, _rx) = mpsc::channel();

        let report = run_transcription(&media, &settings, &models, &Reporter::new(tx)).unwrap();
        assert!(!report.translated);
        let target = std::fs::read_to_string(media.transcript_path(None)).unwrap();
        assert_eq!(target, "00:00:00,000: hello\n");
        assert!(!media.transcript_path(Some("en")).exists());
    }

    #[test]
    fn test_silent_audio_creates_empty_files() {
        let tmp = TempDir::new().unwrap();
        let media = media(tmp.path());
        let models = FakeModels::new(Transcription::from_spans("pt", Vec::<(f64, f64, &str)>::new()));
        let (tx, rx) = mpsc::channel();

        let report = run_transcription(&media, &settings(tmp.path()), &models, &Reporter::new(tx)).unwrap();
        assert_eq!(report.segments, 0);
        assert_eq!(std::fs::metadata(media.subtitle_path(None)).unwrap().len(), 0);
        assert_eq!(std::fs::metadata(media.transcript_path(None)).unwrap().len(), 0);
        assert!(rx.try_iter().any(|m| m == ProgressMessage::Progress(1.0)));
    }

    #[test]
    fn test_model_load_failure_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let media = media(tmp.path());
        let (tx, _rx) = mpsc::channel();
        let err = run_transcription(&media, &settings(tmp.path()), &FakeModels::broken(), &Reporter::new(tx))
            .unwrap_err();
        assert!(err.to_string().contains("model file not found"));
        assert!(!media.subtitle_path(None).exists());
    }
}
