// Per-file orchestration: the frame pipeline and the transcription worker run
// on their own named threads, each reporting over its own channel, and the
// coordinator relays everything to a ProgressSink until both are done.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::config::Config;
use crate::frames::{run_frame_pipeline, FrameSettings};
use crate::media::{MediaFile, MediaKind};
use crate::ocr::{Classifier, LegibilityRules, OcrEngine, TesseractCli};
use crate::progress::{panic_message, ProgressMessage, ProgressSink, Reporter, Unit};
use crate::transcribe::{
    backend_unavailable, run_transcription, ConfiguredModels, ModelProvider, TranscriptionSettings,
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How one unit ended for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded,
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Processed {
        frames: UnitOutcome,
        transcription: UnitOutcome,
    },
    /// `output.skip_processed` found a finished transcript.
    AlreadyProcessed,
    /// The input could not be turned into a media file at all.
    Rejected(String),
}

#[derive(Debug)]
pub struct BatchReport {
    pub files: Vec<(PathBuf, FileOutcome)>,
    pub elapsed: Duration,
    /// Shutdown was requested before every input was handled.
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
struct Options {
    frames: bool,
    transcription: bool,
    skip_processed: bool,
    output_root: Option<PathBuf>,
}

pub struct Pipeline {
    options: Options,
    frame_settings: FrameSettings,
    classifier: Option<Arc<Classifier>>,
    transcription_settings: TranscriptionSettings,
    models: Arc<dyn ModelProvider>,
}

impl Pipeline {
    /// Pipeline backed by tesseract and the configured speech and
    /// translation models.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.transcription.enabled {
            if let Some(reason) = backend_unavailable(&config.transcription.backend) {
                tracing::warn!("{}; transcription will fail for every file", reason);
            }
        }
        let ocr = Arc::new(TesseractCli::new(
            &config.ocr.tesseract,
            config.ocr.language.clone(),
        ));
        let models = Arc::new(ConfiguredModels::from_config(config));
        Self::with_services(config, ocr, models)
    }

    pub fn with_services(
        config: &Config,
        ocr: Arc<dyn OcrEngine>,
        models: Arc<dyn ModelProvider>,
    ) -> Result<Self> {
        let classifier = if config.frames.enabled {
            let rules = Arc::new(LegibilityRules::from_config(&config.ocr)?);
            Some(Arc::new(Classifier::new(
                ocr,
                rules,
                config.ocr.threshold,
                config.ocr.workers,
            )?))
        } else {
            None
        };

        Ok(Self {
            options: Options {
                frames: config.frames.enabled,
                transcription: config.transcription.enabled,
                skip_processed: config.output.skip_processed,
                output_root: config.output.directory.clone(),
            },
            frame_settings: FrameSettings::from_config(&config.frames),
            classifier,
            transcription_settings: TranscriptionSettings::from_config(config),
            models,
        })
    }

    /// Process every input in order. `shutdown` is checked between files;
    /// the file in flight always runs to completion.
    pub fn run_batch(
        &self,
        inputs: &[PathBuf],
        shutdown: &AtomicBool,
        sink: &mut dyn ProgressSink,
    ) -> BatchReport {
        let started = Instant::now();
        let mut files = Vec::with_capacity(inputs.len());
        let mut interrupted = false;

        for input in inputs {
            if shutdown.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, stopping before {}", input.display());
                interrupted = true;
                break;
            }
            let outcome = self.run_input(input, sink);
            files.push((input.clone(), outcome));
        }

        let elapsed = started.elapsed();
        tracing::info!("Total processing time: {}", format_elapsed(elapsed));
        BatchReport {
            files,
            elapsed,
            interrupted,
        }
    }

    fn run_input(&self, input: &Path, sink: &mut dyn ProgressSink) -> FileOutcome {
        let media = match MediaFile::new(input, self.options.output_root.as_deref()) {
            Ok(media) => media,
            Err(e) => {
                tracing::error!("Skipping {}: {:#}", input.display(), e);
                return FileOutcome::Rejected(format!("{:#}", e));
            }
        };
        if self.options.skip_processed && media.is_processed() {
            tracing::info!("Already processed, skipping: {}", input.display());
            return FileOutcome::AlreadyProcessed;
        }
        if let Err(e) = std::fs::create_dir_all(&media.output_dir) {
            tracing::error!(
                "Cannot create output directory {}: {}",
                media.output_dir.display(),
                e
            );
            return FileOutcome::Rejected(e.to_string());
        }
        self.run_file(&media, sink)
    }

    /// Run both units for one file and wait for both.
    pub fn run_file(&self, media: &MediaFile, sink: &mut dyn ProgressSink) -> FileOutcome {
        sink.file_started(&media.path);
        let started = Instant::now();

        let mut units = Vec::with_capacity(2);
        match (&self.classifier, media.kind) {
            (Some(classifier), MediaKind::Video) if self.options.frames => {
                let media = media.clone();
                let settings = self.frame_settings.clone();
                let classifier = Arc::clone(classifier);
                units.push(RunningUnit::spawn(Unit::Frames, move |reporter| {
                    run_frame_pipeline(&media, &settings, &classifier, reporter).map(|_| ())
                }));
            }
            _ => units.push(RunningUnit::skipped(Unit::Frames)),
        }
        if self.options.transcription {
            let media = media.clone();
            let settings = self.transcription_settings.clone();
            let models = Arc::clone(&self.models);
            units.push(RunningUnit::spawn(Unit::Transcription, move |reporter| {
                run_transcription(&media, &settings, models.as_ref(), reporter).map(|_| ())
            }));
        } else {
            units.push(RunningUnit::skipped(Unit::Transcription));
        }

        while !units.iter().all(RunningUnit::is_finished) {
            for unit in &mut units {
                unit.relay(sink);
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let mut outcomes = units.into_iter().map(|unit| unit.finish(sink));
        let frames = outcomes.next().unwrap_or(UnitOutcome::Skipped);
        let transcription = outcomes.next().unwrap_or(UnitOutcome::Skipped);

        tracing::info!(
            "Finished {} in {}",
            media.path.display(),
            format_elapsed(started.elapsed())
        );
        FileOutcome::Processed {
            frames,
            transcription,
        }
    }
}

/// One unit's thread and the receive half of its channel.
struct RunningUnit {
    unit: Unit,
    receiver: Receiver<ProgressMessage>,
    handle: Option<JoinHandle<bool>>,
    spawn_error: Option<String>,
    last_error: Option<String>,
}

impl RunningUnit {
    fn spawn<F>(unit: Unit, work: F) -> Self
    where
        F: FnOnce(&Reporter) -> Result<()> + Send + 'static,
    {
        let (sender, receiver): (Sender<ProgressMessage>, _) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name(unit.to_string().to_lowercase())
            .spawn(move || {
                let reporter = Reporter::new(sender);
                match work(&reporter) {
                    Ok(()) => true,
                    Err(e) => {
                        reporter.error(format!("{:#}", e));
                        false
                    }
                }
            });
        let (handle, spawn_error) = match spawned {
            Ok(handle) => (Some(handle), None),
            Err(e) => (None, Some(format!("failed to start {} thread: {}", unit, e))),
        };
        Self {
            unit,
            receiver,
            handle,
            spawn_error,
            last_error: None,
        }
    }

    fn skipped(unit: Unit) -> Self {
        let (_, receiver) = mpsc::channel();
        Self {
            unit,
            receiver,
            handle: None,
            spawn_error: None,
            last_error: None,
        }
    }

    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn relay(&mut self, sink: &mut dyn ProgressSink) {
        while let Ok(message) = self.receiver.try_recv() {
            self.forward(sink, message);
        }
    }

    fn forward(&mut self, sink: &mut dyn ProgressSink, message: ProgressMessage) {
        if let ProgressMessage::Error(text) = &message {
            self.last_error = Some(text.clone());
        }
        sink.message(self.unit, &message);
    }

    fn finish(mut self, sink: &mut dyn ProgressSink) -> UnitOutcome {
        if let Some(error) = self.spawn_error.take() {
            self.forward(sink, ProgressMessage::Error(error.clone()));
            return UnitOutcome::Failed(error);
        }
        let Some(handle) = self.handle.take() else {
            return UnitOutcome::Skipped;
        };
        let joined = handle.join();
        self.relay(sink);
        match joined {
            Ok(true) => UnitOutcome::Succeeded,
            Ok(false) => UnitOutcome::Failed(
                self.last_error
                    .take()
                    .unwrap_or_else(|| format!("{} failed", self.unit)),
            ),
            Err(payload) => {
                let error = format!("{} panicked: {}", self.unit, panic_message(&payload));
                self.forward(sink, ProgressMessage::Error(error.clone()));
                UnitOutcome::Failed(error)
            }
        }
    }
}

/// "1 hours, 2 minutes, 3 seconds". Zero parts are left out; seconds are
/// always shown when nothing else is.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{} hours", hours));
    }
    if minutes > 0 {
        parts.push(format!("{} minutes", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{} seconds", seconds));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::worker::test_support::FakeModels;
    use crate::transcribe::{Transcription, TranscriptionBackend};
    use crate::translate::Translator;

    #[derive(Default)]
    struct RecordingSink {
        started: Vec<PathBuf>,
        events: Vec<(Unit, ProgressMessage)>,
    }

    impl ProgressSink for RecordingSink {
        fn file_started(&mut self, path: &Path) {
            self.started.push(path.to_path_buf());
        }

        fn message(&mut self, unit: Unit, message: &ProgressMessage) {
            self.events.push((unit, message.clone()));
        }
    }

    struct PanickingModels;

    impl ModelProvider for PanickingModels {
        fn speech_backend(&self) -> Result<Box<dyn TranscriptionBackend>> {
            panic!("speech model exploded");
        }

        fn translator(&self, _source: &str, _target: &str) -> Result<Box<dyn Translator>> {
            unreachable!()
        }
    }

    fn audio_only_config() -> Config {
        let mut config = Config::default();
        config.frames.enabled = false;
        config
    }

    fn pipeline(config: &Config, models: Arc<dyn ModelProvider>) -> Pipeline {
        let ocr = Arc::new(TesseractCli::new("tesseract", "por"));
        Pipeline::with_services(config, ocr, models).unwrap()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59 seconds");
        assert_eq!(format_elapsed(Duration::from_secs(120)), "2 minutes");
        assert_eq!(
            format_elapsed(Duration::from_secs(3723)),
            "1 hours, 2 minutes, 3 seconds"
        );
        assert_eq!(format_elapsed(Duration::from_secs(7200)), "2 hours");
    }

    #[test]
    fn test_panic_in_unit_becomes_error_message() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("talk.mp3");
        std::fs::write(&path, b"").unwrap();
        let media = MediaFile::new(&path, None).unwrap();
        let pipeline = pipeline(&audio_only_config(), Arc::new(PanickingModels));
        let mut sink = RecordingSink::default();

        let outcome = pipeline.run_file(&media, &mut sink);
        match outcome {
            FileOutcome::Processed {
                frames,
                transcription: UnitOutcome::Failed(error),
            } => {
                assert_eq!(frames, UnitOutcome::Skipped);
                assert!(error.contains("speech model exploded"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(sink.events.iter().any(|(unit, m)| *unit == Unit::Transcription
            && matches!(m, ProgressMessage::Error(e) if e.contains("panicked"))));
    }

    #[test]
    fn test_model_failure_reported_on_transcription_channel() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("talk.mp3");
        std::fs::write(&path, b"").unwrap();
        let media = MediaFile::new(&path, None).unwrap();
        let pipeline = pipeline(&audio_only_config(), Arc::new(FakeModels::broken()));
        let mut sink = RecordingSink::default();

        let outcome = pipeline.run_file(&media, &mut sink);
        assert_eq!(
            outcome,
            FileOutcome::Processed {
                frames: UnitOutcome::Skipped,
                transcription: UnitOutcome::Failed("model file not found".to_string()),
            }
        );
        assert_eq!(sink.started, vec![path]);
        assert!(sink
            .events
            .iter()
            .all(|(unit, _)| *unit == Unit::Transcription));
    }

    #[test]
    fn test_shutdown_stops_before_next_file() {
        let config = audio_only_config();
        let models = Arc::new(FakeModels::new(Transcription::from_spans(
            "pt",
            vec![(0.0, 1.0, "olá")],
        )));
        let pipeline = pipeline(&config, models.clone());
        let shutdown = AtomicBool::new(true);
        let mut sink = RecordingSink::default();

        let report = pipeline.run_batch(
            &[PathBuf::from("/nowhere/a.mp3"), PathBuf::from("/nowhere/b.mp3")],
            &shutdown,
            &mut sink,
        );
        assert!(report.interrupted);
        assert!(report.files.is_empty());
        assert_eq!(models.speech_loads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsupported_input_is_rejected_and_batch_continues() {
        let tmp = tempfile::TempDir::new().unwrap();
        let notes = tmp.path().join("notes.txt");
        let clip = tmp.path().join("clip.mp3");
        std::fs::write(&notes, b"").unwrap();
        std::fs::write(&clip, b"").unwrap();
        let pipeline = pipeline(&audio_only_config(), Arc::new(FakeModels::broken()));
        let mut sink = RecordingSink::default();

        let report = pipeline.run_batch(&[notes, clip.clone()], &AtomicBool::new(false), &mut sink);
        assert!(!report.interrupted);
        assert_eq!(report.files.len(), 2);
        assert!(matches!(report.files[0].1, FileOutcome::Rejected(_)));
        assert_eq!(report.files[1].0, clip);
        assert!(matches!(report.files[1].1, FileOutcome::Processed { .. }));
    }

    #[test]
    fn test_skip_processed_honours_threshold() {
        let tmp = tempfile::TempDir::new().unwrap();
        let clip = tmp.path().join("clip.mp3");
        std::fs::write(&clip, b"").unwrap();
        let media = MediaFile::new(&clip, None).unwrap();
        std::fs::create_dir_all(&media.output_dir).unwrap();
        std::fs::write(media.transcript_path(None), vec![b'x'; 2048]).unwrap();

        let mut config = audio_only_config();
        config.output.skip_processed = true;
        let models = Arc::new(FakeModels::broken());
        let pipeline = pipeline(&config, models.clone());
        let report = pipeline.run_batch(&[clip], &AtomicBool::new(false), &mut RecordingSink::default());

        assert_eq!(report.files[0].1, FileOutcome::AlreadyProcessed);
        assert_eq!(models.speech_loads.load(Ordering::SeqCst), 0);
    }
}
