use std::path::{Path, PathBuf};

use anyhow::Result;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::transcribe::audio::read_samples;
use crate::transcribe::backend::{Transcription, TranscriptionBackend};

pub struct WhisperLocal {
    ctx: WhisperContext,
    beam_size: u32,
}

/// `model` is either a path to a ggml file or a model name such as
/// `large-v3`, looked up as `ggml-<name>.bin` in the models directory.
pub fn resolve_model_path(model: &str) -> PathBuf {
    let direct = PathBuf::from(model);
    if direct.is_file() {
        return direct;
    }
    let file_name = format!("ggml-{}.bin", model);
    dirs::data_dir()
        .map(|d| d.join("framescribe").join("models").join(&file_name))
        .filter(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(file_name))
}

impl WhisperLocal {
    pub fn new(model: &str, beam_size: u32) -> Result<Self> {
        let model_path = resolve_model_path(model);
        tracing::info!("Loading Whisper model {}", model_path.display());
        let ctx = WhisperContext::new_with_params(
            &model_path.to_string_lossy(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| anyhow::anyhow!("Failed to load Whisper model: {:?}", e))?;
        Ok(Self { ctx, beam_size })
    }
}

impl TranscriptionBackend for WhisperLocal {
    fn name(&self) -> &str {
        "whisper-local"
    }

    fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcription> {
        let samples = read_samples(audio_path)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow::anyhow!("Failed to create state: {:?}", e))?;

        let mut params = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.beam_size as i32,
            patience: -1.0,
        });
        params.set_n_threads(4);
        params.set_language(Some(language.unwrap_or("auto")));
        params.set_print_progress(false);

        state
            .full(params, &samples)
            .map_err(|e| anyhow::anyhow!("Transcription failed: {:?}", e))?;

        let detected = match language {
            Some(forced) => forced.to_string(),
            None => {
                let id = state
                    .full_lang_id_from_state()
                    .map_err(|e| anyhow::anyhow!("Language detection failed: {:?}", e))?;
                whisper_rs::get_lang_str(id)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("Unknown language id {}", id))?
            }
        };

        let mut spans = Vec::new();
        for i in 0..state.full_n_segments() {
            if let Some(segment) = state.get_segment(i) {
                let text = segment.to_str_lossy().map(|t| t.to_string()).unwrap_or_default();
                // Timestamps are in centiseconds.
                let start = segment.start_timestamp() as f64 / 100.0;
                let end = segment.end_timestamp() as f64 / 100.0;
                spans.push((start, end, text));
            }
        }

        Ok(Transcription::from_spans(detected, spans))
    }
}
