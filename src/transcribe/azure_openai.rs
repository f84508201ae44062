use std::path::Path;

use anyhow::{Context, Result};
use reqwest::blocking::multipart;
use serde::Deserialize;

use crate::config::AzureConfig;
use crate::transcribe::backend::{Transcription, TranscriptionBackend};

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "FRAMESCRIBE_AZURE_KEY";

pub struct AzureOpenAIBackend {
    endpoint: String,
    api_key: String,
    deployment: String,
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    language: Option<String>,
    #[serde(default)]
    segments: Vec<VerboseSegment>,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Key from config, falling back to `FRAMESCRIBE_AZURE_KEY`.
pub fn resolve_api_key(config: &AzureConfig) -> Result<String> {
    if !config.api_key.is_empty() {
        return Ok(config.api_key.clone());
    }
    std::env::var(API_KEY_ENV).with_context(|| {
        format!(
            "Azure API key not configured. Set [transcription.azure] api_key or {}",
            API_KEY_ENV
        )
    })
}

impl AzureOpenAIBackend {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            anyhow::bail!("Azure OpenAI endpoint not configured. Set [transcription.azure] endpoint");
        }
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: resolve_api_key(config)?,
            deployment: config.deployment.clone(),
        })
    }
}

impl TranscriptionBackend for AzureOpenAIBackend {
    fn name(&self) -> &str {
        "azure-openai"
    }

    fn transcribe(&self, audio_path: &Path, language: Option<&str>) -> Result<Transcription> {
        let url = format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version=2024-06-01",
            self.endpoint, self.deployment
        );

        let file_bytes = std::fs::read(audio_path)?;
        let filename = audio_path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("audio path has no filename: {}", audio_path.display()))?
            .to_string_lossy()
            .to_string();

        let mut form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(file_bytes)
                    .file_name(filename)
                    .mime_str("audio/wav")?,
            )
            .text("response_format", "verbose_json");
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()?;
        let response = client
            .post(&url)
            .header("api-key", &self.api_key)
            .multipart(form)
            .send()
            .context("Failed to send transcription request")?;

        let response = response.error_for_status()?;
        let raw = response.text()?;
        let body: VerboseTranscription = serde_json::from_str(&raw).with_context(|| {
            format!(
                "Failed to parse transcription response: {}",
                raw.chars().take(200).collect::<String>()
            )
        })?;

        let language = match (body.language.as_deref(), language) {
            (Some(name), _) => normalize_language(name),
            (None, Some(forced)) => forced.to_string(),
            (None, None) => anyhow::bail!("Transcription response did not report a language"),
        };

        Ok(Transcription::from_spans(
            language,
            body.segments.into_iter().map(|s| (s.start, s.end, s.text)),
        ))
    }
}

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("arabic", "ar"),
    ("chinese", "zh"),
    ("czech", "cs"),
    ("danish", "da"),
    ("dutch", "nl"),
    ("english", "en"),
    ("finnish", "fi"),
    ("french", "fr"),
    ("german", "de"),
    ("greek", "el"),
    ("hindi", "hi"),
    ("italian", "it"),
    ("japanese", "ja"),
    ("korean", "ko"),
    ("norwegian", "no"),
    ("polish", "pl"),
    ("portuguese", "pt"),
    ("russian", "ru"),
    ("spanish", "es"),
    ("swedish", "sv"),
    ("turkish", "tr"),
    ("ukrainian", "uk"),
];

/// The service reports languages by English name ("portuguese"); the rest
/// of the pipeline speaks ISO 639-1. Unknown names pass through lowercased.
pub fn normalize_language(name: &str) -> String {
    let name = name.trim().to_lowercase();
    LANGUAGE_NAMES
        .iter()
        .find(|(full, _)| *full == name)
        .map(|(_, code)| code.to_string())
        .unwrap_or(name)
}
