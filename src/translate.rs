use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{AzureConfig, TranslationConfig};
use crate::transcribe::azure_openai::resolve_api_key;

/// Translates segment text from one language into another.
pub trait Translator: Send {
    fn translate(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

/// Azure OpenAI chat completions used as a translator. Built once per
/// transcription and reused for every segment.
pub struct AzureTranslator {
    endpoint: String,
    api_key: String,
    deployment: String,
    system_prompt: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for AzureTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureTranslator")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .finish()
    }
}

pub fn translation_prompt(source: &str, target: &str) -> String {
    format!(
        "You translate subtitles. Translate the user's text from the language \
         with ISO 639-1 code \"{}\" into the language with code \"{}\". \
         Reply with the translation only, without quotes or notes.",
        source, target
    )
}

impl AzureTranslator {
    /// Uses the endpoint and key from `[transcription.azure]` and the chat
    /// deployment from `[translation]`.
    pub fn new(
        azure: &AzureConfig,
        translation: &TranslationConfig,
        source: &str,
        target: &str,
    ) -> Result<Self> {
        if azure.endpoint.is_empty() {
            anyhow::bail!(
                "Azure OpenAI endpoint not configured. Set [transcription.azure] endpoint"
            );
        }
        if translation.deployment.is_empty() {
            anyhow::bail!("Translation deployment not configured. Set [translation] deployment");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            endpoint: azure.endpoint.trim_end_matches('/').to_string(),
            api_key: resolve_api_key(azure)?,
            deployment: translation.deployment.clone(),
            system_prompt: translation_prompt(source, target),
            client,
        })
    }
}

impl Translator for AzureTranslator {
    fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version=2024-06-01",
            self.endpoint, self.deployment
        );

        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_completion_tokens: 1024,
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .context("Failed to send translation request")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .unwrap_or_else(|_| "unable to read response body".to_string());
            anyhow::bail!(
                "Azure OpenAI returned HTTP {}: {}",
                status.as_u16(),
                error_body
            );
        }

        let chat_response: ChatResponse = response
            .json()
            .context("Failed to parse translation response")?;
        let choice = chat_response
            .choices
            .first()
            .context("No choices in translation response")?;

        if let Some(reason) = &choice.finish_reason {
            if reason != "stop" {
                tracing::warn!("Translation finish_reason: {}", reason);
            }
        }

        Ok(choice.message.content.trim().to_string())
    }
}
