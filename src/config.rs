use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frames: FramesConfig,
    pub ocr: OcrConfig,
    pub transcription: TranscriptionConfig,
    pub translation: TranslationConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    pub enabled: bool,
    /// Sampled frames per second.
    pub fps: u32,
    /// Output scale passed to the decoder as `W:H`.
    pub resolution: String,
    pub decoder: PathBuf,
    pub decoder_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract: PathBuf,
    /// Tesseract language pack, also the ISO 639-3 code used for detection.
    pub language: String,
    pub threshold: u8,
    pub min_word_length: usize,
    pub workers: usize,
    /// Optional word list (one word per line) used as a spelling dictionary.
    pub dictionary: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub enabled: bool,
    pub backend: String,
    pub model: String,
    /// Forced source language. Auto-detect when unset.
    pub language: Option<String>,
    pub target_language: String,
    pub beam_size: u32,
    pub azure: AzureConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    /// Azure OpenAI chat deployment. Reuses endpoint and key from
    /// `[transcription.azure]`.
    pub deployment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root for per-file output directories. Defaults to each input's own
    /// directory.
    pub directory: Option<PathBuf>,
    pub skip_processed: bool,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            frames: FramesConfig::default(),
            ocr: OcrConfig::default(),
            transcription: TranscriptionConfig::default(),
            translation: TranslationConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fps: 4,
            resolution: "1280:720".to_string(),
            decoder: PathBuf::from("ffmpeg"),
            decoder_timeout_secs: 300,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            language: "por".to_string(),
            threshold: 140,
            min_word_length: 4,
            workers: 5,
            dictionary: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "local".to_string(),
            model: "large-v3".to_string(),
            language: None,
            target_language: "pt".to_string(),
            beam_size: 5,
            azure: AzureConfig::default(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deployment: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            skip_processed: false,
        }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("framescribe.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/framescribe/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("framescribe").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        r#"# framescribe configuration

[frames]
# Extract timestamped frames from video inputs and keep the ones with text.
enabled = true
# Frames sampled per second of video.
fps = 4
# Scale applied to sampled frames (ffmpeg `scale` filter syntax).
resolution = "1280:720"
# Decoder executable.
decoder = "ffmpeg"
# The decoder is killed and the frame pipeline fails after this many seconds.
decoder_timeout_secs = 300

[ocr]
# Tesseract executable.
tesseract = "tesseract"
# Tesseract language pack. Also the ISO 639-3 code the text must be detected as;
# only languages written in the Latin-1 alphabet are supported.
language = "por"
# Luminance threshold used to binarize frames before OCR (0-255).
threshold = 140
# At least one word of this many letters is required for a frame to count.
min_word_length = 4
# Number of frames processed in parallel.
workers = 5
# Optional word list (one word per line). When set, at least one long word
# must appear in it.
# dictionary = "/usr/share/dict/portuguese"

[transcription]
# Generate subtitles and time-coded transcripts from the audio track.
enabled = true
# Transcription backend: "local" (whisper.cpp) or "azure" (cloud API).
backend = "local"
# Whisper model name or path to a ggml .bin file (local backend).
model = "large-v3"
# Force the spoken language (ISO 639-1). Auto-detected when unset.
# language = "en"
# Language of the final subtitles. Other languages are translated.
target_language = "pt"
# Beam width used by the local decoder.
beam_size = 5

[transcription.azure]
# Azure OpenAI endpoint URL.
# endpoint = "https://your-resource.openai.azure.com"
# API key (or set FRAMESCRIBE_AZURE_KEY environment variable).
# api_key = ""
# Deployment name for the Whisper model.
# deployment = "whisper"

[translation]
# Translate transcripts whose detected language differs from target_language.
enabled = true
# Azure OpenAI chat deployment used for translation. Reuses the endpoint and
# api_key from [transcription.azure].
# deployment = "gpt-4o-mini"

[output]
# Root directory for per-file output folders. Defaults to the folder of each
# input file.
# directory = "/data/processed"
# Skip inputs whose time-coded transcript already exists and is over 1 KB.
skip_processed = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.frames.enabled);
        assert_eq!(config.frames.fps, 4);
        assert_eq!(config.frames.resolution, "1280:720");
        assert_eq!(config.frames.decoder_timeout_secs, 300);
        assert_eq!(config.ocr.threshold, 140);
        assert_eq!(config.ocr.min_word_length, 4);
        assert_eq!(config.ocr.workers, 5);
        assert_eq!(config.ocr.language, "por");
        assert!(config.ocr.dictionary.is_none());
        assert!(config.transcription.enabled);
        assert_eq!(config.transcription.backend, "local");
        assert_eq!(config.transcription.model, "large-v3");
        assert_eq!(config.transcription.target_language, "pt");
        assert_eq!(config.transcription.beam_size, 5);
        assert!(config.transcription.language.is_none());
        assert!(config.output.directory.is_none());
        assert!(!config.output.skip_processed);
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_str = r#"
            [frames]
            fps = 2

            [ocr]
            min_word_length = 5
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.frames.fps, 2);
        assert_eq!(config.ocr.min_word_length, 5);
        // Defaults still applied for unspecified fields
        assert_eq!(config.frames.resolution, "1280:720");
        assert_eq!(config.ocr.threshold, 140);
        assert_eq!(config.transcription.target_language, "pt");
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_str = r#"
            [frames]
            enabled = false
            fps = 1
            resolution = "640:360"
            decoder = "/opt/ffmpeg/bin/ffmpeg"
            decoder_timeout_secs = 60

            [ocr]
            tesseract = "/usr/local/bin/tesseract"
            language = "eng"
            threshold = 128
            min_word_length = 3
            workers = 8
            dictionary = "/usr/share/dict/words"

            [transcription]
            enabled = false
            backend = "azure"
            model = "small"
            language = "en"
            target_language = "en"
            beam_size = 3

            [transcription.azure]
            endpoint = "https://example.openai.azure.com"
            api_key = "test-key"
            deployment = "whisper"

            [translation]
            enabled = false
            deployment = "gpt-4o-mini"

            [output]
            directory = "/tmp/out"
            skip_processed = true
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.frames.enabled);
        assert_eq!(config.frames.decoder, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.frames.decoder_timeout_secs, 60);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.workers, 8);
        assert_eq!(
            config.ocr.dictionary,
            Some(PathBuf::from("/usr/share/dict/words"))
        );
        assert_eq!(config.transcription.backend, "azure");
        assert_eq!(config.transcription.language.as_deref(), Some("en"));
        assert_eq!(
            config.transcription.azure.endpoint,
            "https://example.openai.azure.com"
        );
        assert!(!config.translation.enabled);
        assert_eq!(config.output.directory, Some(PathBuf::from("/tmp/out")));
        assert!(config.output.skip_processed);
    }

    #[test]
    fn test_load_nonexistent_path_errors() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_with_path_returns_resolved_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config_file = tmp.path().join("framescribe.toml");
        std::fs::write(&config_file, "[frames]\nfps = 8\n").unwrap();

        let (config, resolved) = Config::load_with_path(Some(config_file.as_path())).unwrap();
        assert_eq!(config.frames.fps, 8);
        assert_eq!(resolved, Some(config_file));
    }

    #[test]
    fn test_generate_default_commented_is_valid_toml() {
        let content = Config::generate_default_commented();
        let config: Config = toml::from_str(&content).unwrap();
        let defaults = Config::default();
        assert_eq!(config.frames.fps, defaults.frames.fps);
        assert_eq!(config.frames.resolution, defaults.frames.resolution);
        assert_eq!(config.ocr.threshold, defaults.ocr.threshold);
        assert_eq!(config.ocr.workers, defaults.ocr.workers);
        assert_eq!(config.transcription.model, defaults.transcription.model);
        assert_eq!(config.translation.enabled, defaults.translation.enabled);
        assert_eq!(config.output.skip_processed, defaults.output.skip_processed);
    }

    #[test]
    fn test_generate_default_commented_has_all_sections() {
        let content = Config::generate_default_commented();
        for section in [
            "[frames]",
            "[ocr]",
            "[transcription]",
            "[transcription.azure]",
            "[translation]",
            "[output]",
        ] {
            assert!(content.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_azure_config_debug_redacts_api_key() {
        let config = AzureConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "super-secret-key-12345".to_string(),
            deployment: "whisper".to_string(),
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("https://example.openai.azure.com"));
    }
}
