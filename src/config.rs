use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, YtSubError};
use crate::utils::expand_path;

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_transcription_base_url() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_fallback_language() -> String {
    "en".to_string()
}

fn default_transcription_timeout() -> u64 {
    300
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

/// Automatic captions exist for a long tail of languages; probing them all
/// would hammer the platform. This hand-curated list bounds the probes to
/// widely-used languages.
fn default_preferred_auto_languages() -> Vec<String> {
    [
        "en", "en-US", "en-GB", "zh", "zh-Hans", "zh-Hant", "ja", "ko", "es", "fr", "de", "pt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target languages for transcripts
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn storage_base() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("YouTube Subtitles")
}

fn default_audio_dir() -> PathBuf {
    storage_base().join("Audio")
}

fn default_transcript_dir() -> PathBuf {
    storage_base().join("Transcripts")
}

fn default_article_dir() -> PathBuf {
    storage_base().join("Articles")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    #[serde(default = "default_transcript_dir")]
    pub transcript_dir: PathBuf,
    #[serde(default = "default_article_dir")]
    pub article_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            transcript_dir: default_transcript_dir(),
            article_dir: default_article_dir(),
        }
    }
}

/// Passthrough options for the yt-dlp subprocess.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Path to a cookies.txt file (Netscape format)
    pub cookies_file: Option<String>,
    /// Browser to extract cookies from (chrome, firefox, safari, ...)
    pub cookies_from_browser: Option<String>,
    /// Force a specific YouTube player client (web, android, ios, tv)
    pub player_client: Option<String>,
}

/// OpenAI-compatible Whisper transcription API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_base_url")]
    pub base_url: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Language assumed when the provider omits detection
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcription_base_url(),
            model: default_transcription_model(),
            api_key_env: default_api_key_env(),
            fallback_language: default_fallback_language(),
            timeout_secs: default_transcription_timeout(),
        }
    }
}

impl TranscriptionConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

/// OpenAI-compatible chat API configuration for translation and articles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Automatic-caption languages to probe when no official track matches
    #[serde(default = "default_preferred_auto_languages")]
    pub preferred_auto_languages: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            preferred_auto_languages: default_preferred_auto_languages(),
        }
    }
}

/// How output filenames are date-prefixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameDate {
    /// Use the video's upload date
    Upload,
    /// Use the date the transcript was requested
    Request,
    /// No date prefix
    None,
}

fn default_filename_date() -> FilenameDate {
    FilenameDate::Upload
}

fn default_article_metadata() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_filename_date")]
    pub filename_date: FilenameDate,
    /// Prepend a metadata header to generated articles
    #[serde(default = "default_article_metadata")]
    pub article_metadata: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename_date: FilenameDate::Upload,
            article_metadata: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            storage: StorageConfig::default(),
            youtube: YoutubeConfig::default(),
            transcription: TranscriptionConfig::default(),
            llm: LlmConfig::default(),
            fallback: FallbackConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Default config location: ~/.config/ytsub/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ytsub")
            .join("config.toml")
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| YtSubError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(|e| YtSubError::Config(format!("Failed to parse config file: {}", e)))?;

        config.storage.audio_dir = expand_path(&config.storage.audio_dir);
        config.storage.transcript_dir = expand_path(&config.storage.transcript_dir);
        config.storage.article_dir = expand_path(&config.storage.article_dir);
        Ok(config)
    }

    /// Load from the given path, the default location, or built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Self::default_path();
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| YtSubError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
