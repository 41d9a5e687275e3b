// Client for OpenAI-compatible `/audio/transcriptions` endpoints.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::TranscriptionConfig;
use crate::error::{Result, YtSubError};
use crate::subtitle::{SubtitleEntry, format_srt};

/// One timed segment from a `verbose_json` transcription response.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A transcription result. `language` and `segments` are provider-optional.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionOutput {
    pub text: String,
    pub language: Option<String>,
    pub segments: Option<Vec<TranscriptionSegment>>,
}

impl TranscriptionOutput {
    /// Render as SRT. With segments, one block per segment; without, a single
    /// block spanning the representable timestamp range.
    pub fn to_srt(&self) -> String {
        match self.segments.as_deref() {
            Some(segments) if !segments.is_empty() => segments_to_srt(segments),
            _ => {
                let entry = SubtitleEntry {
                    index: 1,
                    start_time: 0.0,
                    end_time: 359_999.999,
                    text: self.text.trim().to_string(),
                };
                format_srt(&[entry])
            }
        }
    }
}

/// Convert transcription segments to SRT blocks, one per segment.
pub fn segments_to_srt(segments: &[TranscriptionSegment]) -> String {
    let entries: Vec<SubtitleEntry> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| SubtitleEntry {
            index: i + 1,
            start_time: seg.start,
            end_time: seg.end,
            text: seg.text.trim().to_string(),
        })
        .collect();
    format_srt(&entries)
}

/// Speech-to-text seam for the fallback chain.
#[async_trait]
pub trait SpeechTranscriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionOutput>;
}

/// Multipart-upload Whisper client.
pub struct WhisperClient {
    client: Client,
    config: TranscriptionConfig,
    api_key: Option<String>,
}

impl WhisperClient {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        let api_key = config.api_key();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(YtSubError::Http)?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            YtSubError::Config(format!(
                "Transcription API key not found. Set the {} environment variable.",
                self.config.api_key_env
            ))
        })
    }
}

#[async_trait]
impl SpeechTranscriber for WhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionOutput> {
        let api_key = self.api_key()?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let mime = mime_for_path(audio_path);

        info!(
            "Transcribing {} with model {}",
            audio_path.display(),
            self.config.model
        );

        let bytes = tokio::fs::read(audio_path).await?;
        debug!("Uploading {} bytes ({})", bytes.len(), mime);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| YtSubError::Transcription(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YtSubError::Transcription(format!(
                "Transcription API error {}: {}",
                status,
                body.trim()
            )));
        }

        let output: TranscriptionOutput = response.json().await.map_err(|e| {
            YtSubError::Transcription(format!("Failed to parse transcription response: {}", e))
        })?;

        info!(
            "Transcription complete: {} chars, detected language {:?}",
            output.text.len(),
            output.language
        );
        Ok(output)
    }
}

/// Map a detected-language value to an ISO code. `verbose_json` reports full
/// English names ("english"), while the rest of the pipeline works in codes.
/// Unknown values pass through unchanged.
pub fn language_code(detected: &str) -> String {
    match detected.trim().to_lowercase().as_str() {
        "english" => "en",
        "japanese" => "ja",
        "korean" => "ko",
        "chinese" => "zh",
        "spanish" => "es",
        "french" => "fr",
        "german" => "de",
        "portuguese" => "pt",
        "italian" => "it",
        "russian" => "ru",
        "arabic" => "ar",
        "hindi" => "hi",
        "thai" => "th",
        "vietnamese" => "vi",
        "indonesian" => "id",
        "dutch" => "nl",
        "polish" => "pl",
        "turkish" => "tr",
        "ukrainian" => "uk",
        other => return other.to_string(),
    }
    .to_string()
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("webm") => "audio/webm",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
