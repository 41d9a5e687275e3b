// OpenAI-compatible chat client for subtitle translation and article
// generation. Handles chunking of oversized timed text, retry with
// exponential backoff for transient failures, and detection of refusals that
// arrive as HTTP 200 responses.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Result, YtSubError};
use crate::utils::language_name;

/// Content below this length is translated in a single call (~4k tokens).
const MAX_SINGLE_REQUEST_CHARS: usize = 15_000;
/// Subtitle blocks per batch when chunking oversized content.
const CHUNK_BLOCK_COUNT: usize = 50;
/// Refusal phrases are only looked for in this many leading characters.
const REFUSAL_WINDOW_CHARS: usize = 100;
const BACKOFF_BASE_SECS: u64 = 2;
const TRANSLATION_TEMPERATURE: f32 = 0.3;
const ARTICLE_TEMPERATURE: f32 = 0.7;

/// Phrases that mark a model response as a refusal rather than a translation.
/// Substring matching is heuristic: a match is a failure, but the absence of
/// one proves nothing.
const REFUSAL_MARKERS: &[&str] = &[
    "i cannot",
    "i can't",
    "i'm not able to",
    "i am not able to",
    "i'm sorry, but",
    "as an ai",
];

/// Requested length for generated articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleLength {
    Original,
    Long,
    Medium,
    Short,
}

impl ArticleLength {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(ArticleLength::Original),
            "long" => Ok(ArticleLength::Long),
            "medium" => Ok(ArticleLength::Medium),
            "short" => Ok(ArticleLength::Short),
            other => Err(YtSubError::Config(format!(
                "Unknown article length '{}'. Supported: original, long, medium, short",
                other
            ))),
        }
    }

    fn directive(&self) -> &'static str {
        match self {
            ArticleLength::Original => {
                "Cover the full content at roughly the same length as the transcript."
            }
            ArticleLength::Long => "Write a detailed, in-depth article (1500+ words).",
            ArticleLength::Medium => "Write a medium-length article (around 800 words).",
            ArticleLength::Short => "Write a concise summary article (around 300 words).",
        }
    }
}

/// Translation operations the fallback chain depends on.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate text, preserving subtitle structure when `preserve_formatting`.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        preserve_formatting: bool,
    ) -> Result<String>;

    /// Translate SRT/VTT content, chunking when it exceeds the payload bound.
    async fn translate_timed_text(
        &self,
        content: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String>;

    /// Translate prose without any structural constraints.
    async fn translate_plain_text(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        self.translate(text, source_language, target_language, false)
            .await
    }

    /// Render a transcript as a prose article in the given language.
    async fn generate_article(
        &self,
        content: &str,
        language: &str,
        length: ArticleLength,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
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
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Outcome of one chat attempt: retryable failures feed the backoff loop,
/// fatal ones surface immediately.
enum ChatAttemptError {
    Retryable(String),
    Fatal(YtSubError),
}

/// OpenAI-compatible chat completions client.
pub struct TranslationClient {
    client: Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl TranslationClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
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
                "LLM API key not found. Set the {} environment variable.",
                self.config.api_key_env
            ))
        })
    }

    /// Send one chat request with the configured retry policy.
    async fn chat(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content.to_string(),
                },
            ],
            temperature,
        };

        let max_attempts = self.config.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.send_chat(&request, timeout).await {
                Ok(content) => return Ok(content),
                Err(ChatAttemptError::Fatal(e)) => return Err(e),
                Err(ChatAttemptError::Retryable(message)) => {
                    warn!(
                        "Chat attempt {}/{} failed: {}",
                        attempt, max_attempts, message
                    );
                    last_error = message;
                    if attempt < max_attempts {
                        let delay = backoff_delay(attempt);
                        debug!("Backing off for {:?} before retry", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(YtSubError::Translation(format!(
            "Request failed after {} attempts: {}",
            max_attempts, last_error
        )))
    }

    async fn send_chat(
        &self,
        request: &ChatRequest,
        timeout: Duration,
    ) -> std::result::Result<String, ChatAttemptError> {
        let api_key = self.api_key().map_err(ChatAttemptError::Fatal)?;

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(request)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(ChatAttemptError::Retryable(format!(
                    "request timed out: {}",
                    e
                )));
            }
            Err(e) => return Err(ChatAttemptError::Fatal(YtSubError::Http(e))),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_retryable_status(status, &body) {
                return Err(ChatAttemptError::Retryable(format!(
                    "HTTP {}: {}",
                    status,
                    body.trim()
                )));
            }
            return Err(ChatAttemptError::Fatal(YtSubError::Translation(format!(
                "API error {}: {}",
                status,
                body.trim()
            ))));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ChatAttemptError::Fatal(YtSubError::Translation(format!(
                "Failed to parse chat response: {}",
                e
            )))
        })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ChatAttemptError::Fatal(YtSubError::Translation(
                "Chat response contained no choices".to_string(),
            ))
        })?;

        let content = choice.message.content.unwrap_or_default();
        if let Some(reason) = refusal_reason(&content, choice.finish_reason.as_deref()) {
            return Err(ChatAttemptError::Fatal(YtSubError::Translation(reason)));
        }

        Ok(content)
    }

    fn standard_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        preserve_formatting: bool,
    ) -> Result<String> {
        let system_prompt =
            build_translation_prompt(source_language, target_language, preserve_formatting);

        debug!(
            "Translating {} chars from {} to {} (preserve_formatting: {})",
            text.len(),
            source_language,
            target_language,
            preserve_formatting
        );

        self.chat(
            &system_prompt,
            text,
            TRANSLATION_TEMPERATURE,
            self.standard_timeout(),
        )
        .await
    }

    async fn translate_timed_text(
        &self,
        content: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String> {
        if content.len() < MAX_SINGLE_REQUEST_CHARS {
            return self
                .translate(content, source_language, target_language, true)
                .await;
        }

        let (header, blocks) = split_subtitle_blocks(content);
        let batch_count = blocks.len().div_ceil(CHUNK_BLOCK_COUNT);
        info!(
            "Content is {} chars, translating {} blocks in {} batches",
            content.len(),
            blocks.len(),
            batch_count
        );

        let mut parts = Vec::with_capacity(batch_count + 1);
        if let Some(header) = header {
            parts.push(header);
        }

        for (i, batch) in blocks.chunks(CHUNK_BLOCK_COUNT).enumerate() {
            debug!("Translating batch {}/{}", i + 1, batch_count);
            let batch_text = batch.join("\n\n");
            let translated = self
                .translate(&batch_text, source_language, target_language, true)
                .await?;
            parts.push(translated);
        }

        Ok(parts.join("\n\n"))
    }

    async fn generate_article(
        &self,
        content: &str,
        language: &str,
        length: ArticleLength,
    ) -> Result<String> {
        let system_prompt = build_article_prompt(language, length);

        info!(
            "Generating {:?}-length article in {} from {} chars of transcript",
            length,
            language,
            content.len()
        );

        // Article generation favors fluency over determinism and gets twice
        // the standard timeout.
        self.chat(
            &system_prompt,
            content,
            ARTICLE_TEMPERATURE,
            self.standard_timeout() * 2,
        )
        .await
    }
}

fn build_translation_prompt(
    source_language: &str,
    target_language: &str,
    preserve_formatting: bool,
) -> String {
    let source_name = language_name(source_language);
    let target_name = language_name(target_language);

    if preserve_formatting {
        format!(
            "You are a professional translator. Translate the following subtitle content from {} to {}.\n\
             \n\
             IMPORTANT RULES:\n\
             1. Preserve ALL timestamp formatting exactly as-is (e.g., \"00:01:23,456 --> 00:01:25,789\" or \"00:01:23.456 --> 00:01:25.789\")\n\
             2. Preserve subtitle numbering if present\n\
             3. Preserve line breaks within subtitle entries\n\
             4. Only translate the actual dialogue/text content\n\
             5. Maintain the same structure and format of the original\n\
             6. Do not add any explanations or notes\n\
             7. Output ONLY the translated content, nothing else",
            source_name, target_name
        )
    } else {
        format!(
            "You are a professional translator. Translate the following text from {} to {}.\n\
             \n\
             IMPORTANT RULES:\n\
             1. Provide a natural, fluent translation\n\
             2. Maintain paragraph breaks if present\n\
             3. Do not add any explanations or notes\n\
             4. Output ONLY the translated content, nothing else",
            source_name, target_name
        )
    }
}

fn build_article_prompt(language: &str, length: ArticleLength) -> String {
    let name = language_name(language);
    format!(
        "You are a professional writer. Rewrite the following video transcript as a well-structured Markdown article in {}.\n\
         \n\
         IMPORTANT RULES:\n\
         1. Write entirely in {}, regardless of the transcript's language\n\
         2. Organize the content with headings and paragraphs\n\
         3. Stay faithful to the transcript; do not invent information\n\
         4. Do not mention that the source is a transcript\n\
         5. {}\n\
         6. Output ONLY the article, nothing else",
        name,
        name,
        length.directive()
    )
}

/// Whether an error response should be retried. 429 and upstream 502/503 are
/// transient; so is any error whose body mentions "provider", which
/// aggregator endpoints use for upstream-routing failures.
fn is_retryable_status(status: StatusCode, body: &str) -> bool {
    matches!(status.as_u16(), 429 | 502 | 503) || body.to_lowercase().contains("provider")
}

/// Exponential backoff: 2s, 4s, 8s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(BACKOFF_BASE_SECS << (attempt - 1).min(5))
}

/// Inspect a successful response for a refusal. Returns the failure reason,
/// or None when the content looks like a genuine result.
fn refusal_reason(content: &str, finish_reason: Option<&str>) -> Option<String> {
    if content.trim().is_empty() {
        return Some("Model returned empty content".to_string());
    }
    if finish_reason == Some("content_filter") {
        return Some("Model response was cut off by a content filter".to_string());
    }

    let head: String = content
        .chars()
        .take(REFUSAL_WINDOW_CHARS)
        .collect::<String>()
        .to_lowercase();
    for marker in REFUSAL_MARKERS {
        if head.contains(marker) {
            return Some(format!("Model refused to translate (matched \"{}\")", marker));
        }
    }

    None
}

/// Split subtitle content on blank-line boundaries, separating a leading
/// WEBVTT header block so it can be carried through untranslated.
fn split_subtitle_blocks(content: &str) -> (Option<String>, Vec<String>) {
    let mut blocks: Vec<String> = content
        .trim()
        .split("\n\n")
        .map(|b| b.trim_matches('\n'))
        .filter(|b| !b.trim().is_empty())
        .map(|b| b.to_string())
        .collect();

    let header = if blocks
        .first()
        .is_some_and(|b| b.trim_start().starts_with("WEBVTT"))
    {
        Some(blocks.remove(0))
    } else {
        None
    };

    (header, blocks)
}
