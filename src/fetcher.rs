// The fallback chain that actually obtains a transcript.
//
// Sources are tried from cheapest to most expensive, stopping at the first
// success:
//
//   1. a native caption track in the target language
//   2. a caption track in another language, translated
//   3. Whisper transcription of the audio, translated
//
// Failures inside a stage are logged and fall through to the next stage, with
// one exception: when Whisper output needs translation and that translation
// fails, there is nothing cheaper left to try and the error is surfaced.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::cache::{WhisperCache, WhisperCacheEntry};
use crate::error::{Result, YtSubError};
use crate::subtitle::{self, SubtitleFormat, normalize::clean_caption_content};
use crate::translate::Translator;
use crate::utils::format_audio_filename;
use crate::whisper::{SpeechTranscriber, language_code};
use crate::youtube::{CaptionProvider, VideoMetadata};

/// A settled transcript plus provenance.
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    pub content: String,
    pub source_language: String,
    pub format: SubtitleFormat,
    /// How the transcript was obtained, e.g. `official`, `auto-generated`,
    /// `official+translated`, `whisper`. Advisory only.
    pub method: String,
}

/// Knobs the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    pub preferred_auto_languages: Vec<String>,
    pub fallback_language: String,
    pub audio_dir: PathBuf,
    pub keep_audio: bool,
}

/// What one stage produced, before output-format conversion.
struct StageHit {
    content: String,
    source_language: String,
    method: String,
}

pub struct TranscriptFetcher {
    provider: Box<dyn CaptionProvider>,
    transcriber: Box<dyn SpeechTranscriber>,
    translator: Box<dyn Translator>,
    cache: WhisperCache,
    options: FetcherOptions,
}

impl TranscriptFetcher {
    pub fn new(
        provider: Box<dyn CaptionProvider>,
        transcriber: Box<dyn SpeechTranscriber>,
        translator: Box<dyn Translator>,
        options: FetcherOptions,
    ) -> Self {
        Self {
            provider,
            transcriber,
            translator,
            cache: WhisperCache::new(),
            options,
        }
    }

    /// Obtain a transcript for one target language. `translate` disables the
    /// translation-dependent paths when false.
    pub async fn fetch(
        &mut self,
        url: &str,
        metadata: &VideoMetadata,
        target_language: &str,
        output_format: SubtitleFormat,
        translate: bool,
    ) -> Result<TranscriptResult> {
        info!(
            "Fetching transcript for {} in {} (output: {})",
            metadata.id, target_language, output_format
        );

        if let Some(hit) = self.try_direct_caption(url, target_language).await {
            return format_result(hit, output_format);
        }

        if translate {
            if let Some(hit) = self
                .try_foreign_caption(url, metadata, target_language)
                .await
            {
                return format_result(hit, output_format);
            }
        } else {
            debug!("Translation disabled, skipping foreign caption stage");
        }

        if let Some(hit) = self.try_whisper(url, metadata, target_language, translate).await? {
            return format_result(hit, output_format);
        }

        Err(YtSubError::NotFound(format!(
            "No transcript source available for {} in {}",
            metadata.id, target_language
        )))
    }

    /// Obtain plain-text transcript material in whatever language is
    /// cheapest, without translating. Captions in the preferred language win,
    /// then any other caption track, then Whisper.
    pub async fn fetch_any(
        &mut self,
        url: &str,
        metadata: &VideoMetadata,
        preferred_language: &str,
    ) -> Result<TranscriptResult> {
        if let Some(hit) = self.try_direct_caption(url, preferred_language).await {
            return format_result(hit, SubtitleFormat::Txt);
        }

        if let Some((language, raw, automatic)) = self
            .find_foreign_caption(url, metadata, preferred_language)
            .await
        {
            let method = if automatic { "auto-generated" } else { "official" };
            let hit = StageHit {
                content: clean_caption_content(&raw),
                source_language: language,
                method: method.to_string(),
            };
            return format_result(hit, SubtitleFormat::Txt);
        }

        if let Some(hit) = self
            .try_whisper(url, metadata, preferred_language, false)
            .await?
        {
            return format_result(hit, SubtitleFormat::Txt);
        }

        Err(YtSubError::NotFound(format!(
            "No transcript source available for {}",
            metadata.id
        )))
    }

    /// Stage 1: a caption track already in the target language.
    async fn try_direct_caption(&self, url: &str, target_language: &str) -> Option<StageHit> {
        match self
            .provider
            .get_subtitle_content(url, target_language, true)
            .await
        {
            Ok(Some((raw, automatic))) => {
                let method = if automatic { "auto-generated" } else { "official" };
                info!("Found {} captions in {}", method, target_language);
                Some(StageHit {
                    content: clean_caption_content(&raw),
                    source_language: target_language.to_string(),
                    method: method.to_string(),
                })
            }
            Ok(None) => {
                debug!("No native captions in {}", target_language);
                None
            }
            Err(e) => {
                warn!("Native caption probe failed: {}", e);
                None
            }
        }
    }

    /// Stage 2: a caption track in another language, translated to the
    /// target. Translation failure here is not fatal.
    async fn try_foreign_caption(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        target_language: &str,
    ) -> Option<StageHit> {
        let (source_language, raw, automatic) =
            self.find_foreign_caption(url, metadata, target_language).await?;

        let method = if automatic { "auto-generated" } else { "official" };
        let content = clean_caption_content(&raw);

        // A regional variant of the target (en-GB for en) needs no
        // translation at all.
        if same_language(&source_language, target_language) {
            info!(
                "Using {} captions in {} for {} as-is",
                method, source_language, target_language
            );
            return Some(StageHit {
                content,
                source_language,
                method: method.to_string(),
            });
        }

        info!(
            "Translating {} captions from {} to {}",
            method, source_language, target_language
        );
        match self
            .translator
            .translate_timed_text(&content, &source_language, target_language)
            .await
        {
            Ok(translated) => Some(StageHit {
                content: translated,
                source_language,
                method: format!("{}+translated", method),
            }),
            Err(e) => {
                warn!("Caption translation failed, falling back: {}", e);
                None
            }
        }
    }

    /// Pick and download the best foreign caption track: official languages
    /// in the platform's listed order, then preferred automatic languages,
    /// then any automatic language.
    async fn find_foreign_caption(
        &self,
        url: &str,
        metadata: &VideoMetadata,
        target_language: &str,
    ) -> Option<(String, String, bool)> {
        for language in metadata.official_languages() {
            // Stage 1 already probed the exact target tag; everything else,
            // including regional variants of the target, is fair game.
            if language == target_language {
                continue;
            }
            match self.provider.get_subtitle_content(url, language, true).await {
                Ok(Some((raw, automatic))) => {
                    return Some((language.to_string(), raw, automatic));
                }
                Ok(None) => {}
                Err(e) => warn!("Caption download failed for {}: {}", language, e),
            }
        }

        let available = metadata.automatic_languages();
        let candidate = pick_auto_language(
            &available,
            &self.options.preferred_auto_languages,
            target_language,
        )?;
        match self
            .provider
            .get_subtitle_content(url, &candidate, false)
            .await
        {
            Ok(Some((raw, automatic))) => Some((candidate, raw, automatic)),
            Ok(None) => None,
            Err(e) => {
                warn!("Caption download failed for {}: {}", candidate, e);
                None
            }
        }
    }

    /// Stage 3: transcribe the audio with Whisper, translating afterwards if
    /// the detected language differs from the target. The transcription is
    /// cached per video id so later target languages skip the expensive part.
    async fn try_whisper(
        &mut self,
        url: &str,
        metadata: &VideoMetadata,
        target_language: &str,
        translate: bool,
    ) -> Result<Option<StageHit>> {
        let entry = match self.cache.get(&metadata.id) {
            Some(entry) => {
                info!("Reusing cached transcription for {}", metadata.id);
                entry.clone()
            }
            None => {
                let entry = match self.transcribe_video(url, metadata).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Transcription failed: {}", e);
                        return Ok(None);
                    }
                };
                self.cache.insert(&metadata.id, entry.clone());
                entry
            }
        };

        if translate && !same_language(&entry.language, target_language) {
            info!(
                "Translating transcription from {} to {}",
                entry.language, target_language
            );
            let translated = self
                .translator
                .translate_timed_text(&entry.srt_content, &entry.language, target_language)
                .await?;
            return Ok(Some(StageHit {
                content: translated,
                source_language: entry.language,
                method: "whisper+translated".to_string(),
            }));
        }

        Ok(Some(StageHit {
            content: entry.srt_content,
            source_language: entry.language,
            method: "whisper".to_string(),
        }))
    }

    async fn transcribe_video(
        &self,
        url: &str,
        metadata: &VideoMetadata,
    ) -> Result<WhisperCacheEntry> {
        let audio_name = format_audio_filename(&metadata.title, metadata.upload_date.as_deref());
        let stem = audio_name.trim_end_matches(".m4a").to_string();

        let audio_path = self
            .provider
            .download_audio(url, &self.options.audio_dir, &stem)
            .await?;

        let output = self.transcriber.transcribe(&audio_path).await?;
        let srt_content = output.to_srt();
        let language = output
            .language
            .as_deref()
            .map(language_code)
            .unwrap_or_else(|| self.options.fallback_language.clone());

        if !self.options.keep_audio {
            if let Err(e) = std::fs::remove_file(&audio_path) {
                warn!(
                    "Could not delete audio file {}: {}",
                    audio_path.display(),
                    e
                );
            }
        }

        Ok(WhisperCacheEntry {
            srt_content,
            language,
        })
    }
}

/// Convert settled content to the requested output format. The content's own
/// format is detected from its leading bytes.
fn format_result(hit: StageHit, output_format: SubtitleFormat) -> Result<TranscriptResult> {
    let source_format = subtitle::detect_format(&hit.content);
    let content = subtitle::convert(&hit.content, source_format, output_format)?;
    Ok(TranscriptResult {
        content,
        source_language: hit.source_language,
        format: output_format,
        method: hit.method,
    })
}

/// Choose an automatic-caption language: the first preferred language that is
/// available, else the first available one. Only the exact target tag is
/// excluded; stage 1 already probed it.
fn pick_auto_language(
    available: &[&str],
    preferred: &[String],
    target_language: &str,
) -> Option<String> {
    for pref in preferred {
        if pref == target_language {
            continue;
        }
        if available.iter().any(|a| *a == pref.as_str()) {
            return Some(pref.clone());
        }
    }
    available
        .iter()
        .find(|a| **a != target_language)
        .map(|a| a.to_string())
}

/// Compare language tags by primary subtag, so `en` matches `en-US`.
fn same_language(a: &str, b: &str) -> bool {
    let primary = |s: &str| {
        s.split(['-', '_'])
            .next()
            .unwrap_or(s)
            .to_lowercase()
    };
    primary(a) == primary(b)
}
