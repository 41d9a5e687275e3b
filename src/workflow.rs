// Drives the per-video work: metadata once, then one fetch per target
// language against a shared fetcher so a single Whisper transcription serves
// every language. Also hosts the article mode.

use chrono::Local;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::{Config, FilenameDate};
use crate::error::{Result, YtSubError};
use crate::fetcher::{FetcherOptions, TranscriptFetcher, TranscriptResult};
use crate::subtitle::SubtitleFormat;
use crate::translate::{ArticleLength, TranslationClient, Translator};
use crate::utils::format_output_filename;
use crate::whisper::WhisperClient;
use crate::youtube::{CaptionProvider, VideoMetadata, YtDlpClient};

/// Per-run options for transcript processing.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub languages: Vec<String>,
    pub output_format: SubtitleFormat,
    pub force: bool,
    pub translate: bool,
}

pub struct Workflow {
    config: Config,
    provider: Box<dyn CaptionProvider>,
    fetcher: TranscriptFetcher,
    translator: Box<dyn Translator>,
}

impl Workflow {
    pub fn new(config: Config, keep_audio: bool) -> Result<Self> {
        let provider = Box::new(YtDlpClient::new(config.youtube.clone()));
        let fetcher = TranscriptFetcher::new(
            Box::new(YtDlpClient::new(config.youtube.clone())),
            Box::new(WhisperClient::new(config.transcription.clone())?),
            Box::new(TranslationClient::new(config.llm.clone())?),
            FetcherOptions {
                preferred_auto_languages: config.fallback.preferred_auto_languages.clone(),
                fallback_language: config.transcription.fallback_language.clone(),
                audio_dir: config.storage.audio_dir.clone(),
                keep_audio,
            },
        );
        let translator = Box::new(TranslationClient::new(config.llm.clone())?);

        Ok(Self {
            config,
            provider,
            fetcher,
            translator,
        })
    }

    #[cfg(test)]
    fn with_parts(
        config: Config,
        provider: Box<dyn CaptionProvider>,
        fetcher: TranscriptFetcher,
        translator: Box<dyn Translator>,
    ) -> Self {
        Self {
            config,
            provider,
            fetcher,
            translator,
        }
    }

    /// Fetch transcripts for every requested language and write them to the
    /// transcript directory. Returns the paths of all transcripts that exist
    /// afterwards, freshly written or skipped.
    pub async fn process_video(
        &mut self,
        url: &str,
        options: &ProcessOptions,
    ) -> Result<Vec<PathBuf>> {
        let metadata = self.provider.get_metadata(url).await?;
        info!("Processing \"{}\" ({})", metadata.title, metadata.id);

        let date_prefix = self.date_prefix(&metadata);
        std::fs::create_dir_all(&self.config.storage.transcript_dir)?;

        let mut written = Vec::new();
        let mut last_error = None;

        for language in &options.languages {
            let filename = format_output_filename(
                &metadata.title,
                language,
                options.output_format.extension(),
                date_prefix.as_deref(),
            );
            let path = self.config.storage.transcript_dir.join(filename);

            if path.exists() && !options.force {
                info!("Skipping existing transcript {}", path.display());
                written.push(path);
                continue;
            }

            match self
                .fetcher
                .fetch(url, &metadata, language, options.output_format, options.translate)
                .await
            {
                Ok(result) => {
                    std::fs::write(&path, &result.content)?;
                    info!(
                        "Wrote {} ({}, source {})",
                        path.display(),
                        result.method,
                        result.source_language
                    );
                    written.push(path);
                }
                Err(e) => {
                    warn!("No transcript for {} in {}: {}", metadata.id, language, e);
                    last_error = Some(e);
                }
            }
        }

        if written.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(written)
    }

    /// Render the video's transcript as a prose article in one language.
    pub async fn generate_article(
        &mut self,
        url: &str,
        language: &str,
        length: ArticleLength,
        force: bool,
    ) -> Result<PathBuf> {
        let metadata = self.provider.get_metadata(url).await?;
        info!("Generating article for \"{}\" ({})", metadata.title, metadata.id);

        let date_prefix = self.date_prefix(&metadata);
        let filename =
            format_output_filename(&metadata.title, language, "md", date_prefix.as_deref());
        let path = self.config.storage.article_dir.join(filename);

        if path.exists() && !force {
            info!("Skipping existing article {}", path.display());
            return Ok(path);
        }

        let source = self.fetcher.fetch_any(url, &metadata, language).await?;
        info!(
            "Article source: {} transcript in {}",
            source.method, source.source_language
        );

        let article = self
            .translator
            .generate_article(&source.content, language, length)
            .await?;

        let content = if self.config.output.article_metadata {
            format!("{}{}", article_header(&metadata, url, &source), article)
        } else {
            article
        };

        std::fs::create_dir_all(&self.config.storage.article_dir)?;
        std::fs::write(&path, content)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    fn date_prefix(&self, metadata: &VideoMetadata) -> Option<String> {
        match self.config.output.filename_date {
            FilenameDate::Upload => metadata
                .upload_date
                .clone()
                .or_else(|| Some(Local::now().format("%Y-%m-%d").to_string())),
            FilenameDate::Request => Some(Local::now().format("%Y-%m-%d").to_string()),
            FilenameDate::None => None,
        }
    }
}

fn article_header(metadata: &VideoMetadata, url: &str, source: &TranscriptResult) -> String {
    let mut header = String::from("---\n");
    header.push_str(&format!("title: \"{}\"\n", metadata.title.replace('"', "'")));
    if let Some(uploader) = &metadata.uploader {
        header.push_str(&format!("uploader: \"{}\"\n", uploader.replace('"', "'")));
    }
    if let Some(date) = &metadata.upload_date {
        header.push_str(&format!("upload_date: {}\n", date));
    }
    header.push_str(&format!("source: {}\n", url));
    header.push_str(&format!(
        "transcript: {} ({})\n",
        source.method, source.source_language
    ));
    header.push_str(&format!(
        "generated: {}\n",
        Local::now().format("%Y-%m-%d")
    ));
    header.push_str("---\n\n");
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::Result;
    use crate::whisper::{SpeechTranscriber, TranscriptionOutput};
    use crate::youtube::CaptionTrack;
    use async_trait::async_trait;
    use std::path::Path;

    const EN_SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n";

    struct StubProvider;

    #[async_trait]
    impl CaptionProvider for StubProvider {
        async fn get_metadata(&self, _url: &str) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                id: "vid123".to_string(),
                title: "Title: A/B".to_string(),
                upload_date: Some("20240115".to_string()),
                uploader: Some("someone".to_string()),
                duration: Some(60.0),
                subtitles: vec![CaptionTrack {
                    language: "en".to_string(),
                    formats: Vec::new(),
                }],
                automatic_captions: Vec::new(),
            })
        }

        async fn get_subtitle_content(
            &self,
            _url: &str,
            language: &str,
            _prefer_official: bool,
        ) -> Result<Option<(String, bool)>> {
            if language == "en" {
                Ok(Some((EN_SRT.to_string(), false)))
            } else {
                Ok(None)
            }
        }

        async fn download_audio(
            &self,
            _url: &str,
            _output_dir: &Path,
            _filename_stem: &str,
        ) -> Result<PathBuf> {
            Err(YtSubError::NotFound("no audio".to_string()))
        }
    }

    struct StubTranscriber;

    #[async_trait]
    impl SpeechTranscriber for StubTranscriber {
        async fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptionOutput> {
            Err(YtSubError::Transcription("unused".to_string()))
        }
    }

    struct StubTranslator;

    #[async_trait]
    impl Translator for StubTranslator {
        async fn translate(
            &self,
            text: &str,
            _source_language: &str,
            target_language: &str,
            _preserve_formatting: bool,
        ) -> Result<String> {
            Ok(format!("[{}] {}", target_language, text))
        }

        async fn translate_timed_text(
            &self,
            content: &str,
            source_language: &str,
            target_language: &str,
        ) -> Result<String> {
            self.translate(content, source_language, target_language, true)
                .await
        }

        async fn generate_article(
            &self,
            content: &str,
            language: &str,
            _length: ArticleLength,
        ) -> Result<String> {
            Ok(format!("# Article in {}\n\n{}\n", language, content))
        }
    }

    fn workflow(dir: &Path) -> Workflow {
        let mut config = Config::default();
        config.storage = StorageConfig {
            audio_dir: dir.join("audio"),
            transcript_dir: dir.join("transcripts"),
            article_dir: dir.join("articles"),
        };
        let fetcher = TranscriptFetcher::new(
            Box::new(StubProvider),
            Box::new(StubTranscriber),
            Box::new(StubTranslator),
            FetcherOptions {
                preferred_auto_languages: vec!["en".to_string()],
                fallback_language: "en".to_string(),
                audio_dir: config.storage.audio_dir.clone(),
                keep_audio: true,
            },
        );
        Workflow::with_parts(config, Box::new(StubProvider), fetcher, Box::new(StubTranslator))
    }

    #[tokio::test]
    async fn test_process_video_writes_dated_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut wf = workflow(dir.path());

        let written = wf
            .process_video(
                "url",
                &ProcessOptions {
                    languages: vec!["en".to_string()],
                    output_format: SubtitleFormat::Srt,
                    force: false,
                    translate: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(written.len(), 1);
        let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "2024-01-15 - Title - A-B [en].srt");
        let content = std::fs::read_to_string(&written[0]).unwrap();
        assert!(content.contains("Hello"));
    }

    #[tokio::test]
    async fn test_process_video_skips_existing_unless_forced() {
        let dir = tempfile::tempdir().unwrap();
        let mut wf = workflow(dir.path());
        let options = ProcessOptions {
            languages: vec!["en".to_string()],
            output_format: SubtitleFormat::Srt,
            force: false,
            translate: true,
        };

        let first = wf.process_video("url", &options).await.unwrap();
        std::fs::write(&first[0], "sentinel").unwrap();

        let second = wf.process_video("url", &options).await.unwrap();
        assert_eq!(std::fs::read_to_string(&second[0]).unwrap(), "sentinel");

        let forced = ProcessOptions {
            force: true,
            ..options
        };
        let third = wf.process_video("url", &forced).await.unwrap();
        assert!(std::fs::read_to_string(&third[0]).unwrap().contains("Hello"));
    }

    #[tokio::test]
    async fn test_article_has_metadata_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut wf = workflow(dir.path());

        let path = wf
            .generate_article("https://example.com/v", "ja", ArticleLength::Medium, false)
            .await
            .unwrap();

        assert!(path.to_string_lossy().ends_with("[ja].md"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("---\n"));
        assert!(content.contains("source: https://example.com/v"));
        assert!(content.contains("transcript: official (en)"));
        assert!(content.contains("# Article in ja"));
    }
}
