// yt-dlp subprocess adapter: video metadata, caption retrieval, audio
// download. All platform access goes through this module.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::YoutubeConfig;
use crate::error::{Result, YtSubError};

/// One downloadable rendition of a caption track.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionFormat {
    pub ext: String,
    pub name: Option<String>,
}

/// A caption track in one language, with its available formats.
#[derive(Debug, Clone)]
pub struct CaptionTrack {
    pub language: String,
    pub formats: Vec<CaptionFormat>,
}

/// Video metadata as reported by the extractor. Caption track lists keep the
/// platform's listed order, which the fallback chain relies on.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub subtitles: Vec<CaptionTrack>,
    pub automatic_captions: Vec<CaptionTrack>,
}

impl VideoMetadata {
    pub fn official_languages(&self) -> Vec<&str> {
        self.subtitles.iter().map(|t| t.language.as_str()).collect()
    }

    pub fn automatic_languages(&self) -> Vec<&str> {
        self.automatic_captions
            .iter()
            .map(|t| t.language.as_str())
            .collect()
    }
}

/// Platform access seam for the fallback chain.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn get_metadata(&self, url: &str) -> Result<VideoMetadata>;

    /// Download caption content for one language. Returns the raw content and
    /// whether it came from an automatic track, or None when neither an
    /// official nor an automatic track exists for the language.
    async fn get_subtitle_content(
        &self,
        url: &str,
        language: &str,
        prefer_official: bool,
    ) -> Result<Option<(String, bool)>>;

    /// Download the best audio stream into `output_dir`. Returns the path of
    /// the produced file.
    async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        filename_stem: &str,
    ) -> Result<PathBuf>;
}

pub struct YtDlpClient {
    config: YoutubeConfig,
}

impl YtDlpClient {
    pub fn new(config: YoutubeConfig) -> Self {
        Self { config }
    }

    /// Flags shared by every invocation: quiet output plus the configured
    /// cookie and player-client passthroughs.
    fn base_args(&self) -> Vec<String> {
        let mut args = vec!["--no-warnings".to_string(), "--quiet".to_string()];
        if let Some(cookies) = &self.config.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.clone());
        }
        if let Some(browser) = &self.config.cookies_from_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.clone());
        }
        if let Some(client) = &self.config.player_client {
            args.push("--extractor-args".to_string());
            args.push(format!("youtube:player_client={}", client));
        }
        args
    }

    async fn run(&self, args: &[String]) -> Result<std::process::Output> {
        debug!("Running yt-dlp {}", args.join(" "));
        Command::new("yt-dlp")
            .args(args)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    YtSubError::Extractor(
                        "yt-dlp not found. Install it and make sure it is on PATH.".to_string(),
                    )
                } else {
                    YtSubError::Io(e)
                }
            })
    }

    /// One caption download attempt against either the official or the
    /// automatic track set.
    async fn try_subtitle_download(
        &self,
        url: &str,
        language: &str,
        automatic: bool,
    ) -> Result<Option<String>> {
        let dir = tempfile::tempdir()?;
        let template = dir.path().join("captions.%(ext)s");

        let mut args = self.base_args();
        if automatic {
            args.push("--write-auto-subs".to_string());
        } else {
            args.push("--write-subs".to_string());
        }
        args.extend([
            "--skip-download".to_string(),
            "--sub-langs".to_string(),
            language.to_string(),
            "--sub-format".to_string(),
            "vtt/srt/best".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ]);

        let output = self.run(&args).await?;
        if !output.status.success() {
            debug!(
                "Caption download failed ({} track, {}): {}",
                if automatic { "automatic" } else { "official" },
                language,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let Some(path) = find_subtitle_file(dir.path())? else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }
}

#[async_trait]
impl CaptionProvider for YtDlpClient {
    async fn get_metadata(&self, url: &str) -> Result<VideoMetadata> {
        info!("Fetching metadata for {}", url);
        let mut args = self.base_args();
        args.extend(["-J".to_string(), url.to_string()]);

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(YtSubError::Extractor(format!(
                "Metadata extraction failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() || stdout.trim() == "null" {
            return Err(YtSubError::NotFound(format!(
                "No metadata extracted for {}",
                url
            )));
        }

        parse_metadata(&stdout)
    }

    async fn get_subtitle_content(
        &self,
        url: &str,
        language: &str,
        prefer_official: bool,
    ) -> Result<Option<(String, bool)>> {
        // (automatic?, then the other kind) in preference order
        let order: [bool; 2] = if prefer_official {
            [false, true]
        } else {
            [true, false]
        };

        for automatic in order {
            if let Some(content) = self.try_subtitle_download(url, language, automatic).await? {
                info!(
                    "Downloaded {} captions for {} ({} chars)",
                    if automatic { "automatic" } else { "official" },
                    language,
                    content.len()
                );
                return Ok(Some((content, automatic)));
            }
        }
        Ok(None)
    }

    async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        filename_stem: &str,
    ) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let template = output_dir.join(format!("{}.%(ext)s", filename_stem));

        info!("Downloading audio for {}", url);
        let mut args = self.base_args();
        args.extend([
            "-f".to_string(),
            "bestaudio[ext=m4a]/bestaudio".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url.to_string(),
        ]);

        let output = self.run(&args).await?;
        if !output.status.success() {
            warn!(
                "Audio download failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        find_file_with_stem(output_dir, filename_stem)?.ok_or_else(|| {
            YtSubError::NotFound(format!("No audio stream resolved for {}", url))
        })
    }
}

/// Parse the `-J` JSON dump. Caption maps keep insertion order because
/// serde_json is built with `preserve_order`.
fn parse_metadata(raw: &str) -> Result<VideoMetadata> {
    #[derive(Deserialize)]
    struct RawMetadata {
        id: String,
        title: Option<String>,
        upload_date: Option<String>,
        uploader: Option<String>,
        duration: Option<f64>,
        #[serde(default)]
        subtitles: serde_json::Map<String, Value>,
        #[serde(default)]
        automatic_captions: serde_json::Map<String, Value>,
    }

    let raw: RawMetadata = serde_json::from_str(raw)
        .map_err(|e| YtSubError::Extractor(format!("Unparseable metadata JSON: {}", e)))?;

    Ok(VideoMetadata {
        title: raw.title.unwrap_or_else(|| raw.id.clone()),
        id: raw.id,
        upload_date: raw.upload_date,
        uploader: raw.uploader,
        duration: raw.duration,
        subtitles: caption_tracks(&raw.subtitles),
        automatic_captions: caption_tracks(&raw.automatic_captions),
    })
}

fn caption_tracks(map: &serde_json::Map<String, Value>) -> Vec<CaptionTrack> {
    map.iter()
        .map(|(language, formats)| CaptionTrack {
            language: language.clone(),
            formats: formats
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|f| serde_json::from_value(f.clone()).ok())
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn find_subtitle_file(dir: &Path) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let ext = path.extension().and_then(|e| e.to_str());
        if matches!(ext, Some("vtt") | Some("srt")) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn find_file_with_stem(dir: &Path, stem: &str) -> Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(stem))
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_preserves_caption_order() {
        let raw = r#"{
            "id": "abc123",
            "title": "A Video",
            "upload_date": "20240115",
            "uploader": "someone",
            "duration": 123.4,
            "subtitles": {
                "ja": [{"ext": "vtt", "name": "Japanese"}],
                "en": [{"ext": "vtt", "name": "English"}, {"ext": "srt"}]
            },
            "automatic_captions": {
                "de": [{"ext": "vtt"}],
                "en": [{"ext": "vtt"}]
            }
        }"#;
        let metadata = parse_metadata(raw).unwrap();
        assert_eq!(metadata.id, "abc123");
        assert_eq!(metadata.title, "A Video");
        assert_eq!(metadata.official_languages(), vec!["ja", "en"]);
        assert_eq!(metadata.automatic_languages(), vec!["de", "en"]);
        assert_eq!(metadata.subtitles[1].formats.len(), 2);
    }

    #[test]
    fn test_parse_metadata_defaults() {
        let raw = r#"{"id": "xyz"}"#;
        let metadata = parse_metadata(raw).unwrap();
        assert_eq!(metadata.title, "xyz");
        assert!(metadata.subtitles.is_empty());
        assert!(metadata.upload_date.is_none());
    }

    #[test]
    fn test_parse_metadata_rejects_garbage() {
        assert!(parse_metadata("not json").is_err());
    }

    #[test]
    fn test_find_subtitle_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_subtitle_file(dir.path()).unwrap().is_none());
        std::fs::write(dir.path().join("captions.en.vtt"), "WEBVTT\n").unwrap();
        let found = find_subtitle_file(dir.path()).unwrap().unwrap();
        assert_eq!(found.extension().unwrap(), "vtt");
    }

    #[test]
    fn test_find_file_with_stem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip [audio].m4a"), b"x").unwrap();
        let found = find_file_with_stem(dir.path(), "clip [audio]").unwrap().unwrap();
        assert!(found.to_string_lossy().ends_with(".m4a"));
        assert!(find_file_with_stem(dir.path(), "other").unwrap().is_none());
    }
}
