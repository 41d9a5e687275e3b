use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::error::{Result, YtSubError};
use crate::subtitle::{self, SubtitleFormat};
use crate::translate::ArticleLength;
use crate::utils::parse_language_codes;
use crate::workflow::{ProcessOptions, Workflow};
use crate::youtube::{CaptionProvider, YtDlpClient};

#[derive(Parser)]
#[command(name = "ytsub", version, about = "YouTube transcript fetcher and translator")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch transcripts for a video, translating or transcribing as needed
    Fetch {
        /// Video URL
        url: String,
        /// Comma-separated target languages (defaults to the configured list)
        #[arg(short, long)]
        languages: Option<String>,
        /// Output format: srt, vtt, or txt
        #[arg(short, long, default_value = "srt")]
        format: String,
        /// Overwrite existing transcript files
        #[arg(long)]
        force: bool,
        /// Only use captions already in the target language
        #[arg(long)]
        no_translate: bool,
        /// Keep the downloaded audio file after transcription
        #[arg(long)]
        keep_audio: bool,
    },
    /// Render a video's transcript as a prose article
    Article {
        /// Video URL
        url: String,
        /// Article language
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Article length: original, long, medium, or short
        #[arg(long, default_value = "original")]
        length: String,
        /// Overwrite an existing article file
        #[arg(long)]
        force: bool,
    },
    /// Convert a local subtitle file between formats
    Convert {
        /// Input file (.srt or .vtt)
        input: PathBuf,
        /// Target format: srt, vtt, or txt
        #[arg(short, long)]
        to: String,
        /// Output file (defaults to the input path with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the caption tracks available for a video
    Captions {
        /// Video URL
        url: String,
    },
    /// Write a default configuration file
    Init {
        /// Destination (defaults to the standard config location)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Fetch {
            url,
            languages,
            format,
            force,
            no_translate,
            keep_audio,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let languages = match languages {
                Some(raw) => parse_language_codes(&raw),
                None => config.languages.clone(),
            };
            if languages.is_empty() {
                return Err(YtSubError::Config(
                    "No target languages given".to_string(),
                ));
            }
            let output_format = SubtitleFormat::from_str(&format)?;

            let mut workflow = Workflow::new(config, keep_audio)?;
            let written = workflow
                .process_video(
                    &url,
                    &ProcessOptions {
                        languages,
                        output_format,
                        force,
                        translate: !no_translate,
                    },
                )
                .await?;
            for path in written {
                println!("{}", path.display());
            }
            Ok(())
        }

        Commands::Article {
            url,
            language,
            length,
            force,
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let length = ArticleLength::from_str(&length)?;
            let mut workflow = Workflow::new(config, false)?;
            let path = workflow.generate_article(&url, &language, length, force).await?;
            println!("{}", path.display());
            Ok(())
        }

        Commands::Convert { input, to, output } => {
            let target = SubtitleFormat::from_str(&to)?;
            let source = format_from_path(&input)?;
            let content = std::fs::read_to_string(&input)?;
            let converted = subtitle::convert(&content, source, target)?;

            let output = output.unwrap_or_else(|| input.with_extension(target.extension()));
            std::fs::write(&output, converted)?;
            info!("Converted {} to {}", input.display(), output.display());
            println!("{}", output.display());
            Ok(())
        }

        Commands::Captions { url } => {
            let config = Config::load(cli.config.as_deref())?;
            let provider = YtDlpClient::new(config.youtube);
            let metadata = provider.get_metadata(&url).await?;

            println!("{} ({})", metadata.title, metadata.id);
            println!("\nOfficial caption tracks:");
            if metadata.subtitles.is_empty() {
                println!("  (none)");
            }
            for track in &metadata.subtitles {
                println!("  {}", describe_track(track));
            }
            println!("\nAutomatic caption tracks:");
            if metadata.automatic_captions.is_empty() {
                println!("  (none)");
            }
            for track in &metadata.automatic_captions {
                println!("  {}", describe_track(track));
            }
            Ok(())
        }

        Commands::Init { path, force } => {
            let path = path.unwrap_or_else(Config::default_path);
            if path.exists() && !force {
                return Err(YtSubError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            Config::default().save_to_file(&path)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn format_from_path(path: &PathBuf) -> Result<SubtitleFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            YtSubError::Config(format!(
                "Cannot tell the format of {} (no extension)",
                path.display()
            ))
        })?;
    SubtitleFormat::from_str(ext)
}

fn describe_track(track: &crate::youtube::CaptionTrack) -> String {
    let name = track
        .formats
        .iter()
        .find_map(|f| f.name.as_deref())
        .unwrap_or("");
    let exts: Vec<&str> = track.formats.iter().map(|f| f.ext.as_str()).collect();
    if name.is_empty() {
        format!("{} [{}]", track.language, exts.join(", "))
    } else {
        format!("{} - {} [{}]", track.language, name, exts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::try_parse_from([
            "ytsub", "fetch", "https://youtu.be/x", "-l", "en,ja", "--format", "vtt", "--force",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch {
                url,
                languages,
                format,
                force,
                no_translate,
                keep_audio,
            } => {
                assert_eq!(url, "https://youtu.be/x");
                assert_eq!(languages.as_deref(), Some("en,ja"));
                assert_eq!(format, "vtt");
                assert!(force);
                assert!(!no_translate);
                assert!(!keep_audio);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_article_defaults() {
        let cli = Cli::try_parse_from(["ytsub", "article", "https://youtu.be/x"]).unwrap();
        match cli.command {
            Commands::Article {
                language, length, ..
            } => {
                assert_eq!(language, "en");
                assert_eq!(length, "original");
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            format_from_path(&PathBuf::from("a.srt")).unwrap(),
            SubtitleFormat::Srt
        );
        assert!(format_from_path(&PathBuf::from("noext")).is_err());
    }
}
