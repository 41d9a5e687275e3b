// Filename formatting, path expansion, and language helpers.

use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &Path) -> PathBuf {
    let Some(s) = path.to_str() else {
        return path.to_path_buf();
    };
    if s == "~" {
        return dirs::home_dir().unwrap_or_else(|| path.to_path_buf());
    }
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Sanitize a video title for use as a filename.
pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' | '|' => out.push('-'),
            ':' => out.push_str(" -"),
            '"' => out.push('\''),
            '*' | '?' | '<' | '>' => {}
            c => out.push(c),
        }
    }
    let trimmed = out.trim().trim_matches('.');
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a transcript filename: `{YYYY-MM-DD} - {Title} [{lang}].{ext}`.
/// The date prefix is omitted when `date_prefix` is None.
pub fn format_output_filename(
    title: &str,
    language: &str,
    extension: &str,
    date_prefix: Option<&str>,
) -> String {
    let safe_title = sanitize_filename(title);
    match date_prefix {
        None => format!("{} [{}].{}", safe_title, language, extension),
        Some(date) => format!(
            "{} - {} [{}].{}",
            normalize_date(date),
            safe_title,
            language,
            extension
        ),
    }
}

/// Format an audio filename: `{YYYY-MM-DD} - {Title} [audio].m4a`.
pub fn format_audio_filename(title: &str, date_prefix: Option<&str>) -> String {
    let safe_title = sanitize_filename(title);
    match date_prefix {
        None => format!("{} [audio].m4a", safe_title),
        Some(date) => format!("{} - {} [audio].m4a", normalize_date(date), safe_title),
    }
}

/// Normalize a `YYYYMMDD` date (yt-dlp's upload_date format) to `YYYY-MM-DD`.
fn normalize_date(date: &str) -> String {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &date[0..4], &date[4..6], &date[6..8])
    } else {
        date.to_string()
    }
}

/// Parse comma-separated language codes.
pub fn parse_language_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Human-readable language name for an ISO 639-1 code, for LLM prompts.
/// Unknown codes fall back to the code itself.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "zh-TW" | "zh-Hant" => "Traditional Chinese",
        "zh-CN" | "zh-Hans" => "Simplified Chinese",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        "id" => "Indonesian",
        "ms" => "Malay",
        "nl" => "Dutch",
        "pl" => "Polish",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "cs" => "Czech",
        "sv" => "Swedish",
        "da" => "Danish",
        "fi" => "Finnish",
        "no" => "Norwegian",
        "el" => "Greek",
        "he" => "Hebrew",
        "ro" => "Romanian",
        "hu" => "Hungarian",
        "bg" => "Bulgarian",
        "hr" => "Croatian",
        "sk" => "Slovak",
        "sl" => "Slovenian",
        "et" => "Estonian",
        "lv" => "Latvian",
        "lt" => "Lithuanian",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b\\c|d"), "a-b-c-d");
        assert_eq!(sanitize_filename("Title: Subtitle"), "Title - Subtitle");
        assert_eq!(sanitize_filename("what?  really*"), "what really");
        assert_eq!(sanitize_filename("  .dotted.  "), "dotted");
    }

    #[test]
    fn test_format_output_filename() {
        assert_eq!(
            format_output_filename("My Video", "en", "srt", Some("20240115")),
            "2024-01-15 - My Video [en].srt"
        );
        assert_eq!(
            format_output_filename("My Video", "ja", "txt", None),
            "My Video [ja].txt"
        );
        assert_eq!(
            format_output_filename("T", "en", "vtt", Some("2024-01-15")),
            "2024-01-15 - T [en].vtt"
        );
    }

    #[test]
    fn test_format_audio_filename() {
        assert_eq!(
            format_audio_filename("Clip", Some("20231201")),
            "2023-12-01 - Clip [audio].m4a"
        );
    }

    #[test]
    fn test_parse_language_codes() {
        assert_eq!(parse_language_codes("en, ja ,ko"), vec!["en", "ja", "ko"]);
        assert_eq!(parse_language_codes("en,,"), vec!["en"]);
    }

    #[test]
    fn test_language_name() {
        assert_eq!(language_name("ja"), "Japanese");
        assert_eq!(language_name("zz"), "zz");
    }
}
