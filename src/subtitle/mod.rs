// Subtitle codec: parsing, serialization, and conversion between the timed
// text formats this tool deals with (SRT, WebVTT) plus plain text extraction.

pub mod normalize;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YtSubError};

/// Supported transcript output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Txt,
}

impl SubtitleFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "srt" => Ok(SubtitleFormat::Srt),
            "vtt" => Ok(SubtitleFormat::Vtt),
            "txt" => Ok(SubtitleFormat::Txt),
            other => Err(YtSubError::Config(format!(
                "Unknown format '{}'. Supported: srt, vtt, txt",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Txt => "txt",
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single subtitle cue. Times are seconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleEntry {
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// Detect the format of subtitle content by its leading bytes. YouTube
/// captions arrive as VTT, Whisper output as SRT.
pub fn detect_format(content: &str) -> SubtitleFormat {
    if content.trim_start().starts_with("WEBVTT") {
        SubtitleFormat::Vtt
    } else {
        SubtitleFormat::Srt
    }
}

/// Parse SRT content into subtitle entries. Malformed blocks are skipped.
pub fn parse_srt(content: &str) -> Vec<SubtitleEntry> {
    let mut entries = Vec::new();

    for block in content.trim().split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.len() < 3 {
            continue;
        }

        let Ok(index) = lines[0].trim().parse::<usize>() else {
            continue;
        };
        let Some((start_time, end_time)) = parse_time_range(lines[1].trim(), false) else {
            continue;
        };
        if end_time <= start_time {
            continue;
        }

        let text = lines[2..].join("\n");
        if text.trim().is_empty() {
            continue;
        }

        entries.push(SubtitleEntry {
            index,
            start_time,
            end_time,
            text,
        });
    }

    entries
}

/// Parse WebVTT content into subtitle entries. The WEBVTT header and any
/// metadata before the first cue are skipped; cues without text are dropped.
pub fn parse_vtt(content: &str) -> Vec<SubtitleEntry> {
    let lines: Vec<&str> = content.trim().split('\n').collect();
    let mut entries = Vec::new();

    // Skip header and metadata until the first timestamp line
    let mut i = 0;
    while i < lines.len() && !looks_like_cue_time(lines[i].trim()) {
        i += 1;
    }

    let mut index = 1;
    while i < lines.len() {
        let line = lines[i].trim();
        let Some((start_time, end_time)) = parse_vtt_cue_times(line) else {
            i += 1;
            continue;
        };

        // Collect text lines until a blank line or the next cue
        i += 1;
        let mut text_lines = Vec::new();
        while i < lines.len() && !lines[i].trim().is_empty() {
            if looks_like_cue_time(lines[i].trim()) {
                break;
            }
            text_lines.push(lines[i]);
            i += 1;
        }

        let text = text_lines.join("\n");
        if !text.trim().is_empty() && end_time > start_time {
            entries.push(SubtitleEntry {
                index,
                start_time,
                end_time,
                text,
            });
            index += 1;
        }

        while i < lines.len() && lines[i].trim().is_empty() {
            i += 1;
        }
    }

    entries
}

/// Format entries as SRT, re-indexed sequentially from 1.
pub fn format_srt(entries: &[SubtitleEntry]) -> String {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.push((i + 1).to_string());
        lines.push(format!(
            "{} --> {}",
            format_timestamp(entry.start_time, ','),
            format_timestamp(entry.end_time, ',')
        ));
        lines.push(entry.text.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Format entries as WebVTT. VTT cues carry no numeric index.
pub fn format_vtt(entries: &[SubtitleEntry]) -> String {
    let mut lines = vec!["WEBVTT".to_string(), String::new()];
    for entry in entries {
        lines.push(format!(
            "{} --> {}",
            format_timestamp(entry.start_time, '.'),
            format_timestamp(entry.end_time, '.')
        ));
        lines.push(entry.text.clone());
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Format entries as plain text, one cue's text per line, timestamps dropped.
pub fn format_txt(entries: &[SubtitleEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert subtitle content between formats. Plain text carries no timing
/// data, so it can never be a conversion source.
pub fn convert(
    content: &str,
    source_format: SubtitleFormat,
    target_format: SubtitleFormat,
) -> Result<String> {
    if source_format == target_format {
        return Ok(content.to_string());
    }

    let entries = match source_format {
        SubtitleFormat::Srt => parse_srt(content),
        SubtitleFormat::Vtt => parse_vtt(content),
        SubtitleFormat::Txt => {
            return Err(YtSubError::UnsupportedConversion(
                "cannot convert from plain text (no timestamps)".to_string(),
            ));
        }
    };

    Ok(match target_format {
        SubtitleFormat::Srt => format_srt(&entries),
        SubtitleFormat::Vtt => format_vtt(&entries),
        SubtitleFormat::Txt => format_txt(&entries),
    })
}

/// Format seconds as a subtitle timestamp, truncating at the millisecond.
pub fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0) as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, secs, millis_sep, millis
    )
}

/// Whether a line begins like a cue timestamp (`dd:dd`).
fn looks_like_cue_time(line: &str) -> bool {
    let b = line.as_bytes();
    b.len() >= 5
        && b[0].is_ascii_digit()
        && b[1].is_ascii_digit()
        && b[2] == b':'
        && b[3].is_ascii_digit()
        && b[4].is_ascii_digit()
}

/// Parse a strict `HH:MM:SS[,.]mmm --> HH:MM:SS[,.]mmm` range. When
/// `allow_trailing` is set, cue settings after the end timestamp are ignored.
fn parse_time_range(line: &str, allow_trailing: bool) -> Option<(f64, f64)> {
    let (start_raw, end_raw) = line.split_once("-->")?;
    let start = parse_timestamp(start_raw.trim())?;
    let end_raw = end_raw.trim();
    let end = if allow_trailing {
        parse_timestamp(end_raw.get(..12)?)?
    } else {
        parse_timestamp(end_raw)?
    };
    Some((start, end))
}

/// Parse a VTT cue timing line. Hours may be omitted (`MM:SS.mmm`), and
/// trailing cue settings are tolerated.
fn parse_vtt_cue_times(line: &str) -> Option<(f64, f64)> {
    if let Some(times) = parse_time_range(line, true) {
        return Some(times);
    }

    // Short form without hours: MM:SS.mmm --> MM:SS.mmm
    let (start_raw, end_raw) = line.split_once("-->")?;
    let start = parse_short_timestamp(start_raw.trim())?;
    let end_raw = end_raw.trim();
    let end = parse_short_timestamp(end_raw.get(..9).unwrap_or(end_raw))?;
    Some((start, end))
}

/// Parse `HH:MM:SS[,.]mmm` to seconds.
fn parse_timestamp(raw: &str) -> Option<f64> {
    let b = raw.as_bytes();
    if b.len() != 12 || b[2] != b':' || b[5] != b':' || (b[8] != b',' && b[8] != b'.') {
        return None;
    }
    let hours: u64 = raw[0..2].parse().ok()?;
    let minutes: u64 = raw[3..5].parse().ok()?;
    let seconds: u64 = raw[6..8].parse().ok()?;
    let millis: u64 = raw[9..12].parse().ok()?;
    Some((hours * 3600 + minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

/// Parse the hourless `MM:SS.mmm` form to seconds.
fn parse_short_timestamp(raw: &str) -> Option<f64> {
    let b = raw.as_bytes();
    if b.len() != 9 || b[2] != b':' || (b[5] != b'.' && b[5] != b',') {
        return None;
    }
    let minutes: u64 = raw[0..2].parse().ok()?;
    let seconds: u64 = raw[3..5].parse().ok()?;
    let millis: u64 = raw[6..9].parse().ok()?;
    Some((minutes * 60 + seconds) as f64 + millis as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SRT: &str =
        "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:03,500 --> 00:00:04,250\nWorld\n";

    fn sample_entries() -> Vec<SubtitleEntry> {
        vec![
            SubtitleEntry {
                index: 1,
                start_time: 1.0,
                end_time: 2.0,
                text: "Hello".to_string(),
            },
            SubtitleEntry {
                index: 2,
                start_time: 3.5,
                end_time: 4.25,
                text: "World".to_string(),
            },
        ]
    }

    #[test]
    fn test_parse_srt_basic() {
        let entries = parse_srt(SAMPLE_SRT);
        assert_eq!(entries, sample_entries());
    }

    #[test]
    fn test_parse_srt_skips_malformed_blocks() {
        let content = "not-a-number\n00:00:01,000 --> 00:00:02,000\nBad\n\n\
                       1\nnot a timestamp\nAlso bad\n\n\
                       2\n00:00:05,000 --> 00:00:04,000\nBackwards\n\n\
                       3\n00:00:06,000 --> 00:00:07,000\nGood\n";
        let entries = parse_srt(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Good");
    }

    #[test]
    fn test_parse_srt_multiline_text() {
        let content = "1\n00:00:01,000 --> 00:00:03,000\nLine one\nLine two\n";
        let entries = parse_srt(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Line one\nLine two");
    }

    #[test]
    fn test_parse_vtt_with_header() {
        let content = "WEBVTT\nKind: captions\nLanguage: en\n\n\
                       00:00:01.000 --> 00:00:02.000\nHello\n\n\
                       00:00:03.500 --> 00:00:04.250\nWorld\n";
        let entries = parse_vtt(content);
        assert_eq!(entries, sample_entries());
    }

    #[test]
    fn test_parse_vtt_hourless_timestamps() {
        let content = "WEBVTT\n\n00:05.000 --> 00:07.500\nShort form\n";
        let entries = parse_vtt(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].start_time, 5.0);
        assert_eq!(entries[0].end_time, 7.5);
    }

    #[test]
    fn test_parse_vtt_cue_settings_ignored() {
        let content = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000 align:start position:0%\nHello\n";
        let entries = parse_vtt(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].end_time, 2.0);
    }

    #[test]
    fn test_parse_vtt_drops_textless_cues() {
        let content = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n\n00:00:03.000 --> 00:00:04.000\nKept\n";
        let entries = parse_vtt(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[0].text, "Kept");
    }

    #[test]
    fn test_format_vtt_literal_output() {
        let vtt = format_vtt(&sample_entries());
        assert_eq!(
            vtt,
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello\n\n00:00:03.500 --> 00:00:04.250\nWorld\n"
        );
    }

    #[test]
    fn test_format_srt_reindexes() {
        let mut entries = sample_entries();
        entries[0].index = 17;
        entries[1].index = 42;
        let srt = format_srt(&entries);
        assert!(srt.starts_with("1\n00:00:01,000"));
        assert!(srt.contains("\n2\n00:00:03,500"));
    }

    #[test]
    fn test_srt_round_trip() {
        let entries = sample_entries();
        let parsed = parse_srt(&format_srt(&entries));
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_vtt_round_trip() {
        let entries = sample_entries();
        let parsed = parse_vtt(&format_vtt(&entries));
        assert_eq!(parsed, entries);
    }

    #[test]
    fn test_round_trip_truncates_to_millisecond() {
        let entries = vec![SubtitleEntry {
            index: 1,
            start_time: 1.2345678,
            end_time: 2.9996,
            text: "precise".to_string(),
        }];
        let parsed = parse_srt(&format_srt(&entries));
        assert_eq!(parsed[0].start_time, 1.234);
        assert_eq!(parsed[0].end_time, 2.999);
    }

    #[test]
    fn test_convert_identity() {
        let out = convert(SAMPLE_SRT, SubtitleFormat::Srt, SubtitleFormat::Srt).unwrap();
        assert_eq!(out, SAMPLE_SRT);
    }

    #[test]
    fn test_convert_srt_to_vtt() {
        let vtt = convert(SAMPLE_SRT, SubtitleFormat::Srt, SubtitleFormat::Vtt).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:03.500 --> 00:00:04.250"));
    }

    #[test]
    fn test_convert_to_txt_drops_timestamps() {
        let txt = convert(SAMPLE_SRT, SubtitleFormat::Srt, SubtitleFormat::Txt).unwrap();
        assert_eq!(txt, "Hello\nWorld");
    }

    #[test]
    fn test_convert_from_txt_is_unsupported() {
        for target in [SubtitleFormat::Srt, SubtitleFormat::Vtt] {
            let err = convert("anything at all", SubtitleFormat::Txt, target).unwrap_err();
            assert!(matches!(err, YtSubError::UnsupportedConversion(_)));
        }
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("WEBVTT\n\n..."), SubtitleFormat::Vtt);
        assert_eq!(detect_format("\n WEBVTT"), SubtitleFormat::Vtt);
        assert_eq!(detect_format(SAMPLE_SRT), SubtitleFormat::Srt);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0, ','), "00:00:00,000");
        assert_eq!(format_timestamp(65.123, ','), "00:01:05,123");
        assert_eq!(format_timestamp(3661.5, '.'), "01:01:01.500");
        assert_eq!(format_timestamp(359999.999, ','), "99:59:59,999");
    }
}
