// Cleanup of raw platform caption payloads before they enter the codec.
//
// YouTube serves captions either as timed-text (VTT, sometimes littered with
// per-word timing markup) or as the json3 caption-event format. Both are
// normalized here into plain SRT/VTT the codec can handle.

use serde_json::Value;
use tracing::debug;

use super::{SubtitleEntry, format_srt};

/// Normalize raw caption content fetched from the platform.
///
/// JSON event payloads are converted to SRT. Timed-text payloads get inline
/// word-timing tags stripped and immediately-repeated caption lines collapsed
/// (a common auto-caption artifact).
pub fn clean_caption_content(raw: &str) -> String {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match events_to_srt(trimmed) {
            Some(srt) => return srt,
            None => debug!("Caption payload looked like JSON but had no usable events"),
        }
    }

    clean_timed_text(raw)
}

/// Convert the json3 caption-event format to SRT. Events without text
/// segments are skipped. Returns None if the payload is not parseable JSON.
fn events_to_srt(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let events = match &value {
        Value::Object(map) => map.get("events")?.as_array()?,
        Value::Array(array) => array,
        _ => return None,
    };

    let mut entries = Vec::new();
    for event in events {
        let Some(segs) = event.get("segs").and_then(Value::as_array) else {
            continue;
        };
        let text: String = segs
            .iter()
            .filter_map(|seg| seg.get("utf8").and_then(Value::as_str))
            .collect();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        let Some(start_ms) = event.get("tStartMs").and_then(Value::as_u64) else {
            continue;
        };
        let Some(duration_ms) = event.get("dDurationMs").and_then(Value::as_u64) else {
            continue;
        };
        if duration_ms == 0 {
            continue;
        }

        entries.push(SubtitleEntry {
            index: entries.len() + 1,
            start_time: start_ms as f64 / 1000.0,
            end_time: (start_ms + duration_ms) as f64 / 1000.0,
            text: text.to_string(),
        });
    }

    Some(format_srt(&entries))
}

/// Strip `<00:00:01.240><c> word</c>` style markup and collapse repeated
/// caption lines. Index lines, timestamp lines, and blank lines pass through
/// verbatim and never take part in deduplication.
fn clean_timed_text(content: &str) -> String {
    let mut out = Vec::new();
    let mut last_text: Option<String> = None;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.contains("-->") || is_index_line(trimmed) {
            out.push(line.to_string());
            continue;
        }

        let stripped = strip_tags(line);
        let stripped_trimmed = stripped.trim().to_string();
        if stripped_trimmed.is_empty() {
            continue;
        }
        if last_text.as_deref() == Some(stripped_trimmed.as_str()) {
            continue;
        }
        last_text = Some(stripped_trimmed);
        out.push(stripped);
    }

    out.join("\n")
}

fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Remove every `<...>` span from a line.
fn strip_tags(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
