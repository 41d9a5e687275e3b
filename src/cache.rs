// Process-lifetime cache of Whisper transcription results, keyed by video id.
//
// Transcription is by far the most expensive fetch path, and one video may be
// requested in several target languages. The first successful transcription
// is stored and reused for every later language; entries are never evicted or
// persisted. Languages for one video run sequentially, so there is a single
// writer per key.

use std::collections::HashMap;

/// A cached transcription: the SRT rendering and the detected source language.
#[derive(Debug, Clone, PartialEq)]
pub struct WhisperCacheEntry {
    pub srt_content: String,
    pub language: String,
}

/// In-memory, write-once-per-video transcription cache.
#[derive(Debug, Default)]
pub struct WhisperCache {
    entries: HashMap<String, WhisperCacheEntry>,
}

impl WhisperCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, video_id: &str) -> Option<&WhisperCacheEntry> {
        self.entries.get(video_id)
    }

    /// Store a transcription for a video. The first write wins; later writes
    /// for the same video are ignored.
    pub fn insert(&mut self, video_id: &str, entry: WhisperCacheEntry) {
        self.entries
            .entry(video_id.to_string())
            .or_insert(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content: &str) -> WhisperCacheEntry {
        WhisperCacheEntry {
            srt_content: content.to_string(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache = WhisperCache::new();
        assert!(cache.get("abc123").is_none());
        cache.insert("abc123", entry("1\n00:00:00,000 --> 00:00:01,000\nhi\n"));
        assert_eq!(cache.get("abc123").unwrap().language, "en");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_first_write_wins() {
        let mut cache = WhisperCache::new();
        cache.insert("abc123", entry("first"));
        cache.insert("abc123", entry("second"));
        assert_eq!(cache.get("abc123").unwrap().srt_content, "first");
    }
}
