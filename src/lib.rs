//! YouTube transcript acquisition, translation, and subtitle conversion.
//!
//! Transcripts are obtained through a fallback chain (native captions,
//! translated foreign captions, Whisper transcription) and written out as
//! SRT, VTT, or plain text. An article mode recasts a transcript as prose
//! through the same LLM endpoint.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod subtitle;
pub mod translate;
pub mod utils;
pub mod whisper;
pub mod workflow;
pub mod youtube;

pub use error::{Result, YtSubError};
