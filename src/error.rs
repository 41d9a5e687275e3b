use thiserror::Error;

#[derive(Error, Debug)]
pub enum YtSubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported conversion: {0}")]
    UnsupportedConversion(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Extractor error: {0}")]
    Extractor(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl YtSubError {
    /// Whether the error means a source is simply unavailable, which the
    /// fallback chain treats as "try the next stage".
    pub fn is_not_found(&self) -> bool {
        matches!(self, YtSubError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, YtSubError>;
