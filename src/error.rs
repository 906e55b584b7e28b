use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidlocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to probe media: {0}")]
    ProbeFailed(String),

    #[error("Audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Subtitle burn-in failed: {0}")]
    BurnFailed(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Command reported success but produced no output: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Translation service unreachable: {0}")]
    Transport(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Cue set is empty")]
    EmptyCueSet,

    #[error("No valid subtitle blocks found")]
    EmptyInput,

    #[error("Input too large: {size} bytes exceeds the {limit} byte limit")]
    InputTooLarge { size: u64, limit: u64 },

    #[error("Invalid job state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl VidlocError {
    /// Whether the error came from reaching a remote service rather than from its answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_) | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, VidlocError>;
