//! Error type shared by every stage of a generation request.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur while dispatching a generation request.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("No prompt provided")]
    EmptyPrompt,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported file type: {extension}\n\nSupported types: {supported}")]
    UnsupportedFileType {
        /// Extension of the rejected file, including the leading dot (may be empty)
        extension: String,
        /// Comma-separated list of accepted extensions
        supported: String,
    },

    #[error("File must be an image for video generation: {}", .0.display())]
    NotAnImage(PathBuf),

    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("{what} timed out after {} seconds", .after.as_secs())]
    Timeout {
        /// The operation that was being waited on
        what: &'static str,
        /// The deadline that elapsed
        after: Duration,
    },

    #[error("Video generation failed: {0}")]
    OperationFailed(String),

    #[error("No video was generated")]
    NoVideoGenerated,

    #[error("No video URI in response")]
    NoVideoUri,

    #[error("No audio was generated")]
    NoAudioGenerated,

    #[error("Failed to download video: {status} {message}")]
    DownloadFailed {
        /// HTTP status returned by the download request
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    #[error("Audio payload is not 16-bit PCM ({0} bytes)")]
    InvalidPcmLength(usize),

    #[error("Failed to encode WAV: {0}")]
    WavError(#[from] hound::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}
