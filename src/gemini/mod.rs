//! Gemini generation request dispatcher.
//!
//! A request is classified by model id into text, image, video or speech
//! generation. Media inputs are sent inline, uploaded through the Files API,
//! or passed by URI; long-running work is polled to completion, and binary
//! output is written to disk.

mod client;
mod dispatch;
mod error;
mod media;
mod mode;
mod output;
mod payload;
mod poll;
mod types;
mod wav;

pub use client::{GeminiClient, API_VERSION, DEFAULT_MODEL, GEMINI_API_BASE_URL, GEMINI_API_KEY_ENV};
pub use dispatch::{
    AspectRatio, DispatchSettings, Dispatcher, GenerationOptions, GenerationRequest,
    DEFAULT_DURATION_SECS, DEFAULT_VOICE, VIDEO_DURATIONS,
};
pub use error::GeminiError;
pub use media::{locate_media, mime_type_for, parse_youtube_url, MediaReference, MIME_TYPES};
pub use mode::{GenerationMode, IMAGE_MODELS, SPEECH_MODELS, VIDEO_MODELS};
pub use output::{
    render, save_image_parts, save_speech, save_video, text_output, ArtifactKind, ArtifactWriter,
    GeneratedArtifact, FILE_PREFIX,
};
pub use payload::{
    canonical_file_uri, exceeds_threshold, PayloadResolver, ResolvedPayload,
    DEFAULT_LARGE_FILE_THRESHOLD,
};
pub use poll::{
    poll_until, PollPolicy, FILE_POLL_DEADLINE, FILE_POLL_INTERVAL, VIDEO_POLL_DEADLINE,
    VIDEO_POLL_INTERVAL,
};
pub use types::{
    Blob, Candidate, Content, FileData, FileRecord, FileState, GenerateContentRequest,
    GenerateContentResponse, GenerateVideosRequest, GenerationConfig, Operation, Part, PartKind,
    Status,
};
pub use wav::{speech_spec, wrap_pcm};
