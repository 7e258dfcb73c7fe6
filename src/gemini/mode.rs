//! Model id → generation mode.
//!
//! Matching is deliberately loose: besides the known model ids, any id that
//! contains `veo`, `-tts` or `-image` is routed to the corresponding mode so
//! new model variants work without a release. An unrelated id that happens to
//! contain one of those fragments will be misrouted; that is accepted.

use std::fmt;

pub const VIDEO_MODELS: &[&str] = &[
    "veo-3.1-generate-preview",
    "veo-3.1-fast-generate-preview",
    "veo-3.0-generate-001",
    "veo-2.0-generate-001",
];

pub const SPEECH_MODELS: &[&str] = &["gemini-2.5-flash-preview-tts", "gemini-2.5-pro-preview-tts"];

pub const IMAGE_MODELS: &[&str] = &["gemini-3-pro-image-preview", "gemini-2.5-flash-image"];

/// What kind of output a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Text,
    Image,
    Video,
    Speech,
}

impl GenerationMode {
    /// Classify a model id. Video wins over speech, speech over image; text is the default.
    pub fn classify(model: &str) -> Self {
        if matches_family(model, VIDEO_MODELS, "veo") {
            GenerationMode::Video
        } else if matches_family(model, SPEECH_MODELS, "-tts") {
            GenerationMode::Speech
        } else if matches_family(model, IMAGE_MODELS, "-image") {
            GenerationMode::Image
        } else {
            GenerationMode::Text
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationMode::Text => "text",
            GenerationMode::Image => "image",
            GenerationMode::Video => "video",
            GenerationMode::Speech => "speech",
        };
        f.write_str(name)
    }
}

fn matches_family(model: &str, known: &[&str], fragment: &str) -> bool {
    known.iter().any(|m| model.contains(m)) || model.contains(fragment)
}
