//! Command-line interface definitions and helpers.
//!
//! Flags win over the config file, which wins over built-in defaults.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::gemini::{
    AspectRatio, DispatchSettings, GenerationOptions, GenerationRequest, PollPolicy,
    DEFAULT_DURATION_SECS, DEFAULT_MODEL, DEFAULT_VOICE, GEMINI_API_BASE_URL, VIDEO_DURATIONS,
    VIDEO_POLL_INTERVAL,
};

/// Parse and validate a video aspect ratio (16:9 or 9:16)
pub fn parse_aspect_ratio(s: &str) -> Result<AspectRatio, String> {
    s.parse()
}

/// Parse and validate a video duration (4, 6 or 8 seconds)
pub fn parse_duration(s: &str) -> Result<u32, String> {
    let secs: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid duration", s))?;
    validate_duration(secs)
}

fn validate_duration(secs: u32) -> Result<u32, String> {
    if !VIDEO_DURATIONS.contains(&secs) {
        return Err(format!(
            "Video duration must be 4, 6, or 8 seconds, got {}",
            secs
        ));
    }
    Ok(secs)
}

/// gemini: generate text, images, video, and speech with Gemini models
#[derive(Parser, Debug)]
#[command(name = "gemini")]
#[command(version, about = "Generate text, images, video, and speech with Gemini models")]
#[command(long_about = "Send a prompt, optionally with a local file or YouTube URL, to a \
    Gemini model. Text answers are printed; generated images, videos, and speech \
    are saved to disk and their paths printed.")]
#[command(after_help = "EXAMPLES:
    # Ask a question
    gemini \"What is 1+1?\"

    # Summarize a local video or a YouTube link
    gemini --file talk.mp4 \"Summarize this talk\"
    gemini --file https://youtu.be/dQw4w9WgXcQ \"Describe this video\"

    # Generate an image
    gemini --model gemini-3-pro-image-preview \"a lighthouse at dusk\"

    # Generate a portrait video from a starting frame
    gemini --model veo-3.1-generate-preview --file frame.png --aspect-ratio 9:16 \"waves\"

    # Speak a sentence
    gemini --model gemini-2.5-flash-preview-tts --voice Puck \"Good morning!\"

ENVIRONMENT:
    GEMINI_API_KEY    Required. Your Gemini API key.
    RUST_LOG          Log level for diagnostics on stderr (e.g. debug).")]
pub struct Args {
    /// The prompt; multiple words are joined with spaces
    pub prompt: Vec<String>,

    /// Model to use (default: gemini-3-flash-preview)
    #[arg(long, short)]
    pub model: Option<String>,

    /// Local file path or YouTube URL; for video models, a starting-frame image
    #[arg(long, short)]
    pub file: Option<String>,

    /// Video aspect ratio: 16:9 or 9:16 (video only)
    #[arg(long, value_parser = parse_aspect_ratio)]
    pub aspect_ratio: Option<AspectRatio>,

    /// Video duration in seconds: 4, 6, or 8 (video only)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<u32>,

    /// Prebuilt voice name (speech only, default: Kore)
    #[arg(long)]
    pub voice: Option<String>,

    /// Directory to write generated files to (default: current directory)
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Fully resolved settings for one run.
#[derive(Debug)]
pub struct Invocation {
    pub request: GenerationRequest,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub settings: DispatchSettings,
}

impl Args {
    /// Prompt tokens joined with single spaces.
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }

    /// Merge flags with the config file and built-in defaults.
    pub fn into_invocation(self, config: &Config) -> Result<Invocation, String> {
        let defaults = &config.defaults;

        let aspect_ratio = match (self.aspect_ratio, defaults.aspect_ratio.as_deref()) {
            (Some(ratio), _) => ratio,
            (None, Some(raw)) => raw
                .parse()
                .map_err(|e| format!("Invalid aspect_ratio in config: {}", e))?,
            (None, None) => AspectRatio::default(),
        };

        let duration_secs = match (self.duration, defaults.duration) {
            (Some(secs), _) => secs,
            (None, Some(secs)) => {
                validate_duration(secs).map_err(|e| format!("Invalid duration in config: {}", e))?
            }
            (None, None) => DEFAULT_DURATION_SECS,
        };

        let options = GenerationOptions {
            aspect_ratio,
            duration_secs,
            voice: self
                .voice
                .clone()
                .or_else(|| defaults.voice.clone())
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
        };

        let model = self
            .model
            .clone()
            .or_else(|| defaults.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let mut request = GenerationRequest::new(self.prompt_text())
            .with_model(model)
            .with_options(options);
        if let Some(file) = self.file {
            request = request.with_file(file);
        }

        let mut settings = DispatchSettings::default();
        if let Some(threshold) = config.large_file_threshold_bytes() {
            settings.large_file_threshold = threshold;
        }
        if let Some(secs) = config.api.video_timeout_secs {
            settings.video_poll = PollPolicy::new(VIDEO_POLL_INTERVAL, Duration::from_secs(secs));
        }

        Ok(Invocation {
            request,
            output_dir: self
                .output_dir
                .or_else(|| config.output.dir.clone())
                .unwrap_or_default(),
            base_url: config
                .api
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_API_BASE_URL.to_string()),
            settings,
        })
    }
}
