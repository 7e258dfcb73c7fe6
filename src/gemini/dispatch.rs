//! Top-level generation flow: classify, resolve, invoke, poll, demultiplex.

use std::fmt;
use std::str::FromStr;

use super::client::{GeminiClient, DEFAULT_MODEL};
use super::error::GeminiError;
use super::media::{existing_path, locate_media, mime_type_for, parse_youtube_url};
use super::mode::GenerationMode;
use super::output::{self, ArtifactWriter, GeneratedArtifact};
use super::payload::{self, PayloadResolver, DEFAULT_LARGE_FILE_THRESHOLD};
use super::poll::{poll_until, PollPolicy};
use super::types::{
    Content, GenerateContentRequest, GenerateVideosRequest, GenerationConfig, Part, StartFrame,
    VideoInstance, VideoParameters,
};

/// Default speech voice.
pub const DEFAULT_VOICE: &str = "Kore";

/// Default video length in seconds.
pub const DEFAULT_DURATION_SECS: u32 = 8;

/// Video lengths accepted by Veo.
pub const VIDEO_DURATIONS: &[u32] = &[4, 6, 8];

/// Video aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            other => Err(format!("Unsupported aspect ratio '{}'. Use 16:9 or 9:16", other)),
        }
    }
}

/// Mode-specific knobs. Only the ones relevant to the selected mode are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub aspect_ratio: AspectRatio,
    pub duration_secs: u32,
    pub voice: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            duration_secs: DEFAULT_DURATION_SECS,
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

/// Everything one invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    /// Raw `--file` argument: a local path or a YouTube URL.
    pub file: Option<String>,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            file: None,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> GenerationMode {
        GenerationMode::classify(&self.model)
    }
}

/// Tunables for the dispatcher's waiting and upload behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    pub large_file_threshold: u64,
    pub file_poll: PollPolicy,
    pub video_poll: PollPolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            file_poll: PollPolicy::file_processing(),
            video_poll: PollPolicy::video(),
        }
    }
}

/// Runs generation requests against one backend client.
pub struct Dispatcher {
    client: GeminiClient,
    writer: ArtifactWriter,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(client: GeminiClient, writer: ArtifactWriter) -> Self {
        Self {
            client,
            writer,
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Run one request to completion.
    ///
    /// Local input is validated before anything is sent, so a bad prompt or
    /// file fails without touching the network.
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<GeneratedArtifact>, GeminiError> {
        if request.prompt.trim().is_empty() {
            return Err(GeminiError::EmptyPrompt);
        }

        let mode = request.mode();
        log::info!("Model {} selected {} generation", request.model, mode);

        match mode {
            GenerationMode::Video => self.generate_video(request).await.map(|a| vec![a]),
            GenerationMode::Text | GenerationMode::Image | GenerationMode::Speech => {
                self.generate_content(request, mode).await
            }
        }
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
        mode: GenerationMode,
    ) -> Result<Vec<GeneratedArtifact>, GeminiError> {
        let media = locate_media(request.file.as_deref())?;
        let resolver = PayloadResolver::new(&self.client)
            .with_threshold(self.settings.large_file_threshold)
            .with_poll_policy(self.settings.file_poll);

        let mut parts = Vec::with_capacity(2);
        if let Some(payload) = resolver.resolve(media.as_ref()).await? {
            parts.push(payload.into_part());
        }
        parts.push(Part::text(request.prompt.as_str()));

        let generation_config = match mode {
            GenerationMode::Speech => Some(GenerationConfig::speech(&request.options.voice)),
            _ => None,
        };
        let body = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config,
        };

        let response = self.client.generate_content(&request.model, &body).await?;

        match mode {
            GenerationMode::Image => output::save_image_parts(&self.writer, &response).await,
            GenerationMode::Speech => Ok(vec![output::save_speech(&self.writer, &response).await?]),
            _ => Ok(vec![output::text_output(&response)]),
        }
    }

    async fn generate_video(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, GeminiError> {
        let image = self.start_frame(request.file.as_deref()).await?;

        let body = GenerateVideosRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
                image,
            }],
            parameters: VideoParameters {
                aspect_ratio: request.options.aspect_ratio.as_str().to_string(),
                duration_seconds: request.options.duration_secs,
            },
        };

        let operation = self.client.generate_videos(&request.model, &body).await?;
        let name = operation.name.clone();

        let operation = poll_until(
            "Video generation",
            operation,
            self.settings.video_poll,
            |op| op.done,
            || self.client.get_operation(&name),
        )
        .await?;

        output::save_video(&self.client, &self.writer, &operation).await
    }

    /// Veo takes its starting frame inline only, so large images are never uploaded.
    async fn start_frame(&self, file: Option<&str>) -> Result<Option<StartFrame>, GeminiError> {
        let Some(file) = file else {
            return Ok(None);
        };

        if let Some(uri) = parse_youtube_url(file) {
            return Err(GeminiError::NotAnImage(uri.into()));
        }

        let path = existing_path(file)?;
        match mime_type_for(&path) {
            Some(mime_type) if mime_type.starts_with("image/") => Ok(Some(StartFrame {
                bytes_base64_encoded: payload::read_base64(&path).await?,
                mime_type: mime_type.to_string(),
            })),
            _ => Err(GeminiError::NotAnImage(path)),
        }
    }
}
