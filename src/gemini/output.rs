//! Turning backend responses into printed text and files on disk.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;

use super::client::GeminiClient;
use super::error::GeminiError;
use super::types::{GenerateContentResponse, Operation, PartKind};
use super::wav;

/// Prefix of every generated file name.
pub const FILE_PREFIX: &str = "gemini";

/// Kind of binary artifact written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Video,
    Audio,
}

impl ArtifactKind {
    /// Middle segment of the file name.
    pub fn file_label(self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Video => "video",
            ArtifactKind::Audio => "speech",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Video => "mp4",
            ArtifactKind::Audio => "wav",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            ArtifactKind::Image => "Image",
            ArtifactKind::Video => "Video",
            ArtifactKind::Audio => "Audio",
        }
    }
}

/// One piece of generation output, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedArtifact {
    Text(String),
    SavedFile { path: PathBuf, kind: ArtifactKind },
}

impl fmt::Display for GeneratedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedArtifact::Text(text) => f.write_str(text),
            GeneratedArtifact::SavedFile { path, kind } => {
                write!(f, "{} saved as: {}", kind.noun(), path.display())
            }
        }
    }
}

/// Render artifacts as the lines printed to stdout.
pub fn render(artifacts: &[GeneratedArtifact]) -> String {
    artifacts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes artifacts under timestamp-based names.
///
/// Stamps are milliseconds since the Unix epoch and strictly increase for the
/// lifetime of the writer: a second file in the same millisecond gets the next
/// millisecond instead of overwriting the first.
pub struct ArtifactWriter {
    dir: PathBuf,
    last_stamp: AtomicU64,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_stamp: AtomicU64::new(0),
        }
    }

    /// Write into the process's working directory using bare file names.
    pub fn in_current_dir() -> Self {
        Self::new(PathBuf::new())
    }

    fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    /// Reserve a fresh path for an artifact of the given kind.
    pub fn next_path(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}.{}",
            FILE_PREFIX,
            kind.file_label(),
            self.next_stamp(),
            kind.extension()
        ))
    }

    /// Create the output directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), GeminiError> {
        if !self.dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&self.dir).await?;
        }
        Ok(())
    }

    pub async fn write(&self, kind: ArtifactKind, bytes: &[u8]) -> Result<PathBuf, GeminiError> {
        self.ensure_dir().await?;
        let path = self.next_path(kind);
        tokio::fs::write(&path, bytes).await?;
        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>, GeminiError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(data)?)
}

/// Text-mode output. A response without text yields an empty string.
pub fn text_output(response: &GenerateContentResponse) -> GeneratedArtifact {
    GeneratedArtifact::Text(response.text().unwrap_or_default())
}

/// Image-mode output: text parts pass through and every inline part is saved as a PNG.
pub async fn save_image_parts(
    writer: &ArtifactWriter,
    response: &GenerateContentResponse,
) -> Result<Vec<GeneratedArtifact>, GeminiError> {
    let mut artifacts = Vec::new();
    for part in response.parts() {
        match part.kind() {
            Some(PartKind::Text(text)) if !text.is_empty() => {
                artifacts.push(GeneratedArtifact::Text(text.to_string()));
            }
            Some(PartKind::InlineData { data, .. }) => {
                let bytes = decode_base64(data)?;
                let path = writer.write(ArtifactKind::Image, &bytes).await?;
                artifacts.push(GeneratedArtifact::SavedFile {
                    path,
                    kind: ArtifactKind::Image,
                });
            }
            _ => {}
        }
    }
    Ok(artifacts)
}

/// Speech-mode output: the first audio part, wrapped in a WAV container.
pub async fn save_speech(
    writer: &ArtifactWriter,
    response: &GenerateContentResponse,
) -> Result<GeneratedArtifact, GeminiError> {
    let data = response
        .parts()
        .iter()
        .find_map(|part| match part.kind() {
            Some(PartKind::InlineData { mime_type, data }) if mime_type.starts_with("audio/") => {
                Some(data)
            }
            _ => None,
        })
        .ok_or(GeminiError::NoAudioGenerated)?;

    let pcm = decode_base64(data)?;
    let path = writer.write(ArtifactKind::Audio, &wav::wrap_pcm(&pcm)?).await?;
    Ok(GeneratedArtifact::SavedFile {
        path,
        kind: ArtifactKind::Audio,
    })
}

/// Video-mode output: download the first generated video of a finished operation.
pub async fn save_video(
    client: &GeminiClient,
    writer: &ArtifactWriter,
    operation: &Operation,
) -> Result<GeneratedArtifact, GeminiError> {
    if let Some(error) = &operation.error {
        let message = error
            .message
            .clone()
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(GeminiError::OperationFailed(message));
    }

    let video = operation
        .generated_videos()
        .first()
        .ok_or(GeminiError::NoVideoGenerated)?;
    let uri = video
        .video
        .as_ref()
        .and_then(|v| v.uri.as_deref())
        .ok_or(GeminiError::NoVideoUri)?;

    writer.ensure_dir().await?;
    let dest = writer.next_path(ArtifactKind::Video);
    let path = client.download_to(uri, &dest).await?;
    Ok(GeneratedArtifact::SavedFile {
        path,
        kind: ArtifactKind::Video,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::types::{Candidate, Content, Part};
    use std::path::Path;
    use tempfile::TempDir;

    fn response_with(parts: Vec<Part>) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
            }],
        }
    }

    #[test]
    fn test_saved_file_display() {
        let artifact = GeneratedArtifact::SavedFile {
            path: PathBuf::from("gemini-image-1.png"),
            kind: ArtifactKind::Image,
        };
        assert_eq!(artifact.to_string(), "Image saved as: gemini-image-1.png");
    }

    #[test]
    fn test_render_joins_lines() {
        let artifacts = vec![
            GeneratedArtifact::Text("Here you go".to_string()),
            GeneratedArtifact::SavedFile {
                path: PathBuf::from("gemini-image-1.png"),
                kind: ArtifactKind::Image,
            },
        ];
        assert_eq!(render(&artifacts), "Here you go\nImage saved as: gemini-image-1.png");
    }

    #[test]
    fn test_stamps_strictly_increase() {
        let writer = ArtifactWriter::in_current_dir();
        let paths: Vec<PathBuf> = (0..50).map(|_| writer.next_path(ArtifactKind::Image)).collect();
        let mut unique = paths.clone();
        unique.dedup();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn test_file_names() {
        let writer = ArtifactWriter::new("out");
        let path = writer.next_path(ArtifactKind::Audio);
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(path.starts_with("out"));
        assert!(name.starts_with("gemini-speech-"));
        assert!(name.ends_with(".wav"));

        let bare = ArtifactWriter::in_current_dir().next_path(ArtifactKind::Video);
        assert_eq!(bare.parent(), Some(Path::new("")));
        assert!(bare.to_string_lossy().starts_with("gemini-video-"));
    }

    #[test]
    fn test_text_output_defaults_to_empty() {
        let response = GenerateContentResponse::default();
        assert_eq!(text_output(&response), GeneratedArtifact::Text(String::new()));
    }

    #[tokio::test]
    async fn test_image_parts_keep_order() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let response = response_with(vec![
            Part::text("before"),
            Part::inline("image/png", "iVBORw0KGgo="),
            Part::text("after"),
        ]);

        let artifacts = save_image_parts(&writer, &response).await.unwrap();
        assert_eq!(artifacts.len(), 3);
        assert_eq!(artifacts[0], GeneratedArtifact::Text("before".to_string()));
        assert_eq!(artifacts[2], GeneratedArtifact::Text("after".to_string()));
        match &artifacts[1] {
            GeneratedArtifact::SavedFile { path, kind } => {
                assert_eq!(*kind, ArtifactKind::Image);
                assert_eq!(std::fs::read(path).unwrap(), b"\x89PNG\r\n\x1a\n");
            }
            other => panic!("Expected saved file, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_two_images_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let response = response_with(vec![
            Part::inline("image/png", "AAAA"),
            Part::inline("image/png", "BBBB"),
        ]);

        let artifacts = save_image_parts(&writer, &response).await.unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_base64_is_an_error() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let response = response_with(vec![Part::inline("image/png", "not base64!!")]);

        let result = save_image_parts(&writer, &response).await;
        assert!(matches!(result, Err(GeminiError::InvalidBase64(_))));
    }

    #[tokio::test]
    async fn test_speech_is_wrapped_in_wav() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        // 4 bytes of PCM
        let response = response_with(vec![
            Part::text("ignored"),
            Part::inline("audio/L16;codec=pcm;rate=24000", "AQIDBA=="),
        ]);

        let artifact = save_speech(&writer, &response).await.unwrap();
        let GeneratedArtifact::SavedFile { path, kind } = artifact else {
            panic!("Expected saved file");
        };
        assert_eq!(kind, ArtifactKind::Audio);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 4);
        assert_eq!(&bytes[44..], &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_speech_without_audio_part() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let response = response_with(vec![
            Part::text("I cannot speak"),
            Part::inline("image/png", "AAAA"),
        ]);

        let result = save_speech(&writer, &response).await;
        assert!(matches!(result, Err(GeminiError::NoAudioGenerated)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_video_operation_error_and_empty_list() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let client = GeminiClient::with_api_key("k".to_string()).unwrap();

        let failed: Operation = serde_json::from_str(
            r#"{"name": "op", "done": true, "error": {"code": 3, "message": "blocked"}}"#,
        )
        .unwrap();
        let result = save_video(&client, &writer, &failed).await;
        assert!(matches!(result, Err(GeminiError::OperationFailed(msg)) if msg == "blocked"));

        let empty: Operation = serde_json::from_str(
            r#"{"name": "op", "done": true, "response": {"generateVideoResponse": {}}}"#,
        )
        .unwrap();
        let result = save_video(&client, &writer, &empty).await;
        assert!(matches!(result, Err(GeminiError::NoVideoGenerated)));

        let no_uri: Operation = serde_json::from_str(
            r#"{"name": "op", "done": true, "response": {"generatedVideos": [{"video": {}}]}}"#,
        )
        .unwrap();
        let result = save_video(&client, &writer, &no_uri).await;
        assert!(matches!(result, Err(GeminiError::NoVideoUri)));
    }
}
