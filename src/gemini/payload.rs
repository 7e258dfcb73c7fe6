//! Turning a classified media input into request content.

use std::path::Path;

use base64::Engine;

use super::client::{GeminiClient, API_VERSION};
use super::error::GeminiError;
use super::media::MediaReference;
use super::poll::{poll_until, PollPolicy};
use super::types::{FileState, Part};

/// Files larger than this are uploaded instead of sent inline (20 MiB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 20 * 1024 * 1024;

/// How a media input travels to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPayload {
    /// File contents embedded in the request, base64-encoded.
    Inline { mime_type: String, data: String },
    /// A file previously uploaded through the Files API.
    Uploaded { uri: String, mime_type: String },
    /// A URI the backend fetches itself.
    DirectUri { uri: String },
}

impl ResolvedPayload {
    pub fn into_part(self) -> Part {
        match self {
            ResolvedPayload::Inline { mime_type, data } => Part::inline(mime_type, data),
            ResolvedPayload::Uploaded { uri, mime_type } => Part::file_uri(uri, Some(mime_type)),
            ResolvedPayload::DirectUri { uri } => Part::file_uri(uri, None),
        }
    }
}

/// Whether a file of `size` bytes goes through the upload path.
pub fn exceeds_threshold(size: u64, threshold: u64) -> bool {
    size > threshold
}

/// Rewrite an uploaded file URI into the form `generateContent` expects by
/// dropping the API version segment (`.../v1beta/files/x` → `.../files/x`).
pub fn canonical_file_uri(uri: &str) -> String {
    uri.replacen(&format!("/{}/", API_VERSION), "/", 1)
}

/// Read a local file and base64-encode it.
pub async fn read_base64(path: &Path) -> Result<String, GeminiError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Resolves media references, uploading large local files when needed.
pub struct PayloadResolver<'a> {
    client: &'a GeminiClient,
    threshold: u64,
    poll: PollPolicy,
}

impl<'a> PayloadResolver<'a> {
    pub fn new(client: &'a GeminiClient) -> Self {
        Self {
            client,
            threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            poll: PollPolicy::file_processing(),
        }
    }

    pub fn with_threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub async fn resolve(
        &self,
        media: Option<&MediaReference>,
    ) -> Result<Option<ResolvedPayload>, GeminiError> {
        let payload = match media {
            None => return Ok(None),
            Some(MediaReference::YouTube { uri }) => ResolvedPayload::DirectUri { uri: uri.clone() },
            Some(MediaReference::LocalFile { path, mime_type }) => {
                let size = tokio::fs::metadata(path).await?.len();
                if exceeds_threshold(size, self.threshold) {
                    log::info!(
                        "{} is {} bytes (over {}), using the Files API",
                        path.display(),
                        size,
                        self.threshold
                    );
                    self.upload(path, mime_type).await?
                } else {
                    ResolvedPayload::Inline {
                        mime_type: mime_type.to_string(),
                        data: read_base64(path).await?,
                    }
                }
            }
        };
        Ok(Some(payload))
    }

    async fn upload(&self, path: &Path, mime_type: &str) -> Result<ResolvedPayload, GeminiError> {
        let uploaded = self.client.upload_file(path, mime_type).await?;
        let name = uploaded.name.clone();

        let file = poll_until(
            "File processing",
            uploaded,
            self.poll,
            |file| !file.is_processing(),
            || self.client.get_file(&name),
        )
        .await?;

        if file.state == FileState::Failed {
            let reason = file
                .error
                .and_then(|status| status.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(GeminiError::UploadFailed(reason));
        }

        let uri = file
            .uri
            .ok_or_else(|| GeminiError::UploadFailed("No file URI in response".to_string()))?;

        Ok(ResolvedPayload::Uploaded {
            uri: canonical_file_uri(&uri),
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_threshold_is_strictly_greater() {
        assert!(!exceeds_threshold(99, 100));
        assert!(!exceeds_threshold(100, 100));
        assert!(exceeds_threshold(101, 100));
        assert_eq!(DEFAULT_LARGE_FILE_THRESHOLD, 20_971_520);
    }

    #[test]
    fn test_canonical_file_uri_strips_version() {
        assert_eq!(
            canonical_file_uri("https://generativelanguage.googleapis.com/v1beta/files/abc"),
            "https://generativelanguage.googleapis.com/files/abc"
        );
        assert_eq!(
            canonical_file_uri("https://generativelanguage.googleapis.com/files/abc"),
            "https://generativelanguage.googleapis.com/files/abc"
        );
    }

    #[test]
    fn test_into_part() {
        let part = ResolvedPayload::DirectUri {
            uri: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
        .into_part();
        let file_data = part.file_data.unwrap();
        assert_eq!(file_data.mime_type, None);

        let part = ResolvedPayload::Uploaded {
            uri: "https://x/files/a".to_string(),
            mime_type: "video/mp4".to_string(),
        }
        .into_part();
        assert_eq!(part.file_data.unwrap().mime_type.as_deref(), Some("video/mp4"));

        let part = ResolvedPayload::Inline {
            mime_type: "image/png".to_string(),
            data: "AAAA".to_string(),
        }
        .into_part();
        assert!(part.inline_data.is_some());
        assert!(part.file_data.is_none());
    }

    #[tokio::test]
    async fn test_resolve_none_and_youtube_without_network() {
        // Unroutable base URL: any network use would fail the test.
        let client =
            GeminiClient::with_base_url("k".to_string(), "http://127.0.0.1:9".to_string()).unwrap();
        let resolver = PayloadResolver::new(&client);

        assert_eq!(resolver.resolve(None).await.unwrap(), None);

        let youtube = MediaReference::YouTube {
            uri: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        };
        assert_eq!(
            resolver.resolve(Some(&youtube)).await.unwrap(),
            Some(ResolvedPayload::DirectUri {
                uri: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_small_file_is_inlined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp3");
        std::fs::write(&path, b"hello").unwrap();

        let client =
            GeminiClient::with_base_url("k".to_string(), "http://127.0.0.1:9".to_string()).unwrap();
        let resolver = PayloadResolver::new(&client).with_threshold(5);
        let media = MediaReference::LocalFile {
            path,
            mime_type: "audio/mp3",
        };

        assert_eq!(
            resolver.resolve(Some(&media)).await.unwrap(),
            Some(ResolvedPayload::Inline {
                mime_type: "audio/mp3".to_string(),
                data: "aGVsbG8=".to_string(),
            })
        );
    }
}
