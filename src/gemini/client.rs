//! GeminiClient - handles communication with the Gemini REST API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use super::error::GeminiError;
use super::types::{
    FileRecord, GenerateContentRequest, GenerateContentResponse, GenerateVideosRequest,
    Operation, Status, UploadResponse,
};

/// The environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API version segment used in every endpoint path.
pub const API_VERSION: &str = "v1beta";

/// Default model for text generation.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Header carrying the API key on API calls.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default timeout for API calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for file uploads and video downloads, which can run to gigabytes.
const TRANSFER_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Google API error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

/// Client for communicating with the Gemini API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new GeminiClient by reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if `GEMINI_API_KEY` is unset or empty.
    pub fn new() -> Result<Self, GeminiError> {
        let api_key = std::env::var(GEMINI_API_KEY_ENV).map_err(|_| GeminiError::MissingApiKey)?;
        Self::with_api_key(api_key)
    }

    /// Create a new GeminiClient with an explicit API key.
    pub fn with_api_key(api_key: String) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, GEMINI_API_BASE_URL.to_string())
    }

    /// Create a new GeminiClient with a custom base URL.
    ///
    /// Useful for testing against a mock server or routing through a proxy.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_VERSION, resource)
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        let model = model.trim();
        let model = model.strip_prefix("models/").unwrap_or(model);
        self.api_url(&format!("models/{}:{}", model, method))
    }

    /// Upload a local file through the resumable Files API.
    ///
    /// Returns the file record as reported when the upload is finalized; the
    /// file may still be in the `PROCESSING` state.
    pub async fn upload_file(&self, path: &Path, mime_type: &str) -> Result<FileRecord, GeminiError> {
        let size = tokio::fs::metadata(path).await?.len();
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        log::info!("Uploading {} ({} bytes, {})", path.display(), size, mime_type);

        let start_url = format!("{}/upload/{}/files", self.base_url, API_VERSION);
        let response = self
            .http_client
            .post(&start_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let response = ensure_success(response, "Upload start").await?;

        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GeminiError::UploadFailed("No upload URL in response".to_string()))?;

        // Streamed from disk; large videos never sit in memory.
        let file = tokio::fs::File::open(path).await?;
        let response = self
            .http_client
            .post(&upload_url)
            .timeout(TRANSFER_TIMEOUT)
            .header(reqwest::header::CONTENT_LENGTH, size.to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(reqwest::Body::from(file))
            .send()
            .await?;
        let response = ensure_success(response, "Upload").await?;

        let uploaded: UploadResponse = response.json().await?;
        log::info!("Uploaded as {} (state: {:?})", uploaded.file.name, uploaded.file.state);
        Ok(uploaded.file)
    }

    /// Fetch the current record of an uploaded file, e.g. `files/abc123`.
    pub async fn get_file(&self, name: &str) -> Result<FileRecord, GeminiError> {
        let response = self
            .http_client
            .get(self.api_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = ensure_success(response, "File status check").await?;
        Ok(response.json().await?)
    }

    /// Single-shot content generation (text, image, and speech models).
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        log::info!("Calling {}:generateContent", model);
        let response = self
            .http_client
            .post(self.model_url(model, "generateContent"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response, "generateContent").await?;
        Ok(response.json().await?)
    }

    /// Start a video generation and return the long-running operation handle.
    pub async fn generate_videos(
        &self,
        model: &str,
        request: &GenerateVideosRequest,
    ) -> Result<Operation, GeminiError> {
        log::info!("Submitting video generation to {}", model);
        let response = self
            .http_client
            .post(self.model_url(model, "predictLongRunning"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response, "Video generation request").await?;
        let operation: Operation = response.json().await?;
        log::info!("Video generation submitted, operation: {}", operation.name);
        Ok(operation)
    }

    /// Fetch the current status of a long-running operation by name.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, GeminiError> {
        let response = self
            .http_client
            .get(self.api_url(name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = ensure_success(response, "Operation status check").await?;
        Ok(response.json().await?)
    }

    /// Whether `uri` is served by the same host and port as the API itself.
    pub fn is_backend_host(&self, uri: &str) -> bool {
        let (Ok(target), Ok(base)) = (reqwest::Url::parse(uri), reqwest::Url::parse(&self.base_url))
        else {
            return false;
        };
        target.host_str().is_some()
            && target.host_str() == base.host_str()
            && target.port_or_known_default() == base.port_or_known_default()
    }

    /// The URL to fetch a generated artifact from.
    ///
    /// Artifacts hosted by the API itself require the key as a `key` query
    /// parameter; third-party URIs are returned unchanged.
    pub fn download_url(&self, uri: &str) -> Result<reqwest::Url, GeminiError> {
        let mut url = reqwest::Url::parse(uri)
            .map_err(|e| GeminiError::ApiError(format!("Invalid download URI '{}': {}", uri, e)))?;
        if self.is_backend_host(uri) {
            url.query_pairs_mut().append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    /// Download a file from a URI to disk.
    ///
    /// Streams the body to `dest` without holding it in memory. A partially
    /// written file is removed if the transfer fails.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::DownloadFailed` on a non-success HTTP status,
    /// `GeminiError::HttpError` if the request fails, or `GeminiError::IoError`
    /// if writing to disk fails.
    pub async fn download_to(&self, uri: &str, dest: &Path) -> Result<PathBuf, GeminiError> {
        let url = self.download_url(uri)?;
        log::info!("Downloading {}", uri);

        // The URL may carry the key, so it is stripped from transport errors.
        let response = self
            .http_client
            .get(url)
            .timeout(TRANSFER_TIMEOUT)
            .send()
            .await
            .map_err(redact_url)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                body
            };
            return Err(GeminiError::DownloadFailed {
                status: status.as_u16(),
                message,
            });
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if let Err(e) = stream_to_file(response, dest).await {
            let _ = tokio::fs::remove_file(dest).await;
            return Err(e);
        }

        Ok(dest.to_path_buf())
    }
}

async fn stream_to_file(response: reqwest::Response, dest: &Path) -> Result<(), GeminiError> {
    use futures_util::StreamExt;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(redact_url)?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

fn redact_url(error: reqwest::Error) -> GeminiError {
    GeminiError::HttpError(error.without_url())
}

/// Pass successful responses through; turn anything else into `ApiError`
/// carrying the backend's own message.
async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, GeminiError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or(body);

    log::warn!("{} failed with status {}: {}", context, status, message);
    Err(GeminiError::ApiError(format!(
        "{} failed with status {}: {}",
        context, status, message
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_api_key_creates_client() {
        let client = GeminiClient::with_api_key("test-api-key".to_string()).unwrap();
        assert_eq!(client.api_key(), "test-api-key");
        assert_eq!(client.base_url(), GEMINI_API_BASE_URL);
    }

    #[test]
    fn test_with_api_key_empty_returns_error() {
        let result = GeminiClient::with_api_key("".to_string());
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
        let result = GeminiClient::with_api_key("   ".to_string());
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client =
            GeminiClient::with_base_url("k".to_string(), "http://localhost:8080/".to_string())
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_model_url() {
        let client = GeminiClient::with_api_key("k".to_string()).unwrap();
        assert_eq!(
            client.model_url("gemini-3-flash-preview", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(
            client.model_url("models/veo-3.1-generate-preview", "predictLongRunning"),
            "https://generativelanguage.googleapis.com/v1beta/models/veo-3.1-generate-preview:predictLongRunning"
        );
    }

    #[test]
    fn test_resource_url() {
        let client = GeminiClient::with_api_key("k".to_string()).unwrap();
        assert_eq!(
            client.api_url("files/abc123"),
            "https://generativelanguage.googleapis.com/v1beta/files/abc123"
        );
    }

    #[test]
    fn test_download_url_adds_key_for_backend_host() {
        let client = GeminiClient::with_api_key("secret".to_string()).unwrap();
        let url = client
            .download_url(
                "https://generativelanguage.googleapis.com/v1beta/files/abc:download?alt=media",
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/files/abc:download?alt=media&key=secret"
        );
    }

    #[test]
    fn test_download_url_leaves_third_party_untouched() {
        let client = GeminiClient::with_api_key("secret".to_string()).unwrap();
        let url = client
            .download_url("https://storage.example.com/video.mp4")
            .unwrap();
        assert_eq!(url.as_str(), "https://storage.example.com/video.mp4");
        assert!(!client.is_backend_host("https://storage.example.com/video.mp4"));
    }

    #[test]
    fn test_download_url_requires_same_port() {
        let client =
            GeminiClient::with_base_url("secret".to_string(), "http://localhost:8080".to_string())
                .unwrap();
        assert!(client.is_backend_host("http://localhost:8080/v1beta/files/a"));
        assert!(!client.is_backend_host("http://localhost:9090/v1beta/files/a"));

        let url = client.download_url("http://localhost:9090/video.mp4").unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_default_port_matches_explicit_port() {
        let client = GeminiClient::with_api_key("secret".to_string()).unwrap();
        assert!(client.is_backend_host("https://generativelanguage.googleapis.com:443/v1beta/files/a"));
        assert!(!client.is_backend_host("http://generativelanguage.googleapis.com/v1beta/files/a"));
    }

    #[test]
    fn test_download_url_rejects_garbage() {
        let client = GeminiClient::with_api_key("secret".to_string()).unwrap();
        assert!(matches!(
            client.download_url("not a url"),
            Err(GeminiError::ApiError(_))
        ));
    }

    #[test]
    fn test_default_model_constant() {
        assert_eq!(DEFAULT_MODEL, "gemini-3-flash-preview");
    }
}
