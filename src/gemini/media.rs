//! Classification of the `--file` argument.
//!
//! A file argument is either a YouTube link, passed to the backend as-is after
//! normalization, or a local file whose MIME type comes from its extension.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::error::GeminiError;

/// Supported local file extensions and their MIME types.
pub const MIME_TYPES: &[(&str, &str)] = &[
    // Video
    (".mp4", "video/mp4"),
    (".mov", "video/quicktime"),
    (".webm", "video/webm"),
    (".avi", "video/x-msvideo"),
    (".mkv", "video/x-matroska"),
    // Audio
    (".mp3", "audio/mp3"),
    (".wav", "audio/wav"),
    (".m4a", "audio/m4a"),
    (".ogg", "audio/ogg"),
    (".flac", "audio/flac"),
    // PDF
    (".pdf", "application/pdf"),
    // Images
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".webp", "image/webp"),
];

/// YouTube URL shapes; group 1 captures the 11-character video id.
const YOUTUBE_PATTERNS: &[&str] = &[
    r"youtube\.com/watch\?.*v=([a-zA-Z0-9_-]{11})",
    r"youtu\.be/([a-zA-Z0-9_-]{11})",
    r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
];

/// A classified media input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// An existing local file with a known MIME type.
    LocalFile { path: PathBuf, mime_type: &'static str },
    /// A YouTube video, normalized to the long-form watch URL.
    YouTube { uri: String },
}

/// Classify a raw file argument.
///
/// YouTube links are recognized first; anything else is treated as a local
/// path, which must exist and carry a supported extension.
pub fn locate_media(arg: Option<&str>) -> Result<Option<MediaReference>, GeminiError> {
    let Some(arg) = arg else {
        return Ok(None);
    };

    if let Some(uri) = parse_youtube_url(arg) {
        log::debug!("Treating {} as YouTube video {}", arg, uri);
        return Ok(Some(MediaReference::YouTube { uri }));
    }

    let path = existing_path(arg)?;
    let mime_type = mime_type_for(&path).ok_or_else(|| GeminiError::UnsupportedFileType {
        extension: extension_of(&path),
        supported: supported_extensions(),
    })?;

    Ok(Some(MediaReference::LocalFile { path, mime_type }))
}

/// Extract the video id from a YouTube URL and return the canonical watch URL.
///
/// Accepts `youtube.com/watch?...v=ID`, `youtu.be/ID` and `youtube.com/embed/ID`.
pub fn parse_youtube_url(url: &str) -> Option<String> {
    youtube_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| format!("https://www.youtube.com/watch?v={}", id.as_str()))
}

/// Look up the MIME type for a path from its (case-insensitive) extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let extension = extension_of(path);
    MIME_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

fn youtube_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        YOUTUBE_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Resolve `arg` against the working directory and require that it exists.
pub(crate) fn existing_path(arg: &str) -> Result<PathBuf, GeminiError> {
    let path = absolute_path(Path::new(arg))?;
    if !path.exists() {
        return Err(GeminiError::FileNotFound(path));
    }
    Ok(path)
}

fn absolute_path(path: &Path) -> Result<PathBuf, GeminiError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

fn supported_extensions() -> String {
    MIME_TYPES
        .iter()
        .map(|(ext, _)| *ext)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CANONICAL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[test]
    fn test_all_youtube_shapes_normalize_identically() {
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
        ];
        for url in urls {
            assert_eq!(parse_youtube_url(url).as_deref(), Some(CANONICAL), "{}", url);
        }
    }

    #[test]
    fn test_watch_url_with_other_params_first() {
        let url = "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42";
        assert_eq!(parse_youtube_url(url).as_deref(), Some(CANONICAL));
    }

    #[test]
    fn test_short_id_is_rejected() {
        assert_eq!(parse_youtube_url("https://youtu.be/abc"), None);
        assert_eq!(parse_youtube_url("https://www.youtube.com/watch?v=abc$defghij"), None);
    }

    #[test]
    fn test_patterns_compile() {
        assert_eq!(youtube_patterns().len(), YOUTUBE_PATTERNS.len());
    }

    #[test]
    fn test_non_youtube_url_is_not_matched() {
        assert_eq!(parse_youtube_url("https://vimeo.com/123456789"), None);
        assert_eq!(parse_youtube_url("clip.mp4"), None);
    }

    #[test]
    fn test_absent_argument() {
        assert_eq!(locate_media(None).unwrap(), None);
    }

    #[test]
    fn test_youtube_wins_over_local_path() {
        let media = locate_media(Some("https://youtu.be/dQw4w9WgXcQ")).unwrap();
        assert_eq!(
            media,
            Some(MediaReference::YouTube {
                uri: CANONICAL.to_string()
            })
        );
    }

    #[test]
    fn test_local_file_mime_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Photo.JPG");
        std::fs::write(&path, b"jpeg").unwrap();

        let media = locate_media(Some(path.to_str().unwrap())).unwrap().unwrap();
        assert_eq!(
            media,
            MediaReference::LocalFile {
                path: path.clone(),
                mime_type: "image/jpeg"
            }
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.mp4");
        let result = locate_media(Some(path.to_str().unwrap()));
        assert!(matches!(result, Err(GeminiError::FileNotFound(p)) if p == path));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, b"{}").unwrap();

        let result = locate_media(Some(path.to_str().unwrap()));
        match result {
            Err(GeminiError::UnsupportedFileType { extension, supported }) => {
                assert_eq!(extension, ".json");
                assert!(supported.contains(".mp4"));
                assert!(supported.contains(".webp"));
            }
            other => panic!("Expected UnsupportedFileType, got {:?}", other),
        }
    }

    #[test]
    fn test_mime_table_families() {
        assert_eq!(mime_type_for(Path::new("a.mov")), Some("video/quicktime"));
        assert_eq!(mime_type_for(Path::new("a.flac")), Some("audio/flac"));
        assert_eq!(mime_type_for(Path::new("a.pdf")), Some("application/pdf"));
        assert_eq!(mime_type_for(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_type_for(Path::new("Makefile")), None);
    }
}
