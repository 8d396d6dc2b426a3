//! Object Reader
//!
//! Loads a local file into a [`SourceObject`].

use crate::domain::{invariant_input_size, MediaType, PublisherError, SourceObject};
use std::path::Path;
use tracing::debug;

/// Reads local files, enforcing the size ceiling before the payload is read.
#[derive(Clone, Copy, Debug)]
pub struct ObjectReader {
    max_file_size: u64,
}

impl ObjectReader {
    /// Create a reader with the given ceiling in bytes.
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Read `path` into a source object.
    pub async fn read(&self, path: &Path) -> Result<SourceObject, PublisherError> {
        let read_error = |cause: String| PublisherError::ReadError {
            path: path.to_path_buf(),
            cause,
        };

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| read_error(e.to_string()))?;
        if !metadata.is_file() {
            return Err(read_error("not a regular file".to_string()));
        }
        invariant_input_size(metadata.len(), self.max_file_size)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| read_error(e.to_string()))?;
        // The file may have changed since the metadata call.
        invariant_input_size(bytes.len() as u64, self.max_file_size)?;

        let identifier = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let content_type = guess_media_type(path);
        debug!(
            identifier = %identifier,
            bytes = bytes.len(),
            content_type = %content_type,
            "[strata] Read source file"
        );
        Ok(SourceObject::new(bytes, identifier, content_type))
    }
}

/// Media type from the file extension; octet-stream when unknown.
pub fn guess_media_type(path: &Path) -> MediaType {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let media_type = match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("txt") => "text/plain",
        Some("html") | Some("htm") => "text/html",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        _ => return MediaType::octet_stream(),
    };
    MediaType::new(media_type)
}
