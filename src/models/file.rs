use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::UploadError;
use crate::utils::validation::mime_from_file_name;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A caller-supplied file to upload.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub content: Bytes,
}

impl LocalFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            mime_type: mime_type.into(),
            content,
        }
    }

    /// Reads a file from disk. The MIME type comes from the extension, then
    /// from the content's magic bytes.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UploadError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' has no file name", path.display()),
                ))
            })?
            .to_string();

        let content = tokio::fs::read(path).await?;
        let mime_type = mime_from_file_name(&name)
            .map(str::to_string)
            .or_else(|| infer::get(&content).map(|t| t.mime_type().to_string()))
            .unwrap_or_else(|| FALLBACK_MIME.to_string());

        tracing::debug!("Loaded {} ({} bytes, {})", name, content.len(), mime_type);
        Ok(Self::new(name, mime_type, content))
    }

    pub fn descriptor(&self) -> FileDescriptor {
        FileDescriptor {
            name: self.name.clone(),
            size: self.size,
            file_type: self.mime_type.clone(),
        }
    }
}

/// What the coordinator is told about each file when slots are requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
}
