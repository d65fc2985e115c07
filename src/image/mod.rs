//! Upload handling: file handles, validation, and previews
//!
//! Validation trusts the MIME type declared for a file; no content sniffing is
//! done here.

pub mod mime;
pub mod preview;

pub use mime::{mime_for_path, ImageFormat};
pub use preview::read_preview;

use crate::error::ValidationError;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the bytes of an upload can be read from.
#[derive(Debug, Clone)]
pub enum FileHandle {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl FileHandle {
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileHandle::Disk(path) => tokio::fs::read(path).await,
            FileHandle::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// A file offered for upload, before validation.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub handle: FileHandle,
}

impl UploadCandidate {
    /// Describes a file on disk. The MIME type comes from `mime_override` or,
    /// failing that, the file extension.
    pub async fn from_path(path: &Path, mime_override: Option<&str>) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            tracing::error!("Failed to stat {}: {}", path.display(), e);
            Error::Read(format!("{}: {}", path.display(), e))
        })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            mime_type: mime_override
                .map(str::to_string)
                .unwrap_or_else(|| mime_for_path(path).to_string()),
            size: metadata.len(),
            handle: FileHandle::Disk(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            handle: FileHandle::Memory(Arc::from(bytes)),
        }
    }
}

/// Checks presence, declared type, and size, in that order.
///
/// `max_bytes` is inclusive: a file of exactly `max_bytes` is accepted.
pub fn validate(
    candidate: Option<&UploadCandidate>,
    max_bytes: u64,
) -> std::result::Result<ImageFormat, ValidationError> {
    let candidate = candidate.ok_or(ValidationError::MissingFile)?;

    let format = ImageFormat::from_mime(&candidate.mime_type).ok_or_else(|| {
        ValidationError::UnsupportedType {
            mime_type: candidate.mime_type.clone(),
        }
    })?;

    if candidate.size > max_bytes {
        return Err(ValidationError::TooLarge {
            size: candidate.size,
            limit_mb: max_bytes / (1024 * 1024),
        });
    }

    Ok(format)
}
