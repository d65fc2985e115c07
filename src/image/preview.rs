use crate::models::UploadedImage;
use crate::Result;
use base64::Engine as _;

/// Reads the image and renders it as a `data:` URL for display.
pub async fn read_preview(image: &UploadedImage) -> Result<String> {
    let bytes = image.read_bytes().await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);

    tracing::debug!("Built preview for {} ({} bytes)", image.name, bytes.len());

    Ok(format!("data:{};base64,{}", image.format.as_mime(), encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{FileHandle, ImageFormat};
    use crate::Error;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_preview_is_data_url() {
        let image = UploadedImage {
            name: "x.gif".to_string(),
            format: ImageFormat::Gif,
            size: 3,
            handle: FileHandle::Memory(Arc::from(&b"GIF"[..])),
        };

        let url = read_preview(&image).await.unwrap();
        assert_eq!(url, "data:image/gif;base64,R0lG");
    }

    #[tokio::test]
    async fn test_preview_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let image = UploadedImage {
            name: "deleted.png".to_string(),
            format: ImageFormat::Png,
            size: 1,
            handle: FileHandle::Disk(dir.path().join("deleted.png")),
        };

        let err = read_preview(&image).await.unwrap_err();
        assert!(matches!(err, Error::Read(_)));
        assert_eq!(err.user_message(), "Failed to read the image file.");
    }
}
