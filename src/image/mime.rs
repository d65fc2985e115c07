use serde::Serialize;
use std::fmt;
use std::path::Path;

/// MIME type reported for files whose extension is not recognised.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Image formats accepted for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Gif,
        ImageFormat::Webp,
    ];

    /// Matches a declared MIME type against the allow-list. Parameters such
    /// as `; charset=...` are ignored.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    pub fn as_mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// Declared MIME type for a file on disk, derived from its extension only.
pub fn mime_for_path(path: &Path) -> &'static str {
    match ImageFormat::from_extension(path) {
        Some(format) => format.as_mime(),
        None => {
            tracing::warn!(
                "Unrecognized extension for {}, declaring {}",
                path.display(),
                UNKNOWN_MIME
            );
            UNKNOWN_MIME
        }
    }
}
