//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror. Every
//! variant maps onto one [`ErrorKind`] and a short message suitable for
//! showing to the user as-is.

use thiserror::Error;

/// Rejection reasons produced by upload validation.
///
/// The `Display` output of each variant is the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select an image file.")]
    MissingFile,

    #[error("Unsupported file type. Please upload a PNG, JPEG, GIF, or WebP image.")]
    UnsupportedType { mime_type: String },

    #[error("File is too large. Maximum size is {limit_mb}MB.")]
    TooLarge { size: u64, limit_mb: u64 },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to read image: {0}")]
    Read(String),

    #[error("API rejected credential (status 401): {0}")]
    Unauthorized(String),

    #[error("API denied access (status 403): {0}")]
    Forbidden(String),

    #[error("API rate limit exceeded (status 429): {0}")]
    RateLimited(String),

    #[error("API error (status {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("A conversion is already in progress")]
    ConversionInProgress,

    #[error("Conversion was cancelled")]
    Cancelled,

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),
}

/// Coarse classification of an [`Error`], used by the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Read,
    Credential,
    RateLimit,
    Transport,
    Protocol,
    Request,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Read(_) => ErrorKind::Read,
            Error::Unauthorized(_) | Error::Forbidden(_) => ErrorKind::Credential,
            Error::RateLimited(_) => ErrorKind::RateLimit,
            Error::Http(_) => ErrorKind::Transport,
            Error::InvalidResponse(_) => ErrorKind::Protocol,
            Error::Api { .. } => ErrorKind::Request,
            Error::Io(_)
            | Error::Serialization(_)
            | Error::ConversionInProgress
            | Error::Cancelled
            | Error::Clipboard(_)
            | Error::Config(_)
            | Error::EnvVar(_) => ErrorKind::Internal,
        }
    }

    /// Message shown to the user in place of the technical `Display` output.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(e) => e.to_string(),
            Error::Read(_) => "Failed to read the image file.".to_string(),
            Error::Unauthorized(_) => {
                "Invalid API key. Please check your ANTHROPIC_API_KEY configuration.".to_string()
            }
            Error::Forbidden(_) => {
                "Access forbidden. Your API key may not have access to this model.".to_string()
            }
            Error::RateLimited(_) => {
                "Rate limit exceeded. Please wait a moment and try again.".to_string()
            }
            Error::Api { status, detail } => {
                format!("API request failed ({}): {}", status, detail)
            }
            Error::Http(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            Error::InvalidResponse(_) => "Invalid response from the API.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
