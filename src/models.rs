//! Data models and structures
//!
//! Defines the upload and request types that flow through a conversion, the
//! Messages API payload built from them, and the startup configuration.

use crate::image::{FileHandle, ImageFormat};
use crate::{prompts, Error, Result};
use std::time::Duration;

/// An image that passed validation and is the active upload of a session.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub name: String,
    pub format: ImageFormat,
    pub size: u64,
    pub handle: FileHandle,
}

impl UploadedImage {
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        self.handle.read().await.map_err(|e| {
            tracing::error!("Failed to read {}: {}", self.name, e);
            Error::Read(format!("{}: {}", self.name, e))
        })
    }
}

/// Payload of one live conversion attempt.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub media_type: ImageFormat,
    pub data: String,
    pub prompt: String,
}

impl ConversionRequest {
    /// Reads and encodes the image afresh; the preview encoding is not reused.
    pub async fn from_image(image: &UploadedImage, instructions: &str) -> Result<Self> {
        let bytes = image.read_bytes().await?;

        use base64::Engine as _;
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);

        tracing::debug!(
            "Encoded {} ({} bytes -> {} base64 chars)",
            image.name,
            bytes.len(),
            data.len()
        );

        Ok(Self {
            media_type: image.format,
            data,
            prompt: prompts::conversion_prompt(instructions),
        })
    }
}

// Configuration
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_UPLOAD_SIZE_MB: u64 = 25;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` selects demo mode.
    pub api_key: Option<String>,
    pub max_upload_size_mb: u64,
    pub model: String,
    pub max_tokens: u32,
    pub api_url: String,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub retry_base_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            max_upload_size_mb: DEFAULT_MAX_UPLOAD_SIZE_MB,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source, applying defaults
    /// for anything missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("ANTHROPIC_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let max_upload_size_mb =
            parse_var(&lookup, "MAX_UPLOAD_SIZE_MB", defaults.max_upload_size_mb)?;
        if max_upload_size_mb == 0 {
            return Err(Error::Config(
                "MAX_UPLOAD_SIZE_MB must be greater than zero".to_string(),
            ));
        }
        if max_upload_size_mb.checked_mul(BYTES_PER_MB).is_none() {
            return Err(Error::Config(format!(
                "MAX_UPLOAD_SIZE_MB is too large: {}",
                max_upload_size_mb
            )));
        }

        let timeout_secs = parse_var(
            &lookup,
            "IMAGE_TO_LATEX_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(Error::Config(
                "IMAGE_TO_LATEX_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let retry_delay_ms = parse_var(
            &lookup,
            "IMAGE_TO_LATEX_RETRY_DELAY_MS",
            defaults.retry_base_delay.as_millis() as u64,
        )?;

        Ok(Self {
            api_key,
            max_upload_size_mb,
            model: lookup("IMAGE_TO_LATEX_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_var(&lookup, "IMAGE_TO_LATEX_MAX_TOKENS", defaults.max_tokens)?,
            api_url: lookup("IMAGE_TO_LATEX_API_URL").unwrap_or(defaults.api_url),
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: parse_var(&lookup, "IMAGE_TO_LATEX_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay: Duration::from_millis(retry_delay_ms),
        })
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn is_demo(&self) -> bool {
        self.api_key.is_none()
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        _ => Ok(default),
    }
}
