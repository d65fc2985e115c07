//! Inference service integration for image-to-LaTeX conversion
//!
//! Provides the live Messages API client and the demo fallback used when no
//! credential is configured, both behind [`ConversionService`].

pub mod client;
pub mod demo;
pub mod mock;
pub mod types;

pub use client::MessagesClient;
pub use demo::DemoClient;
pub use mock::MockConversionClient;

use crate::models::UploadedImage;
use crate::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    Live,
    Demo,
}

#[async_trait]
pub trait ConversionService: Send + Sync {
    fn mode(&self) -> ConversionMode;
    async fn convert(&self, image: &UploadedImage, instructions: &str) -> Result<String>;
}
