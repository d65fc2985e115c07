use super::{ConversionMode, ConversionService};
use crate::models::UploadedImage;
use crate::{prompts, Result};
use async_trait::async_trait;
use std::time::Duration;

pub const DEMO_DELAY: Duration = Duration::from_millis(2000);

/// Stand-in for the live client when no credential is configured. Waits a
/// fixed delay and returns the bundled sample without touching the network.
pub struct DemoClient {
    delay: Duration,
}

impl DemoClient {
    pub fn new() -> Self {
        Self { delay: DEMO_DELAY }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for DemoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionService for DemoClient {
    fn mode(&self) -> ConversionMode {
        ConversionMode::Demo
    }

    async fn convert(&self, image: &UploadedImage, _instructions: &str) -> Result<String> {
        tracing::info!(
            "Demo mode: returning sample output for {} after {:?}",
            image.name,
            self.delay
        );
        tokio::time::sleep(self.delay).await;
        Ok(prompts::DEMO_OUTPUT.trim().to_string())
    }
}
