//! Copying conversion output to the clipboard
//!
//! A [`ClipboardChain`] tries the platform clipboard first and falls back to
//! a second mechanism when that fails.

pub mod mock;
pub mod system;
pub mod terminal;

pub use mock::MockClipboard;
pub use system::SystemClipboard;
pub use terminal::TerminalClipboard;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Clipboard: Send + Sync {
    fn name(&self) -> &'static str;
    async fn write_text(&self, text: &str) -> Result<()>;
}

pub struct ClipboardChain {
    primary: Box<dyn Clipboard>,
    fallback: Box<dyn Clipboard>,
}

impl ClipboardChain {
    pub fn new(primary: Box<dyn Clipboard>, fallback: Box<dyn Clipboard>) -> Self {
        Self { primary, fallback }
    }

    /// Platform clipboard, then the terminal escape sequence.
    pub fn platform() -> Self {
        Self::new(
            Box::new(SystemClipboard::new()),
            Box::new(TerminalClipboard::stderr()),
        )
    }

    /// Returns the name of the mechanism that succeeded, or `None` if both
    /// failed.
    pub async fn copy(&self, text: &str) -> Option<&'static str> {
        match self.primary.write_text(text).await {
            Ok(()) => return Some(self.primary.name()),
            Err(e) => tracing::warn!(
                "{} clipboard failed: {}. Trying {}",
                self.primary.name(),
                e,
                self.fallback.name()
            ),
        }

        match self.fallback.write_text(text).await {
            Ok(()) => Some(self.fallback.name()),
            Err(e) => {
                tracing::warn!("{} clipboard failed: {}", self.fallback.name(), e);
                None
            }
        }
    }
}
