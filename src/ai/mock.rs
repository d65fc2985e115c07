use super::client::error_for_status;
use super::{ConversionMode, ConversionService};
use crate::models::UploadedImage;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockReply {
    Latex(String),
    Status(u16, String),
    ReadFailure,
}

/// Scripted [`ConversionService`] for tests. Replies cycle in the order they
/// were added; with none configured it echoes the image name.
#[derive(Clone)]
pub struct MockConversionClient {
    replies: Arc<Mutex<Vec<MockReply>>>,
    call_count: Arc<Mutex<usize>>,
    instructions_seen: Arc<Mutex<Vec<String>>>,
    delay: Duration,
}

impl MockConversionClient {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            instructions_seen: Arc::new(Mutex::new(Vec::new())),
            delay: Duration::ZERO,
        }
    }

    pub fn with_latex_response(self, latex: String) -> Self {
        self.replies.lock().unwrap().push(MockReply::Latex(latex));
        self
    }

    /// Replies as the live client would to an HTTP error status.
    pub fn with_status_response(self, status: u16, body: String) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Status(status, body));
        self
    }

    pub fn with_read_failure(self) -> Self {
        self.replies.lock().unwrap().push(MockReply::ReadFailure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_instructions_seen(&self) -> Vec<String> {
        self.instructions_seen.lock().unwrap().clone()
    }
}

impl Default for MockConversionClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversionService for MockConversionClient {
    fn mode(&self) -> ConversionMode {
        ConversionMode::Live
    }

    async fn convert(&self, image: &UploadedImage, instructions: &str) -> Result<String> {
        let reply = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            self.instructions_seen
                .lock()
                .unwrap()
                .push(instructions.to_string());

            let replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                None
            } else {
                Some(replies[(*count - 1) % replies.len()].clone())
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match reply {
            None => Ok(format!("\\text{{{}}}", image.name)),
            Some(MockReply::Latex(latex)) => Ok(latex),
            Some(MockReply::Status(status, body)) => {
                let status = StatusCode::from_u16(status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Err(error_for_status(status, &body))
            }
            Some(MockReply::ReadFailure) => Err(Error::Read(format!("{}: mock", image.name))),
        }
    }
}
