//! Messages API request/response payloads.

use crate::image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Request body for the Messages endpoint.
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One content segment of a user message. Order is significant: the image
/// goes first, then the instruction text.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Image { source: ImageSource },
    Text { text: String },
}

/// Inline base64 image payload.
#[derive(Debug, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: ImageFormat,
    pub data: String,
}

/// Top-level Messages response. Only the content blocks are read.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBlock {
    pub text: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
}
