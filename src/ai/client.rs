use super::types::{
    ContentPart, ErrorResponse, ImageSource, Message, MessagesRequest, MessagesResponse,
};
use super::{ConversionMode, ConversionService};
use crate::models::{Config, ConversionRequest, UploadedImage};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

pub const API_VERSION: &str = "2023-06-01";

const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Live conversion client for the Messages API.
pub struct MessagesClient {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    api_url: String,
    max_retries: usize,
    retry_base_delay: Duration,
}

impl MessagesClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let defaults = Config::default();

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens: defaults.max_tokens,
            api_url: defaults.api_url,
            max_retries: defaults.max_retries,
            retry_base_delay: defaults.retry_base_delay,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY not set".to_string()))?;

        Ok(
            Self::new(api_key, config.model.clone(), config.request_timeout)?
                .with_api_url(config.api_url.clone())
                .with_max_tokens(config.max_tokens)
                .with_retries(config.max_retries, config.retry_base_delay),
        )
    }

    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enables bounded exponential backoff for transient failures. Delays run
    /// `base, 2*base, 4*base, ...` capped at ten seconds.
    pub fn with_retries(mut self, max_retries: usize, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    fn build_request(&self, request: &ConversionRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: request.media_type,
                            data: request.data.clone(),
                        },
                    },
                    ContentPart::Text {
                        text: request.prompt.clone(),
                    },
                ],
            }],
        }
    }

    async fn send_once(&self, body: &MessagesRequest) -> Result<String> {
        tracing::debug!("Sending conversion request to {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to inference API: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Inference API error (status {}): {}", status, error_text);
            return Err(error_for_status(status, &error_text));
        }

        let body = response.text().await?;
        parse_response(&body)
    }

    pub async fn send(&self, request: &ConversionRequest) -> Result<String> {
        let body = self.build_request(request);

        if self.max_retries == 0 {
            return self.send_once(&body).await;
        }

        let factor = (self.retry_base_delay.as_millis() as u64 / 2).max(1);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(MAX_RETRY_DELAY)
            .take(self.max_retries);

        RetryIf::spawn(
            strategy,
            || self.send_once(&body),
            |e: &Error| {
                let transient = e.is_transient();
                if transient {
                    tracing::warn!("Conversion attempt failed: {}. Will retry...", e);
                }
                transient
            },
        )
        .await
    }
}

/// Maps a non-success status and its body onto the error taxonomy.
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error.message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

    match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized(detail),
        StatusCode::FORBIDDEN => Error::Forbidden(detail),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(detail),
        other => Error::Api {
            status: other.as_u16(),
            detail,
        },
    }
}

fn parse_response(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body).map_err(|e| {
        tracing::error!("Failed to parse inference response: {}\nBody: {}", e, body);
        Error::InvalidResponse(format!("Failed to parse response: {}", e))
    })?;

    response
        .content
        .first()
        .and_then(|block| block.text.as_deref())
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            tracing::error!("Inference response has no text in its first content block");
            Error::InvalidResponse("No text in first content block".to_string())
        })
}

#[async_trait]
impl ConversionService for MessagesClient {
    fn mode(&self) -> ConversionMode {
        ConversionMode::Live
    }

    async fn convert(&self, image: &UploadedImage, instructions: &str) -> Result<String> {
        let request = ConversionRequest::from_image(image, instructions).await?;
        tracing::info!(
            "Converting {} ({}, {} bytes) with model {}",
            image.name,
            image.format,
            image.size,
            self.model
        );
        self.send(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{FileHandle, ImageFormat};
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_image() -> UploadedImage {
        UploadedImage {
            name: "eq.png".to_string(),
            format: ImageFormat::Png,
            size: 3,
            handle: FileHandle::Memory(Arc::from(&b"abc"[..])),
        }
    }

    fn test_client(server: &MockServer) -> MessagesClient {
        MessagesClient::new(
            "test-key".to_string(),
            "test-model".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_api_url(format!("{}/v1/messages", server.uri()))
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }]
        }))
    }

    #[tokio::test]
    async fn test_convert_sends_multimodal_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(header("content-type", "application/json"))
            .respond_with(text_response("  \\frac{a}{b}\n"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).with_max_tokens(1234);
        let latex = client
            .convert(&test_image(), "use display style")
            .await
            .unwrap();
        assert_eq!(latex, "\\frac{a}{b}");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 1234);
        assert_eq!(body["messages"][0]["role"], "user");

        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], "YWJj");
        assert_eq!(content[1]["type"], "text");
        assert!(content[1]["text"]
            .as_str()
            .unwrap()
            .contains("use display style"));
    }

    #[tokio::test]
    async fn test_status_codes_map_to_specific_errors() {
        for (status, expected) in [
            (401, "Invalid API key"),
            (403, "Access forbidden"),
            (429, "Rate limit exceeded"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                    "type": "error",
                    "error": { "type": "some_error", "message": "nope" }
                })))
                .mount(&server)
                .await;

            let err = test_client(&server)
                .convert(&test_image(), "")
                .await
                .unwrap_err();
            assert!(
                err.user_message().starts_with(expected),
                "status {} gave '{}'",
                status,
                err.user_message()
            );
        }
    }

    #[tokio::test]
    async fn test_other_status_uses_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            })))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .convert(&test_image(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 529, .. }));
        assert_eq!(err.user_message(), "API request failed (529): Overloaded");
    }

    #[tokio::test]
    async fn test_other_status_falls_back_to_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad things"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .convert(&test_image(), "")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "API request failed (400): bad things");
    }

    #[test]
    fn test_empty_error_body_uses_reason_phrase() {
        let err = error_for_status(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.user_message(), "API request failed (502): Bad Gateway");
    }

    #[tokio::test]
    async fn test_missing_text_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })),
            )
            .mount(&server)
            .await;

        let err = test_client(&server)
            .convert(&test_image(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(err.user_message(), "Invalid response from the API.");
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = test_client(&server)
            .convert(&test_image(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = MessagesClient::new(
            "key".to_string(),
            "model".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_api_url("http://127.0.0.1:1/v1/messages".to_string());

        let err = client.convert(&test_image(), "").await.unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        assert_eq!(
            err.user_message(),
            "Network error. Please check your connection and try again."
        );
    }

    #[tokio::test]
    async fn test_rate_limit_is_final_without_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server)
            .convert(&test_image(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(text_response("x^2"))
            .mount(&server)
            .await;

        let client = test_client(&server).with_retries(2, Duration::from_millis(2));
        let latex = client.convert(&test_image(), "").await.unwrap();
        assert_eq!(latex, "x^2");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_credential_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server).with_retries(3, Duration::from_millis(2));
        let err = client.convert(&test_image(), "").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        assert!(MessagesClient::from_config(&Config::default()).is_err());
    }
}
