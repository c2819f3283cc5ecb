use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, ChatRequest};
use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-pro";

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

impl GeminiRequest {
    fn from_chat(request: &ChatRequest) -> Self {
        let mut contents: Vec<GeminiContent> = request
            .history
            .iter()
            .map(|turn| GeminiContent {
                role: turn.role.as_str().to_string(),
                parts: vec![GeminiPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: request.message.clone(),
            }],
        });

        Self {
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ResponseError>,
}

/// Collects the text of a `streamGenerateContent?alt=sse` response.
///
/// Bytes may arrive split anywhere, including inside a UTF-8 sequence, so
/// only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseTextCollector {
    buffer: Vec<u8>,
    text: String,
    block_reason: Option<String>,
}

impl SseTextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ApiError> {
        self.buffer.extend_from_slice(bytes);

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            self.handle_line(&line)?;
        }
        Ok(())
    }

    /// Flush any trailing line and return the aggregated reply
    pub fn finish(mut self) -> Result<String, ApiError> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.handle_line(&line)?;
        }

        if !self.text.is_empty() {
            return Ok(self.text);
        }
        match self.block_reason {
            Some(reason) => Err(ApiError::Blocked(reason)),
            None => Err(ApiError::EmptyResponse),
        }
    }

    fn handle_line(&mut self, raw: &[u8]) -> Result<(), ApiError> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| ApiError::Malformed(format!("invalid UTF-8 in stream: {}", e)))?
            .trim();

        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim_start();
        if data.is_empty() {
            return Ok(());
        }

        let chunk: GeminiStreamChunk = serde_json::from_str(data)
            .map_err(|e| ApiError::Malformed(format!("{}: {}", e, data)))?;

        if let Some(error) = chunk.error {
            return Err(ApiError::Status {
                status: error.code.unwrap_or(500),
                body: error.message,
            });
        }

        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            self.block_reason = Some(reason);
        }

        for candidate in chunk.candidates {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            for part in parts {
                if let Some(text) = part.text {
                    self.text.push_str(&text);
                }
            }
        }
        Ok(())
    }
}

/// Client for the Gemini `generativelanguage` API.
///
/// Holds one pooled HTTP client; clone it freely.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let body = GeminiRequest::from_chat(request);

        tracing::debug!(
            model = %self.model,
            history = request.history.len(),
            max_output_tokens = request.max_output_tokens,
            "Sending Gemini request"
        );

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body: text });
        }

        let mut collector = SseTextCollector::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            collector.feed(&chunk?)?;
        }
        collector.finish()
    }
}
