//! Local backend: Ollama chat API.
//!
//! Initial analyses of a still frame go to the vision model; everything else
//! goes to the text model. Ollama has no audio input, so audio is replaced by
//! a textual marker in the prompt.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use sight_common::prompts::{
    with_audio_placeholder, DEFAULT_ANALYZE_PROMPT, DEFAULT_DESCRIBE_PROMPT,
};
use sight_common::{AnalysisRequest, BackendError, BackendErrorKind, BackendKind};

use super::{request_error, truncate_body, InferenceBackend};
use crate::config::LocalConfig;

/// Pick the vision or text model for a request
pub fn select_model<'a>(request: &AnalysisRequest, vision: &'a str, text: &'a str) -> &'a str {
    if request.wants_vision_model() {
        vision
    } else {
        text
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

// ============================================================================
// Adapter
// ============================================================================

pub struct OllamaBackend {
    http: reqwest::Client,
    base_url: String,
    vision_model: String,
    text_model: String,
}

impl OllamaBackend {
    pub fn new(config: &LocalConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.inference_timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            vision_model: config.vision_model.clone(),
            text_model: config.text_model.clone(),
        })
    }

    /// Translate the canonical request into an Ollama chat body
    pub fn build_chat_request(&self, request: &AnalysisRequest) -> ChatRequest {
        let vision = request.wants_vision_model();
        let mut content = request.effective_prompt().to_string();
        if content.is_empty() {
            content = if vision {
                DEFAULT_DESCRIBE_PROMPT.to_string()
            } else {
                DEFAULT_ANALYZE_PROMPT.to_string()
            };
        }
        if request.has_audio() {
            content = with_audio_placeholder(&content);
        }

        let images = request
            .image()
            .map(|bytes| vec![base64::engine::general_purpose::STANDARD.encode(bytes)])
            .unwrap_or_default();

        ChatRequest {
            model: self.model_for(request),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
                images,
            }],
            stream: false,
        }
    }
}

#[async_trait]
impl InferenceBackend for OllamaBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn model_for(&self, request: &AnalysisRequest) -> String {
        select_model(request, &self.vision_model, &self.text_model).to_string()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, BackendError> {
        let body = self.build_chat_request(request);
        let url = format!("{}/api/chat", self.base_url);
        debug!("POST {} model={}", url, body.model);

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(BackendKind::Local, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::local(
                BackendErrorKind::Status(status.as_u16()),
                format!("HTTP {} from Ollama: {}", status, truncate_body(&text)),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| request_error(BackendKind::Local, e))?;
        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            BackendError::local(
                BackendErrorKind::Malformed,
                format!("Unexpected Ollama response: {}", e),
            )
        })?;

        if parsed.message.content.trim().is_empty() {
            return Err(BackendError::local(
                BackendErrorKind::Malformed,
                "Ollama returned an empty reply",
            ));
        }
        Ok(parsed.message.content)
    }
}
