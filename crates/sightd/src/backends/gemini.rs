//! Remote backend: Gemini `generateContent`.
//!
//! Text, image and audio go out as parts of a single user turn. The reply is
//! the concatenated text parts of the first candidate.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use sight_common::{AnalysisRequest, BackendError, BackendErrorKind, BackendKind};

use super::{request_error, truncate_body, InferenceBackend};
use crate::config::RemoteConfig;

const IMAGE_MIME: &str = "image/jpeg";
const AUDIO_MIME: &str = "audio/webm";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

/// Text or inline media; serialized without a tag
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ============================================================================
// Adapter
// ============================================================================

pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    pub fn new(config: &RemoteConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Translate the canonical request into a single-turn body
    pub fn build_request(&self, request: &AnalysisRequest) -> GenerateContentRequest {
        let engine = &base64::engine::general_purpose::STANDARD;
        let mut parts = Vec::new();

        if !request.effective_prompt().is_empty() {
            parts.push(Part::Text {
                text: request.effective_prompt().to_string(),
            });
        }
        if let Some(image) = request.image() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: IMAGE_MIME.to_string(),
                    data: engine.encode(image),
                },
            });
        }
        if let Some(audio) = request.audio() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: AUDIO_MIME.to_string(),
                    data: engine.encode(audio),
                },
            });
        }

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
        }
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| format!("{} {}", env.error.status, env.error.message))
        .unwrap_or_else(|_| truncate_body(body));

    let kind = match status.as_u16() {
        401 | 403 => BackendErrorKind::Auth,
        429 => BackendErrorKind::Quota,
        400 if detail.contains("API_KEY_INVALID") || detail.contains("API key not valid") => {
            BackendErrorKind::Auth
        }
        code => BackendErrorKind::Status(code),
    };

    BackendError::remote(
        kind,
        format!("HTTP {} from Gemini: {}", status, detail.trim()),
    )
}

fn extract_text(body: &str) -> Result<String, BackendError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        BackendError::remote(
            BackendErrorKind::Malformed,
            format!("Unexpected Gemini response: {}", e),
        )
    })?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!(" (blocked: {})", r))
            .unwrap_or_default();
        return Err(BackendError::remote(
            BackendErrorKind::Malformed,
            format!("Gemini returned no text{}", reason),
        ));
    }
    Ok(text)
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn model_for(&self, _request: &AnalysisRequest) -> String {
        self.model.clone()
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, BackendError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(BackendError::remote(
                BackendErrorKind::Auth,
                "no API key configured",
            ));
        };

        let body = self.build_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {} parts={}", url, body.contents[0].parts.len());

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error(BackendKind::Remote, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| request_error(BackendKind::Remote, e))?;

        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        extract_text(&text)
    }
}
