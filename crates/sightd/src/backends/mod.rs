//! Inference backend adapters.
//!
//! Each adapter turns the canonical `AnalysisRequest` into its service's wire
//! shape and pulls plain text back out. Adapters only report failures; the
//! orchestrator decides what happens next.

pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use sight_common::{
    AnalysisRequest, BackendCapability, BackendError, BackendErrorKind, BackendKind,
};
use std::collections::VecDeque;
use std::sync::Mutex;

pub use gemini::GeminiBackend;
pub use ollama::OllamaBackend;

// ============================================================================
// Backend Trait
// ============================================================================

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Model identifier this backend would use for `request`
    fn model_for(&self, request: &AnalysisRequest) -> String;

    /// Static precondition, e.g. a credential is present
    fn is_configured(&self) -> bool {
        true
    }

    /// Run one inference and return the raw reply text
    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, BackendError>;

    /// Availability and model for this request given a probe result
    fn capability(&self, request: &AnalysisRequest, reachable: bool) -> BackendCapability {
        let available = reachable && self.is_configured();
        let model = self.model_for(request);
        match self.kind() {
            BackendKind::Local => BackendCapability::Local { available, model },
            BackendKind::Remote => BackendCapability::Remote { available, model },
        }
    }
}

/// Map a reqwest send or body failure onto the backend error taxonomy
pub(crate) fn request_error(backend: BackendKind, e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::new(backend, BackendErrorKind::Timeout, e.to_string())
    } else if e.is_decode() {
        BackendError::new(backend, BackendErrorKind::Malformed, e.to_string())
    } else {
        BackendError::new(backend, BackendErrorKind::Transport, e.to_string())
    }
}

/// Keep error bodies short enough for a log line
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    let body = body.trim();
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        let head: String = body.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

// ============================================================================
// Fake Backend (Testing)
// ============================================================================

/// What a fake backend saw on one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    pub model: String,
    pub prompt: String,
    pub has_image: bool,
    pub has_audio: bool,
}

/// Scripted backend for orchestration tests.
///
/// Replies are consumed in order; the last one repeats once the queue is
/// down to a single entry.
pub struct FakeBackend {
    kind: BackendKind,
    configured: bool,
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeBackend {
    pub fn new(kind: BackendKind, replies: Vec<Result<String, BackendError>>) -> Self {
        Self {
            kind,
            configured: true,
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`
    pub fn replying(kind: BackendKind, text: &str) -> Self {
        Self::new(kind, vec![Ok(text.to_string())])
    }

    /// Always fails with `error`
    pub fn failing(kind: BackendKind, error: BackendError) -> Self {
        Self::new(kind, vec![Err(error)])
    }

    /// Mark the backend as lacking its credential
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model_for(&self, request: &AnalysisRequest) -> String {
        match self.kind {
            BackendKind::Local => ollama::select_model(request, "llava", "gemma:2b").to_string(),
            BackendKind::Remote => "gemini-1.5-flash-latest".to_string(),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(FakeCall {
            model: self.model_for(request),
            prompt: request.effective_prompt().to_string(),
            has_image: request.has_image(),
            has_audio: request.has_audio(),
        });

        let mut replies = self.replies.lock().unwrap();
        match replies.len() {
            0 => Err(BackendError::new(
                self.kind,
                BackendErrorKind::Malformed,
                "fake backend has no scripted reply",
            )),
            1 => replies[0].clone(),
            _ => replies.pop_front().expect("queue length checked"),
        }
    }
}
