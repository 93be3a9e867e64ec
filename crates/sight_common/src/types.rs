//! Core data model for backend routing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BackendError;

// ============================================================================
// Backends
// ============================================================================

/// The two inference backends the orchestrator can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// On-device model service (Ollama)
    Local,
    /// Cloud generative model service (Gemini)
    Remote,
}

impl BackendKind {
    /// The alternate backend, used for the single fallback hop
    pub fn other(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Whether an attempt was the first choice or the fallback hop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptRole {
    Primary,
    Fallback,
}

impl fmt::Display for AttemptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Which backend produced a result, and in which role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendUsed {
    LocalPrimary,
    LocalFallback,
    RemotePrimary,
    RemoteFallback,
}

impl BackendUsed {
    pub fn new(backend: BackendKind, role: AttemptRole) -> Self {
        match (backend, role) {
            (BackendKind::Local, AttemptRole::Primary) => Self::LocalPrimary,
            (BackendKind::Local, AttemptRole::Fallback) => Self::LocalFallback,
            (BackendKind::Remote, AttemptRole::Primary) => Self::RemotePrimary,
            (BackendKind::Remote, AttemptRole::Fallback) => Self::RemoteFallback,
        }
    }

    pub fn backend(self) -> BackendKind {
        match self {
            Self::LocalPrimary | Self::LocalFallback => BackendKind::Local,
            Self::RemotePrimary | Self::RemoteFallback => BackendKind::Remote,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::LocalFallback | Self::RemoteFallback)
    }
}

impl fmt::Display for BackendUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.is_fallback() {
            AttemptRole::Fallback
        } else {
            AttemptRole::Primary
        };
        write!(f, "{} ({})", self.backend(), role)
    }
}

/// What a backend can do for one specific request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum BackendCapability {
    Local { available: bool, model: String },
    Remote { available: bool, model: String },
}

impl BackendCapability {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Local { .. } => BackendKind::Local,
            Self::Remote { .. } => BackendKind::Remote,
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::Local { available, .. } | Self::Remote { available, .. } => *available,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Local { model, .. } | Self::Remote { model, .. } => model,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Canonical request, built once by the normalizer and never mutated.
///
/// `effective_prompt` already carries any search-synthesis rewrite and the
/// prior image description, so every adapter sees the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    prompt_text: Option<String>,
    image: Option<Vec<u8>>,
    audio: Option<Vec<u8>>,
    prior_description: Option<String>,
    search_context: Option<String>,
    is_initial_analysis: bool,
    effective_prompt: String,
}

impl AnalysisRequest {
    pub(crate) fn new(
        prompt_text: Option<String>,
        image: Option<Vec<u8>>,
        audio: Option<Vec<u8>>,
        prior_description: Option<String>,
        search_context: Option<String>,
        is_initial_analysis: bool,
        effective_prompt: String,
    ) -> Self {
        Self {
            prompt_text,
            image,
            audio,
            prior_description,
            search_context,
            is_initial_analysis,
            effective_prompt,
        }
    }

    pub fn prompt_text(&self) -> Option<&str> {
        self.prompt_text.as_deref()
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn audio(&self) -> Option<&[u8]> {
        self.audio.as_deref()
    }

    pub fn prior_description(&self) -> Option<&str> {
        self.prior_description.as_deref()
    }

    pub fn search_context(&self) -> Option<&str> {
        self.search_context.as_deref()
    }

    pub fn is_initial_analysis(&self) -> bool {
        self.is_initial_analysis
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Prompt handed to every adapter
    pub fn effective_prompt(&self) -> &str {
        &self.effective_prompt
    }

    /// Initial analysis of a still frame needs the image-description model
    pub fn wants_vision_model(&self) -> bool {
        self.is_initial_analysis && self.has_image()
    }
}

// ============================================================================
// Results
// ============================================================================

/// Final text of a successful orchestration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalResult {
    text: String,
    backend_used: BackendUsed,
    model: String,
}

impl CanonicalResult {
    pub fn new(text: String, backend_used: BackendUsed, model: String) -> Self {
        Self {
            text,
            backend_used,
            model,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn backend_used(&self) -> BackendUsed {
        self.backend_used
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Outcome of one adapter call
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(BackendError),
}

/// One adapter call made while serving a request
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub backend: BackendKind,
    pub role: AttemptRole,
    pub model: String,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }
}
