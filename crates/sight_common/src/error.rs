//! Error types for Sightline.

use std::fmt;
use thiserror::Error;

use crate::types::BackendKind;

/// Terminal failures visible to the caller
#[derive(Error, Debug, Clone)]
pub enum SightError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Image analysis is not available offline. Connect to the internet or send only text or audio.")]
    OfflineImageUnavailable,

    #[error("No AI backend available. Check the local model service, or your internet connection and API key.")]
    NoBackendAvailable,

    #[error("All backends failed: {}", join_attempts(.attempts))]
    AllBackendsFailed { attempts: Vec<BackendError> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SightError {
    /// HTTP status the daemon answers with
    pub fn status_code(&self) -> u16 {
        match self {
            SightError::Validation(_) => 400,
            SightError::OfflineImageUnavailable => 400,
            SightError::NoBackendAvailable => 500,
            SightError::AllBackendsFailed { .. } => 500,
            SightError::Internal(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

fn join_attempts(attempts: &[BackendError]) -> String {
    attempts
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single adapter call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection refused, DNS failure, reset
    Transport,
    /// Request exceeded the client timeout
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// Missing or rejected credential
    Auth,
    /// Quota or rate limit
    Quota,
    /// Response body did not have the expected shape
    Malformed,
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Timeout => write!(f, "timeout"),
            Self::Status(code) => write!(f, "status {}", code),
            Self::Auth => write!(f, "auth"),
            Self::Quota => write!(f, "quota"),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

/// Failure of one backend adapter; recoverable through the fallback hop
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{backend} backend failed ({kind}): {message}")]
pub struct BackendError {
    pub backend: BackendKind,
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(backend: BackendKind, kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            backend,
            kind,
            message: message.into(),
        }
    }

    pub fn local(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self::new(BackendKind::Local, kind, message)
    }

    pub fn remote(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self::new(BackendKind::Remote, kind, message)
    }
}
