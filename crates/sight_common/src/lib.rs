//! Shared types for Sightline components.
//!
//! The daemon and the CLI agree on the wire shapes in `rpc`; the daemon's
//! orchestrator builds on `types`, `normalizer` and `sanitizer`.

pub mod error;
pub mod normalizer;
pub mod prompts;
pub mod rpc;
pub mod sanitizer;
pub mod types;

pub use error::{BackendError, BackendErrorKind, SightError};
pub use normalizer::normalize;
pub use rpc::{AnalyzeRequest, AnalyzeResponse, BackendsResponse, ErrorResponse, HealthResponse};
pub use sanitizer::sanitize;
pub use types::{
    AnalysisRequest, AttemptOutcome, AttemptRecord, AttemptRole, BackendCapability, BackendKind,
    BackendUsed, CanonicalResult,
};

/// Default address the daemon listens on
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// Default base URL the CLI talks to
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3001";

/// Version shared by all workspace crates
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
