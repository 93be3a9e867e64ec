//! Wire types for the daemon's HTTP API.
//!
//! Field names follow the browser page that first spoke this protocol
//! (`isInitialAnalysis`, `llavaDescription`, `searchResults`).

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/analyze`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Base64 JPEG still frame, optionally as a `data:` URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Base64 audio clip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_initial_analysis: Option<bool>,

    /// Description produced by an earlier initial analysis
    #[serde(
        default,
        alias = "priorDescription",
        skip_serializing_if = "Option::is_none"
    )]
    pub llava_description: Option<String>,
}

/// Successful analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub text: String,
}

/// Any failure of the analysis endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `GET /v1/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Body of `GET /v1/backends`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsResponse {
    pub network_reachable: bool,
    pub local_reachable: bool,
    pub remote_credential: bool,
    pub routing_policy: String,
    pub offline_image_policy: String,
    pub local: LocalBackendInfo,
    pub remote: RemoteBackendInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalBackendInfo {
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBackendInfo {
    pub model: String,
}
