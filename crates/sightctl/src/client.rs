//! HTTP client for communicating with sightd.

use anyhow::{anyhow, Context, Result};
use sight_common::{AnalyzeRequest, AnalyzeResponse, BackendsResponse, ErrorResponse, HealthResponse};
use std::time::Duration;

/// Local inference can take minutes; the daemon enforces the real deadline
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Client for communicating with sightd
pub struct SightClient {
    http: reqwest::Client,
    base_url: String,
}

impl SightClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one analysis request and return the reply text
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<String> {
        let response = self
            .http
            .post(format!("{}/v1/analyze", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(anyhow!("{} ({})", message.trim(), status));
        }

        let reply: AnalyzeResponse = response
            .json()
            .await
            .context("Unexpected response from sightd")?;
        Ok(reply.text)
    }

    /// Live backend status
    pub async fn backends(&self) -> Result<BackendsResponse> {
        self.get_json("/v1/backends").await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/v1/health").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("sightd answered {} for {}", status, path));
        }
        response
            .json()
            .await
            .with_context(|| format!("Unexpected response from sightd for {}", path))
    }

    fn unreachable(&self, e: reqwest::Error) -> anyhow::Error {
        anyhow!(
            "Cannot reach sightd at {}: {}\n\n\
             Is the daemon running? Start it with:\n\
             sightd --config /etc/sight/config.toml",
            self.base_url,
            e
        )
    }
}
