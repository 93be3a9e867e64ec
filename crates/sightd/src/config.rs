//! Configuration management for sightd.
//!
//! Loads settings from /etc/sight/config.toml or uses defaults.
//! The remote credential itself never lives in the file, only the name of the
//! environment variable that holds it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::orchestrator::{OfflineImagePolicy, RoutingPolicy};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/sight/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/sight/config.toml";

// ============================================================================
// Sections
// ============================================================================

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted request body (base64 frames are big)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_addr() -> String {
    sight_common::DEFAULT_BIND_ADDR.to_string()
}

fn default_max_body_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Local model service (Ollama)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default = "default_local_url")]
    pub base_url: String,

    /// Image-description model for initial analyses
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Lightweight text-following model for everything else
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Liveness probe timeout in milliseconds
    #[serde(default = "default_local_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Inference timeout in seconds; local inference is slow
    #[serde(default = "default_local_inference_timeout")]
    pub inference_timeout_secs: u64,
}

fn default_local_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_vision_model() -> String {
    "llava".to_string()
}

fn default_text_model() -> String {
    "gemma:2b".to_string()
}

fn default_local_probe_timeout() -> u64 {
    1_000
}

fn default_local_inference_timeout() -> u64 {
    180
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: default_local_url(),
            vision_model: default_vision_model(),
            text_model: default_text_model(),
            probe_timeout_ms: default_local_probe_timeout(),
            inference_timeout_secs: default_local_inference_timeout(),
        }
    }
}

/// Remote generative model service (Gemini)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub base_url: String,

    #[serde(default = "default_remote_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

fn default_remote_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_remote_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_remote_timeout() -> u64 {
    120
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_url(),
            model: default_remote_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl RemoteConfig {
    /// Read the credential from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Network reachability probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Well-known host resolved to decide whether the device is online
    #[serde(default = "default_dns_host")]
    pub dns_host: String,

    #[serde(default = "default_dns_port")]
    pub dns_port: u16,

    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_ms: u64,
}

fn default_dns_host() -> String {
    "google.com".to_string()
}

fn default_dns_port() -> u16 {
    443
}

fn default_dns_timeout() -> u64 {
    2_000
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            dns_host: default_dns_host(),
            dns_port: default_dns_port(),
            dns_timeout_ms: default_dns_timeout(),
        }
    }
}

/// Backend selection policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub policy: RoutingPolicy,

    #[serde(default)]
    pub offline_image: OfflineImagePolicy,
}

// ============================================================================
// Top-level config
// ============================================================================

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

impl Config {
    /// Load config from the standard locations, or defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save default config to path (for init)
    pub fn save_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}
