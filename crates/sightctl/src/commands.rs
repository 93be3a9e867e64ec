//! Command implementations for sightctl

use anyhow::{Context, Result};
use base64::Engine;
use owo_colors::OwoColorize;
use sight_common::prompts::INITIAL_ANALYSIS_PROMPT;
use sight_common::{AnalyzeRequest, BackendsResponse};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::client::SightClient;
use crate::session::{Session, SessionStore};

/// Options for a follow-up question
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    pub image: Option<PathBuf>,
    pub audio: Option<PathBuf>,
    /// Web search results to answer from
    pub search: Option<String>,
    /// Ignore the stored session
    pub fresh: bool,
}

// ============================================================================
// Request building
// ============================================================================

/// Read a file and base64-encode it for the wire
pub fn encode_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// First look at a frame
pub fn initial_request(image: &Path, prompt: Option<String>) -> Result<AnalyzeRequest> {
    Ok(AnalyzeRequest {
        prompt: Some(prompt.unwrap_or_else(|| INITIAL_ANALYSIS_PROMPT.to_string())),
        image: Some(encode_file(image)?),
        is_initial_analysis: Some(true),
        ..Default::default()
    })
}

/// Question about the last analyzed frame, or a standalone one with `fresh`
pub fn follow_up_request(opts: &AskOptions, session: Option<&Session>) -> Result<AnalyzeRequest> {
    let session = if opts.fresh { None } else { session };

    let image_path = opts.image.clone().or_else(|| {
        session
            .map(|s| s.image_path.clone())
            .filter(|p| p.exists())
    });

    let image = image_path.as_deref().map(encode_file).transpose()?;
    let audio = opts.audio.as_deref().map(encode_file).transpose()?;

    Ok(AnalyzeRequest {
        prompt: Some(opts.question.clone()),
        image,
        audio,
        search_results: opts.search.clone(),
        is_initial_analysis: Some(false),
        llava_description: session.map(|s| s.description.clone()),
    })
}

// ============================================================================
// Commands
// ============================================================================

pub async fn analyze(
    client: &SightClient,
    store: &SessionStore,
    image: &Path,
    prompt: Option<String>,
) -> Result<()> {
    let request = initial_request(image, prompt)?;
    let description = client.analyze(&request).await?;

    println!("{}", description);

    let image_path = fs::canonicalize(image).unwrap_or_else(|_| image.to_path_buf());
    store.save(&Session::new(image_path, description))?;
    debug!("Session saved to {}", store.path().display());
    Ok(())
}

pub async fn ask(client: &SightClient, store: &SessionStore, opts: AskOptions) -> Result<()> {
    let session = if opts.fresh { None } else { store.load()? };
    if session.is_none() && !opts.fresh {
        println!(
            "{}",
            "[NOTE] No previous image analysis, asking without context".yellow()
        );
    }

    let request = follow_up_request(&opts, session.as_ref())?;
    let answer = client.analyze(&request).await?;
    println!("{}", answer);
    Ok(())
}

pub async fn status(client: &SightClient) -> Result<()> {
    let health = client.health().await?;
    println!(
        "sightd {} at {} (up {}s)",
        health.version,
        client.base_url().cyan(),
        health.uptime_seconds
    );
    println!();
    print_backends(&client.backends().await?);
    Ok(())
}

pub fn reset(store: &SessionStore) -> Result<()> {
    if store.clear()? {
        println!("Session cleared ({})", store.path().display());
    } else {
        println!("No session to clear");
    }
    Ok(())
}

fn print_backends(b: &BackendsResponse) {
    println!("[ROUTING]  {} (offline images: {})", b.routing_policy, b.offline_image_policy);
    println!(
        "[NETWORK]  {}",
        flag(b.network_reachable, "online", "offline")
    );
    println!(
        "[LOCAL]    {}  {}  vision={} text={}",
        flag(b.local_reachable, "up", "down"),
        b.local.base_url,
        b.local.vision_model,
        b.local.text_model
    );
    println!(
        "[REMOTE]   {}  model={}",
        flag(b.remote_credential, "key set", "no key"),
        b.remote.model
    );
}

fn flag(ok: bool, yes: &str, no: &str) -> String {
    if ok {
        yes.bright_green().to_string()
    } else {
        no.bright_red().to_string()
    }
}
