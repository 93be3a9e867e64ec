//! Request normalizer.
//!
//! Turns the raw wire request into the canonical `AnalysisRequest`. All prompt
//! rewriting happens here, once, so the local and remote adapters (and the
//! fallback attempt) see identical context.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use crate::error::SightError;
use crate::prompts;
use crate::rpc::AnalyzeRequest;
use crate::types::AnalysisRequest;

/// Build the canonical request, rejecting requests with no prompt and no media
pub fn normalize(raw: &AnalyzeRequest) -> Result<AnalysisRequest, SightError> {
    let prompt_text = non_empty(raw.prompt.as_deref());
    let image = decode_media("image", raw.image.as_deref())?;
    let audio = decode_media("audio", raw.audio.as_deref())?;
    let search_context = non_empty(raw.search_results.as_deref());
    let prior_description = non_empty(raw.llava_description.as_deref());
    let is_initial_analysis = raw.is_initial_analysis.unwrap_or(false);

    if prompt_text.is_none() && image.is_none() && audio.is_none() {
        return Err(SightError::Validation(
            "no media sent: provide a prompt, an image or an audio clip".to_string(),
        ));
    }

    let mut effective_prompt = prompt_text.clone().unwrap_or_default();

    if let Some(search) = &search_context {
        debug!("Search results received ({} chars), rewriting prompt", search.len());
        effective_prompt = prompts::search_synthesis(search, &effective_prompt);
    }

    if let Some(description) = &prior_description {
        if !is_initial_analysis {
            debug!("Carrying prior image description into follow-up");
            effective_prompt = prompts::with_image_context(description, &effective_prompt);
        }
    }

    Ok(AnalysisRequest::new(
        prompt_text,
        image,
        audio,
        prior_description,
        search_context,
        is_initial_analysis,
        effective_prompt,
    ))
}

/// Blank strings count as absent
fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn decode_media(field: &str, value: Option<&str>) -> Result<Option<Vec<u8>>, SightError> {
    let Some(encoded) = non_empty(value) else {
        return Ok(None);
    };

    // Accept `data:image/jpeg;base64,...` as produced by canvas.toDataURL
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded.as_str(),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| SightError::Validation(format!("{} is not valid base64: {}", field, e)))?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(bytes))
}
