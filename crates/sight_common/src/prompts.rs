//! Prompt templates shared by the normalizer and the adapters.

/// Used by the vision model when the caller sent an image without a prompt
pub const DEFAULT_DESCRIBE_PROMPT: &str =
    "Describe in detail what you see in the image. Be objective and concise.";

/// Used by the text model when the caller sent only media
pub const DEFAULT_ANALYZE_PROMPT: &str = "Analyze the provided media.";

/// Stand-in for audio on backends without an audio modality
pub const AUDIO_PLACEHOLDER: &str = "Audio: [audio data].";

/// Prompt the CLI sends for a first look at a captured frame
pub const INITIAL_ANALYSIS_PROMPT: &str = "Analyze the image and concisely say what you see. \
Then ask the user what they would like to know about what was identified.";

/// Rewrite a question so the model answers from web search results
pub fn search_synthesis(search_results: &str, question: &str) -> String {
    format!(
        "Based on the following web search results: \"{}\". \
Answer the user's original question: \"{}\". \
Synthesize the information clearly and directly.",
        search_results, question
    )
}

/// Prepend the description from an earlier image analysis
pub fn with_image_context(description: &str, question: &str) -> String {
    format!("Image context: {}. Question: {}", description, question)
}

/// Degrade audio into a textual marker after the prompt
pub fn with_audio_placeholder(prompt: &str) -> String {
    if prompt.is_empty() {
        AUDIO_PLACEHOLDER.to_string()
    } else {
        format!("{} {}", prompt, AUDIO_PLACEHOLDER)
    }
}
