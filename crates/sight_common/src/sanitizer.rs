//! Response sanitizer.
//!
//! Replies are read aloud by text-to-speech, so markdown markers are dropped
//! and the text is flattened to a single line.

use regex::Regex;
use std::sync::LazyLock;

/// Newlines, heading markers, emphasis markers, underscores
static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n|#+|\*+|_").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip formatting markup and collapse whitespace
pub fn sanitize(text: &str) -> String {
    let flattened = MARKUP.replace_all(text, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&flattened, " ");
    collapsed.trim().to_string()
}
