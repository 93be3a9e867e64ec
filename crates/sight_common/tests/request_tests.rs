//! Normalizer and sanitizer properties over many request shapes.

use sight_common::{normalize, sanitize, AnalyzeRequest, SightError};

const IMAGE: &str = "aGVsbG8=";
const AUDIO: &str = "d29ybGQ=";

/// Every combination of the optional text fields, media absent
fn text_only_variants() -> Vec<AnalyzeRequest> {
    let mut out = Vec::new();
    for search in [None, Some("results")] {
        for desc in [None, Some("a red bicycle")] {
            for initial in [None, Some(true), Some(false)] {
                out.push(AnalyzeRequest {
                    prompt: None,
                    image: None,
                    audio: None,
                    search_results: search.map(str::to_string),
                    is_initial_analysis: initial,
                    llava_description: desc.map(str::to_string),
                });
            }
        }
    }
    out
}

#[test]
fn test_missing_media_always_rejected() {
    for raw in text_only_variants() {
        match normalize(&raw) {
            Err(SightError::Validation(_)) => {}
            other => panic!("expected validation error for {:?}, got {:?}", raw, other),
        }
    }
}

#[test]
fn test_any_single_input_is_enough() {
    let with_prompt = AnalyzeRequest {
        prompt: Some("hi".to_string()),
        ..Default::default()
    };
    let with_image = AnalyzeRequest {
        image: Some(IMAGE.to_string()),
        ..Default::default()
    };
    let with_audio = AnalyzeRequest {
        audio: Some(AUDIO.to_string()),
        ..Default::default()
    };
    assert!(normalize(&with_prompt).is_ok());
    assert!(normalize(&with_image).is_ok());
    assert!(normalize(&with_audio).is_ok());
}

#[test]
fn test_follow_up_description_is_verbatim_for_every_shape() {
    let description = "a red bicycle with a \"wicker\" basket";
    for image in [None, Some(IMAGE)] {
        for audio in [None, Some(AUDIO)] {
            for search in [None, Some("search hits")] {
                let raw = AnalyzeRequest {
                    prompt: Some("What color is it?".to_string()),
                    image: image.map(str::to_string),
                    audio: audio.map(str::to_string),
                    search_results: search.map(str::to_string),
                    is_initial_analysis: Some(false),
                    llava_description: Some(description.to_string()),
                };
                let req = normalize(&raw).unwrap();
                assert!(
                    req.effective_prompt().contains(description),
                    "description missing from {:?}",
                    req.effective_prompt()
                );
                assert!(req.effective_prompt().contains("What color is it?"));
            }
        }
    }
}

#[test]
fn test_sanitized_model_reply_has_no_markdown() {
    let reply = "### The object\n\nIt is **red**.\n\n- __Bicycle__\n- *Basket*";
    let clean = sanitize(reply);
    for marker in ['#', '*', '_', '\n'] {
        assert!(!clean.contains(marker), "{:?} left in {:?}", marker, clean);
    }
    assert!(!clean.contains("  "));
    assert_eq!(clean, "The object It is red . - Bicycle - Basket");
}
