//! Personality narrative generation: prompt construction, the generative-text
//! API call, response parsing, and the once-per-input cache.

pub mod cache;
pub mod generator;
pub mod prompts;

pub use cache::NarrativeCache;
pub use generator::{Generator, NarrativeError};

/// Marker the model is instructed to open with when it supplies a one-line
/// summary before the narrative body.
pub const SUMMARY_MARKER: &str = "SUMMARY:";

/// Generated narrative, optionally prefixed by a one-line summary.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeResult {
    pub summary: Option<String>,
    pub body: String,
}

/// Split a recognized `SUMMARY:` first line off the response.
///
/// If the response begins with the marker followed by a line break, the rest
/// of that line becomes the summary and the line is stripped from the body.
/// Otherwise the summary is empty and the body is the whole response,
/// untouched.
pub fn parse_narrative(text: &str) -> NarrativeResult {
    if let Some(rest) = text.strip_prefix(SUMMARY_MARKER) {
        if let Some(newline) = rest.find('\n') {
            let summary = rest[..newline].trim();
            let body = rest[newline + 1..].trim_start_matches('\n').trim();
            return NarrativeResult {
                summary: (!summary.is_empty()).then(|| summary.to_string()),
                body: body.to_string(),
            };
        }
    }
    NarrativeResult {
        summary: None,
        body: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_summary_marker() {
        let result = parse_narrative("SUMMARY: certified sad listener\n\nDawg, hello are you good?");
        assert_eq!(result.summary.as_deref(), Some("certified sad listener"));
        assert_eq!(result.body, "Dawg, hello are you good?");
        assert!(!result.body.contains("SUMMARY"));
    }

    #[test]
    fn test_parse_without_marker() {
        let result = parse_narrative("Just a plain narrative body.");
        assert_eq!(result.summary, None);
        assert_eq!(result.body, "Just a plain narrative body.");
    }

    #[test]
    fn test_parse_without_marker_keeps_body_verbatim() {
        let text = "  Leading space and a trailing newline survive.\n";
        let result = parse_narrative(text);
        assert_eq!(result.summary, None);
        assert_eq!(result.body, text);
    }

    #[test]
    fn test_parse_marker_without_newline_is_body() {
        let result = parse_narrative("SUMMARY: no line break here");
        assert_eq!(result.summary, None);
        assert_eq!(result.body, "SUMMARY: no line break here");
    }

    #[test]
    fn test_parse_marker_mid_text_is_not_recognized() {
        let result = parse_narrative("Intro first.\nSUMMARY: too late\nmore");
        assert_eq!(result.summary, None);
        assert!(result.body.contains("SUMMARY: too late"));
    }

    #[test]
    fn test_parse_empty_summary_line() {
        let result = parse_narrative("SUMMARY:\nBody text.");
        assert_eq!(result.summary, None);
        assert_eq!(result.body, "Body text.");
    }

    #[test]
    fn test_parse_preserves_paragraph_break_in_body() {
        let result = parse_narrative("SUMMARY: two moods\nFirst paragraph.\n\nSecond paragraph.");
        assert_eq!(result.body, "First paragraph.\n\nSecond paragraph.");
    }
}
