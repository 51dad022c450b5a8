//! Instruction text sent to the generation endpoint.
//!
//! Keeping the prompt here rather than inline in the synthesis stage means
//! the wording can change without touching request or decode logic, and
//! tests can assert on it directly.
//!
//! Callers can override the default via
//! [`crate::config::PipelineConfig::prompt_template`]; the template must
//! contain [`TEXT_PLACEHOLDER`]; every occurrence is replaced by the OCR text
//! verbatim.

/// Marker replaced by the extracted text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default flashcard instruction.
pub const DEFAULT_FLASHCARD_PROMPT: &str = "Create flashcards from the following text:\n{text}\n\nProvide the flashcards in JSON format as an array of objects with 'front' and 'back' fields.";

/// Build the synthesis prompt for `extracted_text`.
///
/// The text is inserted unmodified: no trimming, no escaping. JSON escaping
/// happens later when the request body is serialised.
pub fn flashcard_prompt(template: Option<&str>, extracted_text: &str) -> String {
    template
        .unwrap_or(DEFAULT_FLASHCARD_PROMPT)
        .replace(TEXT_PLACEHOLDER, extracted_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_embeds_text_verbatim() {
        let text = "Photosynthesis converts light to energy";
        let p = flashcard_prompt(None, text);
        assert!(p.starts_with("Create flashcards from the following text:\n"));
        assert!(p.contains(&format!("\n{text}\n")));
        assert!(p.ends_with("'front' and 'back' fields."));
    }

    #[test]
    fn every_placeholder_is_filled() {
        let p = flashcard_prompt(Some("Text: {text}\nAgain: {text}"), "ATP");
        assert_eq!(p, "Text: ATP\nAgain: ATP");
    }

    #[test]
    fn placeholder_inside_text_is_left_alone() {
        let p = flashcard_prompt(Some("A {text} B {text}"), "x{text}y");
        assert_eq!(p, "A x{text}y B x{text}y");
    }

    #[test]
    fn empty_text_still_builds() {
        let p = flashcard_prompt(None, "");
        assert!(p.contains("text:\n\n\nProvide"));
    }
}
