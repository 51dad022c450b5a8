//! Synthesis stage: turn extracted text into flashcard candidates.
//!
//! The prompt lives in [`crate::prompts`]; this module only builds the
//! request body and decodes the JSON array that comes back.

use crate::config::PipelineConfig;
use crate::error::RequestError;
use crate::pipeline::transport::{decode_json, HttpTransport, JsonRequest};
use crate::prompts::flashcard_prompt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// An unpersisted front/back pair produced by the generation endpoint.
///
/// Both fields are required: a card missing either one fails the whole
/// decode rather than becoming an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlashcardCandidate {
    pub front: String,
    pub back: String,
}

impl FlashcardCandidate {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

/// Ask the generation endpoint for flashcards built from `text`.
///
/// Returns the cards in the order the endpoint listed them; the list may be
/// empty.
pub async fn synthesize(
    transport: &dyn HttpTransport,
    config: &PipelineConfig,
    text: &str,
) -> Result<Vec<FlashcardCandidate>, RequestError> {
    let prompt = flashcard_prompt(config.prompt_template.as_deref(), text);
    let body = request_body(&prompt, config.max_tokens);

    let response = transport
        .post_json(JsonRequest {
            url: config.generation_endpoint.clone(),
            api_key: config.api_key.clone(),
            body,
        })
        .await?;

    let cards: Vec<FlashcardCandidate> = decode_json(&response, config.check_status)?;
    debug!("Synthesis returned {} cards", cards.len());
    Ok(cards)
}

/// `{"prompt": "...", "max_tokens": N}`
fn request_body(prompt: &str, max_tokens: usize) -> serde_json::Value {
    json!({ "prompt": prompt, "max_tokens": max_tokens })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        assert_eq!(
            request_body("make cards", 1000),
            json!({ "prompt": "make cards", "max_tokens": 1000 })
        );
    }

    #[test]
    fn candidates_keep_order() {
        let cards: Vec<FlashcardCandidate> = serde_json::from_str(
            r#"[{"front":"Q1","back":"A1"},{"front":"Q2","back":"A2"}]"#,
        )
        .unwrap();
        assert_eq!(
            cards,
            vec![
                FlashcardCandidate::new("Q1", "A1"),
                FlashcardCandidate::new("Q2", "A2")
            ]
        );
    }

    #[test]
    fn missing_back_fails() {
        assert!(serde_json::from_str::<Vec<FlashcardCandidate>>(r#"[{"front":"Q1"}]"#).is_err());
    }

    #[test]
    fn object_instead_of_array_fails() {
        assert!(
            serde_json::from_str::<Vec<FlashcardCandidate>>(r#"{"front":"Q","back":"A"}"#)
                .is_err()
        );
    }
}
