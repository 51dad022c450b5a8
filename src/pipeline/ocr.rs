//! OCR stage: send the encoded photo, get its text back.

use crate::config::PipelineConfig;
use crate::error::RequestError;
use crate::pipeline::encode::EncodedImagePayload;
use crate::pipeline::transport::{decode_json, HttpTransport, JsonRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Decoded OCR response. `text` may be empty but must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
}

/// Send `payload` to the OCR endpoint and decode `{"text": …}`.
///
/// Exactly one request is made; there is no retry.
pub async fn request_ocr(
    transport: &dyn HttpTransport,
    config: &PipelineConfig,
    payload: &EncodedImagePayload,
) -> Result<OcrResult, RequestError> {
    let response = transport
        .post_json(JsonRequest {
            url: config.ocr_endpoint.clone(),
            api_key: config.api_key.clone(),
            body: request_body(payload),
        })
        .await?;

    let result: OcrResult = decode_json(&response, config.check_status)?;
    debug!("OCR returned {} chars", result.text.len());
    Ok(result)
}

/// `{"image_data": "<base64>"}`
fn request_body(payload: &EncodedImagePayload) -> serde_json::Value {
    json!({ "image_data": payload.base64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let payload = EncodedImagePayload {
            bytes: b"ABC".to_vec(),
            base64: "QUJD".into(),
        };
        assert_eq!(request_body(&payload), json!({ "image_data": "QUJD" }));
    }

    #[test]
    fn missing_text_is_a_decode_failure() {
        assert!(serde_json::from_str::<OcrResult>(r#"{"txt":"x"}"#).is_err());
        assert!(serde_json::from_str::<OcrResult>(r#"{"text":null}"#).is_err());
        let empty: OcrResult = serde_json::from_str(r#"{"text":""}"#).unwrap();
        assert!(empty.text.is_empty());
    }
}
