//! HTTP seam shared by the OCR and synthesis stages.
//!
//! Both stages speak the same protocol: an authenticated JSON `POST` whose
//! response body is decoded into a typed value. [`HttpTransport`] owns the
//! wire part; [`decode_json`] owns the shared decode rules. Callers that
//! need custom middleware, or tests that need to count requests, implement
//! the trait and inject it through
//! [`crate::config::PipelineConfigBuilder::transport`].

use crate::config::ApiKey;
use crate::error::{Img2CardsError, RequestError};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Longest error body kept inside [`RequestError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// One outgoing JSON request.
#[derive(Clone)]
pub struct JsonRequest {
    pub url: Url,
    pub api_key: ApiKey,
    pub body: serde_json::Value,
}

impl fmt::Debug for JsonRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRequest")
            .field("url", &self.url.as_str())
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Status and raw body of a completed round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one authenticated JSON `POST` and returns the raw response.
///
/// Implementations report only transport-level failures (timeouts, refused
/// connections, TLS errors) as [`RequestError::Transport`]. Any response
/// that arrived, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: JsonRequest) -> Result<HttpResponse, RequestError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport; `timeout` bounds each whole request when set.
    pub fn new(timeout: Option<Duration>) -> Result<Self, Img2CardsError> {
        let mut builder = Client::builder().user_agent(concat!("img2cards/", env!("CARGO_PKG_VERSION")));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| Img2CardsError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: JsonRequest) -> Result<HttpResponse, RequestError> {
        let body = serde_json::to_vec(&request.body).map_err(|e| RequestError::Transport {
            detail: format!("request body could not be serialised: {e}"),
            timed_out: false,
        })?;

        debug!("POST {} ({} bytes)", request.url, body.len());

        let response = self
            .http
            .post(request.url)
            .header(AUTHORIZATION, format!("Bearer {}", request.api_key.expose()))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(transport_error)?;
        debug!("HTTP {} ({} bytes)", status, bytes.len());

        Ok(HttpResponse::new(status, bytes.to_vec()))
    }
}

fn transport_error(e: reqwest::Error) -> RequestError {
    let detail = if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    };
    RequestError::Transport {
        detail,
        timed_out: e.is_timeout(),
    }
}

/// Decode a response body into `T`.
///
/// Order of checks:
/// 1. non-2xx status → [`RequestError::HttpStatus`] (only when `check_status`)
/// 2. zero-length body → [`RequestError::EmptyResponse`]
/// 3. malformed JSON or wrong shape → [`RequestError::Decode`]
pub fn decode_json<T: DeserializeOwned>(
    response: &HttpResponse,
    check_status: bool,
) -> Result<T, RequestError> {
    if check_status && !response.is_success() {
        let body: String = String::from_utf8_lossy(&response.body)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        return Err(RequestError::HttpStatus {
            status: response.status,
            body,
        });
    }

    if response.body.is_empty() {
        return Err(RequestError::EmptyResponse);
    }

    serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Text {
        text: String,
    }

    #[test]
    fn decodes_success_body() {
        let r = HttpResponse::new(200, r#"{"text":"hi"}"#);
        let t: Text = decode_json(&r, true).unwrap();
        assert_eq!(t.text, "hi");
    }

    #[test]
    fn empty_body_is_distinct_from_decode_error() {
        let r = HttpResponse::new(200, Vec::new());
        assert_eq!(
            decode_json::<Text>(&r, true).unwrap_err(),
            RequestError::EmptyResponse
        );

        let r = HttpResponse::new(200, "not json");
        assert!(matches!(
            decode_json::<Text>(&r, true).unwrap_err(),
            RequestError::Decode(_)
        ));
    }

    #[test]
    fn wrong_field_type_is_decode_error() {
        let r = HttpResponse::new(200, r#"{"text":42}"#);
        assert!(matches!(
            decode_json::<Text>(&r, true),
            Err(RequestError::Decode(_))
        ));
    }

    #[test]
    fn status_checked_before_body() {
        let r = HttpResponse::new(401, r#"{"text":"looks fine"}"#);
        assert_eq!(
            decode_json::<Text>(&r, true).unwrap_err(),
            RequestError::HttpStatus {
                status: 401,
                body: r#"{"text":"looks fine"}"#.into()
            }
        );
    }

    #[test]
    fn unchecked_status_decodes_anyway() {
        let r = HttpResponse::new(500, r#"{"text":"served with 500"}"#);
        let t: Text = decode_json(&r, false).unwrap();
        assert_eq!(t.text, "served with 500");

        let r = HttpResponse::new(500, r#"{"error":"boom"}"#);
        assert!(matches!(
            decode_json::<Text>(&r, false),
            Err(RequestError::Decode(_))
        ));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let r = HttpResponse::new(502, "x".repeat(4096));
        match decode_json::<Text>(&r, true).unwrap_err() {
            RequestError::HttpStatus { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY_CHARS),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn request_debug_hides_key() {
        let req = JsonRequest {
            url: Url::parse("https://ocr.example.com").unwrap(),
            api_key: ApiKey::new("sk-live"),
            body: serde_json::json!({}),
        };
        assert!(!format!("{req:?}").contains("sk-live"));
    }
}
