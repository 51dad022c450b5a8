//! Error types for the img2cards library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2CardsError`] — **Fatal**: nothing can run at all (bad config,
//!   unreadable input, deck file cannot be written). Returned as
//!   `Err(Img2CardsError)` from constructors and the input/sink helpers.
//!
//! * [`PipelineError`] — **Per invocation**: one image failed somewhere in
//!   encode → OCR → synthesis. Every other invocation is unaffected. The
//!   variant names the failing stage and [`RequestError`] names the cause,
//!   so callers can tell a timeout from a malformed body without reading
//!   logs. Batch runs store it, wrapped in [`ImageError`], inside
//!   [`crate::output::ImageResult`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the img2cards library.
#[derive(Debug, Error)]
pub enum Img2CardsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read but is neither a JPEG nor a PNG.
    #[error("Input is not a supported image: '{source_label}'\nFirst bytes: {magic:?}")]
    NotAnImage { source_label: String, magic: [u8; 4] },

    // ── Sink errors ───────────────────────────────────────────────────────
    /// Could not read or write the deck file.
    #[error("Failed to write deck file '{path}': {source}")]
    DeckWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing deck file is not a JSON array of cards.
    #[error("Deck file '{path}' is corrupt: {detail}")]
    CorruptDeck { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to turn a bitmap into a transmittable payload.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EncodeError {
    /// Width or height is zero.
    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// The bytes could not be decoded into a bitmap.
    #[error("image could not be decoded: {0}")]
    Decode(String),

    /// The JPEG encoder rejected the bitmap.
    #[error("JPEG compression failed: {0}")]
    Compression(String),

    /// Compression succeeded but yielded zero bytes.
    #[error("JPEG compression produced no data")]
    NoData,
}

/// Failure of one remote call (OCR or synthesis).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RequestError {
    /// Timeout, connection refused, TLS failure, …
    #[error("transport error{}: {detail}", timeout_suffix(.timed_out))]
    Transport { detail: String, timed_out: bool },

    /// The endpoint answered with an empty body.
    #[error("empty response body")]
    EmptyResponse,

    /// The body was not JSON of the expected shape.
    #[error("response could not be decoded: {0}")]
    Decode(String),

    /// The endpoint answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}

fn timeout_suffix(timed_out: &bool) -> &'static str {
    if *timed_out {
        " (timed out)"
    } else {
        ""
    }
}

impl RequestError {
    /// `true` when the transport gave up waiting for the endpoint.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Transport { timed_out: true, .. })
    }
}

/// Why a single pipeline invocation produced no flashcards.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// Encoding failed; no network call was attempted.
    #[error("encode stage failed: {0}")]
    Encode(EncodeError),

    /// The OCR request failed; synthesis was not attempted.
    #[error("OCR stage failed: {0}")]
    Ocr(RequestError),

    /// The synthesis request failed.
    #[error("synthesis stage failed: {0}")]
    Synthesis(RequestError),

    /// The caller cancelled the invocation before it finished.
    #[error("pipeline cancelled")]
    Cancelled,
}

impl From<EncodeError> for PipelineError {
    fn from(e: EncodeError) -> Self {
        PipelineError::Encode(e)
    }
}

/// Why one input of a batch produced no flashcards.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ImageError {
    /// The path or URL could not be turned into image bytes.
    #[error("input failed: {0}")]
    Input(String),

    /// The bytes were read but the pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
