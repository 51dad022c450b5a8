//! # img2cards
//!
//! Turn a photo of study material into question/answer flashcards.
//!
//! The crate does no recognition or generation itself. It compresses the
//! image, sends it to a remote OCR endpoint, forwards the recognised text
//! to a remote language-model endpoint with a flashcard prompt, and decodes
//! the answer into [`FlashcardCandidate`]s. Persisting them is left to a
//! [`CardSink`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! photo
//!  │
//!  ├─ 1. Input      read a local file or download a URL (batch / CLI only)
//!  ├─ 2. Encode     RGB → JPEG at the configured quality → base64
//!  ├─ 3. OCR        POST {"image_data"} → {"text"}
//!  ├─ 4. Synthesis  POST {"prompt", "max_tokens"} → [{"front","back"}]
//!  └─ 5. Outcome    cards, or a typed error / None
//! ```
//!
//! Both network stages share one bearer credential and one HTTP client.
//! Any failure ends the invocation; there are no retries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2cards::{save_flashcards, FlashcardPipeline, JsonDeckSink, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // IMG2CARDS_API_KEY, IMG2CARDS_OCR_URL, IMG2CARDS_GENERATION_URL
//!     let pipeline = FlashcardPipeline::new(PipelineConfig::from_env()?)?;
//!
//!     let photo = image::open("whiteboard.jpg")?;
//!     if let Some(cards) = pipeline.process(&photo).await {
//!         let sink = JsonDeckSink::new("deck.json");
//!         let saved = save_flashcards(&sink, cards).await?;
//!         println!("saved {} cards", saved.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2cards` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! img2cards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_batch, process_batch_stream, ImageStream};
pub use config::{ApiKey, PipelineConfig, PipelineConfigBuilder};
pub use error::{EncodeError, ImageError, Img2CardsError, PipelineError, RequestError};
pub use generate::{FlashcardPipeline, PipelineHandle};
pub use output::{BatchOutput, BatchStats, ImageResult};
pub use pipeline::encode::EncodedImagePayload;
pub use pipeline::input::ImageSource;
pub use pipeline::ocr::OcrResult;
pub use pipeline::synthesis::FlashcardCandidate;
pub use pipeline::transport::{HttpResponse, HttpTransport, JsonRequest, ReqwestTransport};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, PipelineState, ProgressCallback};
pub use sink::{save_flashcards, Card, CardSink, JsonDeckSink, MemorySink};

// Callers implementing `CardSink` or `HttpTransport` need the same macro.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
