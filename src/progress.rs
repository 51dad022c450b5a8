//! Progress-callback trait for per-image pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! stage transitions as each image moves through
//! `Idle → Encoding → AwaitingOcr → AwaitingSynthesis → Done`.
//!
//! # Example
//!
//! ```rust
//! use img2cards::{PipelineProgressCallback, PipelineState};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_state_change(&self, label: &str, state: PipelineState) {
//!         if state == PipelineState::Done {
//!             self.finished.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("{label} finished");
//!         }
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { finished: AtomicUsize::new(0) });
//! cb.on_state_change("photo.jpg", PipelineState::Done);
//! assert_eq!(cb.finished.load(Ordering::SeqCst), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where one pipeline instance currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    Encoding,
    AwaitingOcr,
    AwaitingSynthesis,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Encoding => "encoding",
            PipelineState::AwaitingOcr => "awaiting OCR",
            PipelineState::AwaitingSynthesis => "awaiting synthesis",
            PipelineState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as each image changes state.
///
/// Implementations must be `Send + Sync`: batch mode runs several images at
/// once, so methods may be called concurrently for different labels. All
/// methods have default no-op implementations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called on every state transition, including the final `Done`.
    ///
    /// # Arguments
    /// * `label` — caller-supplied name of the image (file name, URL, …)
    /// * `state` — the state just entered
    fn on_state_change(&self, label: &str, state: PipelineState) {
        let _ = (label, state);
    }

    /// Called once when an image produced flashcards.
    fn on_complete(&self, label: &str, card_count: usize) {
        let _ = (label, card_count);
    }

    /// Called once when an image failed at any stage.
    fn on_error(&self, label: &str, error: &str) {
        let _ = (label, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
