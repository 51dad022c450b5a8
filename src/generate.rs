//! Single-image entry points: one photo in, flashcards out.
//!
//! [`FlashcardPipeline`] sequences encode → OCR → synthesis for one image.
//! Each call starts a fresh instance of the state machine
//! `Idle → Encoding → AwaitingOcr → AwaitingSynthesis → Done`; nothing is
//! carried between calls except the shared, read-only config and transport.
//!
//! Two result shapes are offered:
//!
//! * [`FlashcardPipeline::run`] and friends return
//!   `Result<Vec<FlashcardCandidate>, PipelineError>` so the caller knows
//!   which stage failed and why.
//! * [`FlashcardPipeline::process`] keeps the simple contract: `Some(cards)`
//!   or `None`, with the cause only in the logs.

use crate::config::PipelineConfig;
use crate::error::{EncodeError, Img2CardsError, PipelineError};
use crate::pipeline::encode::{decode_image, encode_image, EncodedImagePayload};
use crate::pipeline::input::ImageSource;
use crate::pipeline::ocr::request_ocr;
use crate::pipeline::synthesis::{synthesize, FlashcardCandidate};
use crate::pipeline::transport::{HttpTransport, ReqwestTransport};
use crate::progress::{PipelineState, ProgressCallback};
use image::DynamicImage;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Label used in logs when the caller supplies a bare bitmap.
const UNNAMED: &str = "image";

struct PipelineInner {
    config: PipelineConfig,
    transport: Arc<dyn HttpTransport>,
}

/// Photo → flashcards pipeline.
///
/// Cheap to clone; clones share the config and the HTTP client. Concurrent
/// calls are independent and are neither de-duplicated nor serialised.
///
/// # Example
/// ```rust,no_run
/// use img2cards::{FlashcardPipeline, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = FlashcardPipeline::new(PipelineConfig::from_env()?)?;
/// let photo = image::open("lecture-notes.jpg")?;
/// match pipeline.run(&photo).await {
///     Ok(cards) => println!("{} cards", cards.len()),
///     Err(e) => eprintln!("no cards: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FlashcardPipeline {
    inner: Arc<PipelineInner>,
}

impl std::fmt::Debug for FlashcardPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashcardPipeline")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// What the encode stage starts from. Consumed by encoding, so an owned
/// bitmap is freed before the first network call.
enum Input<'a> {
    Bitmap(&'a DynamicImage),
    Owned(DynamicImage),
    Bytes(&'a [u8]),
}

impl FlashcardPipeline {
    /// Build a pipeline, creating a reqwest transport unless one was injected.
    pub fn new(config: PipelineConfig) -> Result<Self, Img2CardsError> {
        let transport = resolve_transport(&config)?;
        Ok(Self {
            inner: Arc::new(PipelineInner { config, transport }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Run one image through the pipeline and report the typed outcome.
    pub async fn run(&self, image: &DynamicImage) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        self.execute(UNNAMED, Input::Bitmap(image), None).await
    }

    /// Like [`run`](Self::run), but either network stage is abandoned as
    /// soon as `cancel` fires, yielding [`PipelineError::Cancelled`].
    pub async fn run_with_cancel(
        &self,
        image: &DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        self.execute(UNNAMED, Input::Bitmap(image), Some(cancel)).await
    }

    /// Decode PNG/JPEG bytes, then run. Undecodable bytes fail in the
    /// encode stage, before any network call.
    pub async fn run_bytes(&self, bytes: &[u8]) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        self.execute(UNNAMED, Input::Bytes(bytes), None).await
    }

    /// Run a resolved input, labelling logs and progress events with its
    /// path or URL.
    pub async fn run_source(
        &self,
        source: &ImageSource,
    ) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        self.execute(&source.label, Input::Bytes(&source.bytes), None)
            .await
    }

    /// Run one image and collapse every failure to `None`.
    ///
    /// The failing stage and cause are logged at `warn` level.
    pub async fn process(&self, image: &DynamicImage) -> Option<Vec<FlashcardCandidate>> {
        self.run(image).await.ok()
    }

    /// Run one image and hand the outcome to `on_complete` exactly once.
    ///
    /// The callback runs on the task that awaits this future, so a UI loop
    /// awaiting it can touch its own state directly.
    pub async fn process_with<F>(&self, image: &DynamicImage, on_complete: F)
    where
        F: FnOnce(Option<Vec<FlashcardCandidate>>),
    {
        let outcome = self.process(image).await;
        on_complete(outcome);
    }

    /// Start one invocation on the tokio runtime and return a handle to
    /// cancel it or await its outcome.
    ///
    /// The image is released as soon as it has been encoded. Dropping the
    /// handle detaches the task; it is not cancelled.
    pub fn spawn(&self, image: DynamicImage) -> PipelineHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let pipeline = self.clone();
        let task = tokio::spawn(async move {
            pipeline
                .execute(UNNAMED, Input::Owned(image), Some(&token))
                .await
        });
        PipelineHandle { cancel, task }
    }

    async fn execute(
        &self,
        label: &str,
        input: Input<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        let mut tracker = StateTracker::new(label, self.inner.config.progress_callback.as_ref());
        info!("Generating flashcards from {}", label);

        let result = self.stages(&mut tracker, input, cancel).await;
        tracker.finish(&result);
        result
    }

    async fn stages(
        &self,
        tracker: &mut StateTracker<'_>,
        input: Input<'_>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        let config = &self.inner.config;
        let transport = self.inner.transport.as_ref();

        if cancel.is_some_and(|t| t.is_cancelled()) {
            return Err(PipelineError::Cancelled);
        }

        // ── Encoding ─────────────────────────────────────────────────────
        tracker.enter(PipelineState::Encoding);
        let payload = encode_input(input, config.jpeg_quality)?;

        // ── OCR ──────────────────────────────────────────────────────────
        tracker.enter(PipelineState::AwaitingOcr);
        let ocr = until_cancelled(cancel, request_ocr(transport, config, &payload))
            .await?
            .map_err(PipelineError::Ocr)?;
        drop(payload);
        debug!("{}: OCR text is {} chars", tracker.label, ocr.text.len());

        // ── Synthesis ────────────────────────────────────────────────────
        tracker.enter(PipelineState::AwaitingSynthesis);
        let cards = until_cancelled(cancel, synthesize(transport, config, &ocr.text))
            .await?
            .map_err(PipelineError::Synthesis)?;

        Ok(cards)
    }
}

fn encode_input(input: Input<'_>, quality: u8) -> Result<EncodedImagePayload, EncodeError> {
    match input {
        Input::Bitmap(img) => encode_image(img, quality),
        Input::Owned(img) => encode_image(&img, quality),
        Input::Bytes(bytes) => encode_image(&decode_image(bytes)?, quality),
    }
}

/// Await `fut`, or give up with [`PipelineError::Cancelled`] if the token
/// fires first. Dropping `fut` aborts the in-flight request.
async fn until_cancelled<F, T>(cancel: Option<&CancellationToken>, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(PipelineError::Cancelled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

fn resolve_transport(config: &PipelineConfig) -> Result<Arc<dyn HttpTransport>, Img2CardsError> {
    if let Some(ref transport) = config.transport {
        return Ok(Arc::clone(transport));
    }
    Ok(Arc::new(ReqwestTransport::new(config.request_timeout)?))
}

/// Follows one invocation through its states, for logs and callbacks.
struct StateTracker<'a> {
    label: &'a str,
    callback: Option<&'a ProgressCallback>,
    state: PipelineState,
}

impl<'a> StateTracker<'a> {
    fn new(label: &'a str, callback: Option<&'a ProgressCallback>) -> Self {
        Self {
            label,
            callback,
            state: PipelineState::Idle,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug!("{}: {} → {}", self.label, self.state, next);
        self.state = next;
        if let Some(cb) = self.callback {
            cb.on_state_change(self.label, next);
        }
    }

    fn finish(&mut self, result: &Result<Vec<FlashcardCandidate>, PipelineError>) {
        self.enter(PipelineState::Done);
        match result {
            Ok(cards) => {
                info!("{}: generated {} flashcards", self.label, cards.len());
                if let Some(cb) = self.callback {
                    cb.on_complete(self.label, cards.len());
                }
            }
            Err(e) => {
                warn!("{}: {}", self.label, e);
                if let Some(cb) = self.callback {
                    cb.on_error(self.label, &e.to_string());
                }
            }
        }
    }
}

/// A pipeline invocation running in the background.
#[derive(Debug)]
pub struct PipelineHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<Vec<FlashcardCandidate>, PipelineError>>,
}

impl PipelineHandle {
    /// Abort whichever network stage is in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this invocation when fired, e.g. when a newer
    /// capture supersedes it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the invocation to finish.
    pub async fn outcome(self) -> Result<Vec<FlashcardCandidate>, PipelineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(PipelineError::Cancelled),
        }
    }
}
