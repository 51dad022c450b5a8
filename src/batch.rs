//! Many photos at once.
//!
//! Every input goes through [`resolve_input`] and then its own pipeline
//! invocation; up to `config.concurrency` run at the same time. A failing
//! input never stops the others, it just lands in the output with its
//! error set.
//!
//! [`process_batch`] waits for everything and returns results in input
//! order. [`process_batch_stream`] yields each result as soon as it is
//! ready, so results may arrive out of order (sort by `index` if needed).

use crate::error::ImageError;
use crate::generate::FlashcardPipeline;
use crate::output::{BatchOutput, BatchStats, ImageResult};
use crate::pipeline::input::resolve_input;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-input results.
pub type ImageStream = Pin<Box<dyn Stream<Item = ImageResult> + Send>>;

/// Process every input and collect the results in input order.
pub async fn process_batch(pipeline: &FlashcardPipeline, inputs: &[String]) -> BatchOutput {
    let start = Instant::now();
    info!("Processing {} inputs", inputs.len());

    let mut results: Vec<ImageResult> = process_batch_stream(pipeline, inputs.to_vec())
        .collect()
        .await;
    results.sort_by_key(|r| r.index);

    let mut stats = BatchStats::from_results(&results);
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Batch done: {}/{} inputs succeeded, {} cards in {}ms",
        stats.succeeded, stats.total_inputs, stats.total_cards, stats.total_duration_ms
    );

    BatchOutput { results, stats }
}

/// Process every input, yielding results in completion order.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use img2cards::{process_batch_stream, FlashcardPipeline, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let pipeline = FlashcardPipeline::new(PipelineConfig::from_env()?)?;
/// let inputs = vec!["page1.jpg".to_string(), "page2.png".to_string()];
/// let mut results = process_batch_stream(&pipeline, inputs);
/// while let Some(r) = results.next().await {
///     println!("{}: {} cards", r.source, r.cards.len());
/// }
/// # Ok(())
/// # }
/// ```
pub fn process_batch_stream(pipeline: &FlashcardPipeline, inputs: Vec<String>) -> ImageStream {
    let concurrency = pipeline.config().concurrency.max(1);
    let pipeline = pipeline.clone();

    let s = stream::iter(inputs.into_iter().enumerate().map(move |(index, input)| {
        let pipeline = pipeline.clone();
        async move { process_one(&pipeline, index, input).await }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}

async fn process_one(pipeline: &FlashcardPipeline, index: usize, input: String) -> ImageResult {
    let start = Instant::now();
    let config = pipeline.config();

    let outcome = match resolve_input(&input, config.download_timeout_secs).await {
        Ok(source) => pipeline.run_source(&source).await.map_err(ImageError::from),
        Err(e) => {
            warn!("{}: {}", input, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_error(&input, &e.to_string());
            }
            Err(ImageError::Input(e.to_string()))
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(cards) => ImageResult {
            index,
            source: input,
            cards,
            duration_ms,
            error: None,
        },
        Err(e) => ImageResult {
            index,
            source: input,
            cards: Vec::new(),
            duration_ms,
            error: Some(e),
        },
    }
}
