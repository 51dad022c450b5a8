//! CLI binary for img2cards.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, runs a batch and prints or saves the cards.

use anyhow::{Context, Result};
use clap::Parser;
use img2cards::{
    process_batch, save_flashcards, BatchOutput, FlashcardCandidate, FlashcardPipeline,
    JsonDeckSink, PipelineConfig, PipelineProgressCallback, PipelineState, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar for the whole batch; a line per finished image. Images may
/// finish out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time per input label, for elapsed reporting.
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Generating");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, label: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(label))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self, succeeded: usize, total: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(succeeded);
        if failed == 0 {
            eprintln!("{} {} images processed", green("✔"), bold(&succeeded.to_string()));
        } else {
            eprintln!(
                "{} {}/{} images processed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_state_change(&self, label: &str, state: PipelineState) {
        if state == PipelineState::Encoding {
            if let Ok(mut m) = self.start_times.lock() {
                m.insert(label.to_string(), Instant::now());
            }
        }
        if state != PipelineState::Done {
            self.bar.set_message(format!("{} {}", dim(short(label)), state));
        }
    }

    fn on_complete(&self, label: &str, card_count: usize) {
        let secs = self.elapsed_secs(label);
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            green("✓"),
            short(label),
            dim(&format!("{card_count:>3} cards")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_error(&self, label: &str, error: &str) {
        let secs = self.elapsed_secs(label);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            short(label),
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }
}

/// Last path segment, for compact progress lines.
fn short(label: &str) -> &str {
    label
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(label)
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print cards for one photo
  img2cards notes.jpg

  # Several photos, appended to a deck file
  img2cards page1.jpg page2.png -o biology.json

  # From a URL, machine-readable output
  img2cards https://example.com/slide.png --json > cards.json

  # Own prompt ({text} is replaced by the recognised text)
  img2cards --prompt-file prompt.txt notes.jpg

ENVIRONMENT VARIABLES:
  IMG2CARDS_API_KEY         Bearer credential sent to both endpoints
  IMG2CARDS_OCR_URL         OCR endpoint: {"image_data"} → {"text"}
  IMG2CARDS_GENERATION_URL  Generation endpoint: {"prompt","max_tokens"} → [{"front","back"}]
  RUST_LOG                  Overrides the log filter
"#;

/// Turn photos of study material into flashcards.
#[derive(Parser, Debug)]
#[command(
    name = "img2cards",
    version,
    about = "Turn photos of study material into flashcards",
    long_about = "Send each image (local file or URL) to an OCR endpoint, pass the recognised \
text to a language-model endpoint, and collect the question/answer flashcards it returns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image files (JPEG/PNG) or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Append cards to this JSON deck instead of printing them.
    #[arg(short, long, env = "IMG2CARDS_OUTPUT")]
    output: Option<PathBuf>,

    /// Bearer credential for both endpoints.
    #[arg(long, env = "IMG2CARDS_API_KEY", hide_env_values = true)]
    api_key: String,

    /// OCR endpoint URL.
    #[arg(long, env = "IMG2CARDS_OCR_URL")]
    ocr_url: String,

    /// Flashcard generation endpoint URL.
    #[arg(long, env = "IMG2CARDS_GENERATION_URL")]
    generation_url: String,

    /// JPEG quality used when uploading (1–100).
    #[arg(long, env = "IMG2CARDS_QUALITY", default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Max tokens requested from the generation endpoint.
    #[arg(long, env = "IMG2CARDS_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Per-request timeout in seconds (default: none).
    #[arg(long, env = "IMG2CARDS_TIMEOUT")]
    timeout: Option<u64>,

    /// Decode response bodies even when the HTTP status is not 2xx.
    #[arg(long)]
    no_status_check: bool,

    /// Text file with a prompt template containing `{text}`.
    #[arg(long, env = "IMG2CARDS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Number of images processed at once.
    #[arg(short, long, env = "IMG2CARDS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output the full batch result as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "IMG2CARDS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "IMG2CARDS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build pipeline ───────────────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as ProgressCallback),
    )
    .await?;
    let pipeline = FlashcardPipeline::new(config).context("Failed to create pipeline")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = process_batch(&pipeline, &cli.inputs).await;

    if let Some(ref cb) = progress {
        cb.finish(output.stats.succeeded, output.stats.total_inputs);
    }

    let cards: Vec<FlashcardCandidate> = output.cards().cloned().collect();

    if let Some(ref path) = cli.output {
        let sink = JsonDeckSink::new(path);
        let saved = save_flashcards(&sink, cards)
            .await
            .with_context(|| format!("Failed to write deck {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  {} cards  {}ms  →  {}",
                if output.stats.failed == 0 { green("✔") } else { cyan("⚠") },
                saved.len(),
                output.stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output.is_none() {
        print_cards(&output).context("Failed to write to stdout")?;
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Generated {} cards from {}/{} images in {}ms",
            output.stats.total_cards,
            output.stats.succeeded,
            output.stats.total_inputs,
            output.stats.total_duration_ms
        );
        for r in output.results.iter().filter(|r| !r.is_success()) {
            if let Some(ref e) = r.error {
                eprintln!("  {} {}: {}", red("✗"), r.source, e);
            }
        }
    }

    if output.all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .api_key(cli.api_key.clone())
        .ocr_endpoint(cli.ocr_url.clone())
        .generation_endpoint(cli.generation_url.clone())
        .jpeg_quality(cli.quality)
        .max_tokens(cli.max_tokens)
        .check_status(!cli.no_status_check)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_cards(output: &BatchOutput) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for result in output.results.iter().filter(|r| !r.cards.is_empty()) {
        writeln!(handle, "# {}", result.source)?;
        for card in &result.cards {
            writeln!(handle, "Q: {}", card.front)?;
            writeln!(handle, "A: {}", card.back)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}
