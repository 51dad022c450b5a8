//! Input resolution: turn a user-supplied path or URL into image bytes.
//!
//! Photos are small enough to hold in memory, so URL inputs are downloaded
//! straight into a buffer. Magic bytes are checked before decoding so a
//! stray text file gets a clear error rather than a codec failure.

use crate::error::Img2CardsError;
use std::path::Path;
use tracing::{debug, info};

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

/// Raw bytes of one image input, with a label for logs and results.
#[derive(Debug, Clone)]
pub struct ImageSource {
    /// The path or URL the bytes came from.
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    match input.split_once("://") {
        Some((scheme, _)) => {
            scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")
        }
        None => false,
    }
}

/// `true` when `bytes` start with a JPEG or PNG signature.
pub fn has_image_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&JPEG_MAGIC) || bytes.starts_with(&PNG_MAGIC)
}

/// Resolve the input string to image bytes.
///
/// URLs are downloaded with `timeout_secs`; anything else is read from disk.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ImageSource, Img2CardsError> {
    let source = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(Path::new(input)).await?
    };

    check_magic(&source)?;
    Ok(source)
}

async fn read_local(path: &Path) -> Result<ImageSource, Img2CardsError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Img2CardsError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Img2CardsError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    debug!("Read local image: {} ({} bytes)", path.display(), bytes.len());
    Ok(ImageSource {
        label: path.display().to_string(),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageSource, Img2CardsError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Img2CardsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(url, timeout_secs, e))?;

    if !response.status().is_success() {
        return Err(Img2CardsError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    // The timeout covers the body too.
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_error(url, timeout_secs, e))?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(ImageSource {
        label: url.to_string(),
        bytes: bytes.to_vec(),
    })
}

fn download_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> Img2CardsError {
    if e.is_timeout() {
        Img2CardsError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        Img2CardsError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

fn check_magic(source: &ImageSource) -> Result<(), Img2CardsError> {
    if has_image_magic(&source.bytes) {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = source.bytes.len().min(4);
    magic[..n].copy_from_slice(&source.bytes[..n]);
    Err(Img2CardsError::NotAnImage {
        source_label: source.label.clone(),
        magic,
    })
}
