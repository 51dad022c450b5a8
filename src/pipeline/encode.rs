//! Image encoding: `DynamicImage` → JPEG → base64 payload.
//!
//! Phone photos are large and the OCR endpoint receives them embedded in a
//! JSON string, so lossy JPEG at a fixed quality keeps requests small while
//! leaving printed text legible. Alpha is dropped before compression since
//! JPEG cannot carry it.

use crate::error::EncodeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Bytes ready to send to the OCR endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImagePayload {
    /// Compressed JPEG bytes.
    pub bytes: Vec<u8>,
    /// Standard-alphabet base64 of `bytes`.
    pub base64: String,
}

/// Compress `img` as JPEG at `quality` (1–100) and base64-encode it.
///
/// Fails without side effects when the bitmap has no pixels or the encoder
/// produces nothing, so the caller can stop before any network call.
pub fn encode_image(img: &DynamicImage, quality: u8) -> Result<EncodedImagePayload, EncodeError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(EncodeError::EmptyImage { width, height });
    }

    let rgb = img.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| EncodeError::Compression(e.to_string()))?;

    if bytes.is_empty() {
        return Err(EncodeError::NoData);
    }

    let base64 = STANDARD.encode(&bytes);
    debug!(
        "Encoded {}x{} image → {} JPEG bytes, {} base64 chars",
        width,
        height,
        bytes.len(),
        base64.len()
    );

    Ok(EncodedImagePayload { bytes, base64 })
}

/// Decode PNG or JPEG bytes into a bitmap.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, EncodeError> {
    if bytes.is_empty() {
        return Err(EncodeError::Decode("no bytes".into()));
    }
    image::load_from_memory(bytes).map_err(|e| EncodeError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn red_square(side: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encode_round_trips_to_jpeg() {
        let img = red_square(16);
        let payload = encode_image(&img, 80).expect("encode should succeed");
        assert!(!payload.base64.is_empty());

        let decoded = STANDARD.decode(&payload.base64).expect("valid base64");
        assert_eq!(decoded, payload.bytes);
        assert_eq!(image::guess_format(&decoded).unwrap(), ImageFormat::Jpeg);

        let back = image::load_from_memory(&decoded).expect("valid JPEG");
        assert_eq!((back.width(), back.height()), (16, 16));
    }

    #[test]
    fn zero_size_image_fails() {
        let img = DynamicImage::new_rgb8(0, 10);
        assert_eq!(
            encode_image(&img, 80).unwrap_err(),
            EncodeError::EmptyImage {
                width: 0,
                height: 10
            }
        );
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let mut img = RgbaImage::new(64, 64);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255]);
        }
        let img = DynamicImage::ImageRgba8(img);
        let high = encode_image(&img, 95).unwrap();
        let low = encode_image(&img, 10).unwrap();
        assert!(low.bytes.len() <= high.bytes.len());
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(matches!(
            decode_image(b"\xFF\xD8\xFFgarbage"),
            Err(EncodeError::Decode(_))
        ));
        assert!(matches!(decode_image(&[]), Err(EncodeError::Decode(_))));
    }

    #[test]
    fn png_bytes_decode() {
        let mut png = Vec::new();
        red_square(4)
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let img = decode_image(&png).unwrap();
        assert_eq!(img.width(), 4);
    }
}
