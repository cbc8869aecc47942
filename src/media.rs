use std::io::Cursor;

use base64::alphabet;
use base64::engine::general_purpose::{self, GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use image::ImageFormat;
use tracing::debug;

/// Accepts unpadded input and non-zero trailing bits, which some canvas
/// exporters produce.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("No image provided")]
    Empty,
    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unsupported or corrupt image: {0}")]
    Image(#[from] image::ImageError),
}

/// A sketch normalized to PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub png_bytes: Vec<u8>,
    pub base64: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub const MIME_TYPE: &'static str = "image/png";

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, self.base64)
    }
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// Drops a `data:...;base64,` prefix and any whitespace, then pads to a
/// multiple of four.
fn clean_base64_payload(payload: &str) -> String {
    let body = match payload.split_once(',') {
        Some((_, body)) => body,
        None => payload,
    };
    let mut cleaned: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    let missing_padding = cleaned.len() % 4;
    if missing_padding != 0 {
        cleaned.push_str(&"=".repeat(4 - missing_padding));
    }
    cleaned
}

fn decode_base64(cleaned: &str) -> Result<Vec<u8>, base64::DecodeError> {
    match general_purpose::STANDARD.decode(cleaned) {
        Ok(bytes) => Ok(bytes),
        Err(strict_err) => {
            debug!("Strict base64 decode failed ({strict_err}); retrying leniently");
            LENIENT_BASE64.decode(cleaned.trim_end_matches('='))
        }
    }
}

/// Decodes an uploaded sketch and re-encodes it as PNG.
pub fn decode_image_payload(payload: &str) -> Result<EncodedImage, ImageDecodeError> {
    let cleaned = clean_base64_payload(payload);
    if cleaned.is_empty() {
        return Err(ImageDecodeError::Empty);
    }

    let raw = decode_base64(&cleaned)?;
    let decoded = image::load_from_memory(&raw)?;

    let mut png_bytes = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;

    debug!(
        "Decoded sketch: {}x{}, {} source bytes ({}), {} PNG bytes",
        decoded.width(),
        decoded.height(),
        raw.len(),
        detect_mime_type(&raw).unwrap_or_else(|| "unknown".to_string()),
        png_bytes.len()
    );

    Ok(EncodedImage {
        base64: general_purpose::STANDARD.encode(&png_bytes),
        width: decoded.width(),
        height: decoded.height(),
        png_bytes,
    })
}
