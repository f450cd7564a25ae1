use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::io::Cursor;
use std::path::Path;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// Formats resvg can paint from an embedded `<image>`.
const EMBEDDABLE_MIMES: [&str; 4] = [PNG_MIME, JPEG_MIME, "image/gif", "image/webp"];

/// Panel payloads arrive unpadded or line-wrapped from some generators.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub width: u32,
    pub height: u32,
}

/// Drops a leading `data:<mime>;base64,` header if present.
pub fn strip_data_url(value: &str) -> &str {
    let trimmed = value.trim();
    let Some(rest) = trimmed.strip_prefix("data:") else {
        return trimmed;
    };
    match rest.find(";base64,") {
        Some(idx) => &rest[idx + ";base64,".len()..],
        None => trimmed,
    }
}

pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Decodes base64 image data (optionally a data URL) into raw bytes plus
/// the sniffed mime type and pixel dimensions.
pub fn decode_image_data(value: &str) -> Result<DecodedImage> {
    let payload: Vec<u8> = strip_data_url(value)
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    if payload.is_empty() {
        return Err(anyhow!("image data is empty"));
    }
    let bytes = LENIENT_BASE64
        .decode(&payload)
        .with_context(|| "failed to decode base64 image data")?;
    decode_image_bytes(bytes)
}

pub fn decode_image_bytes(bytes: Vec<u8>) -> Result<DecodedImage> {
    let mime = sniff_image_mime(&bytes)
        .ok_or_else(|| anyhow!("image data is not a recognized image format"))?;
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .with_context(|| "failed to read image header")?
        .into_dimensions()
        .with_context(|| "failed to read image dimensions")?;
    if width == 0 || height == 0 {
        return Err(anyhow!("image has zero size ({}x{})", width, height));
    }
    Ok(DecodedImage {
        bytes,
        mime: mime.to_string(),
        width,
        height,
    })
}

/// Returns an image the rasterizer can embed, transcoding to PNG when the
/// source format is not one resvg paints.
pub fn ensure_embeddable(image: DecodedImage) -> Result<DecodedImage> {
    if EMBEDDABLE_MIMES.contains(&image.mime.as_str()) {
        return Ok(image);
    }
    tracing::debug!("transcoding {} base image to png", image.mime);
    let decoded = image::load_from_memory(&image.bytes)
        .with_context(|| format!("failed to decode {} image", image.mime))?;
    let mut bytes = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .with_context(|| "failed to transcode base image to png")?;
    Ok(DecodedImage {
        bytes,
        mime: PNG_MIME.to_string(),
        ..image
    })
}

pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    if detected.starts_with("image/") {
        Some(detected)
    } else {
        None
    }
}

pub fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        "image/png" => Some(image::ImageFormat::Png),
        "image/jpeg" => Some(image::ImageFormat::Jpeg),
        "image/jpg" => Some(image::ImageFormat::Jpeg),
        "image/gif" => Some(image::ImageFormat::Gif),
        "image/webp" => Some(image::ImageFormat::WebP),
        "image/bmp" => Some(image::ImageFormat::Bmp),
        "image/tiff" => Some(image::ImageFormat::Tiff),
        _ => None,
    }
}

pub fn mime_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}
