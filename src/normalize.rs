use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

pub const DEFAULT_MAX_SIDE: u32 = 800;
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Longest allowed side in pixels. Larger images are downscaled.
    pub max_side: u32,
    pub jpeg_quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Opaque RGB JPEG ready to be embedded in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not a raster image (detected {0})")]
    NotAnImage(String),
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Normalizes a base64 image, with or without a `data:` URI prefix.
pub fn normalize(raw: &str, options: &NormalizeOptions) -> Result<NormalizedImage, NormalizeError> {
    let bytes = decode_payload(raw)?;
    normalize_bytes(&bytes, options)
}

pub fn normalize_bytes(
    bytes: &[u8],
    options: &NormalizeOptions,
) -> Result<NormalizedImage, NormalizeError> {
    if bytes.is_empty() {
        return Err(NormalizeError::Empty);
    }
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(NormalizeError::NotAnImage(kind.mime_type().to_string()));
        }
    }
    let format = image::guess_format(bytes).map_err(NormalizeError::Decode)?;
    let decoded =
        image::load_from_memory_with_format(bytes, format).map_err(NormalizeError::Decode)?;
    let flattened = flatten_onto_white(decoded);
    let resized = fit_within(flattened, options.max_side.max(1));
    let encoded = encode_jpeg(&resized, options.jpeg_quality)?;
    Ok(NormalizedImage {
        bytes: encoded,
        width: resized.width(),
        height: resized.height(),
    })
}

/// Strips a `data:...;base64,` prefix and decodes the rest.
pub fn decode_payload(raw: &str) -> Result<Vec<u8>, NormalizeError> {
    let payload = match raw.split_once(',') {
        Some((_, rest)) => rest,
        None => raw,
    };
    let compact: String = payload
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(BASE64.decode(compact.as_bytes())?)
}

fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    let mut canvas = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        let blend = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        canvas.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    canvas
}

fn fit_within(image: RgbImage, max_side: u32) -> RgbImage {
    let (width, height) = (image.width(), image.height());
    if width <= max_side && height <= max_side {
        return image;
    }
    let (new_width, new_height) = scaled_dimensions(width, height, max_side);
    image::imageops::resize(&image, new_width, new_height, FilterType::Lanczos3)
}

pub(crate) fn scaled_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_side);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_side);
    (new_width, new_height)
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, NormalizeError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality.clamp(1, 100));
    encoder
        .encode_image(image)
        .map_err(NormalizeError::Encode)?;
    Ok(bytes)
}
