//! Bitmap compression
//!
//! Tiles are kept compressed while they are not needed on screen. The codec
//! is pluggable; [`PngCodec`] is the lossless default.

use crate::bitmap::Bitmap;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors from encoding or decoding a bitmap
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode bitmap: {0}")]
    Encode(String),

    #[error("failed to decode bitmap: {0}")]
    Decode(String),

    #[error("pixel buffer of {len} bytes does not match {width}x{height} RGBA")]
    InvalidDimensions { width: u32, height: u32, len: usize },
}

/// Turns decoded bitmaps into byte buffers and back
pub trait BitmapCodec: Send + Sync {
    fn encode(&self, bitmap: &Bitmap) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, CodecError>;
}

/// PNG compression effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Fastest encode, larger output
    #[default]
    Fast,
    Default,
    /// Smallest output, slowest encode
    Best,
}

impl PngCompression {
    pub fn as_str(&self) -> &'static str {
        match self {
            PngCompression::Fast => "fast",
            PngCompression::Default => "default",
            PngCompression::Best => "best",
        }
    }

    fn compression_type(self) -> CompressionType {
        match self {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

impl FromStr for PngCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(PngCompression::Fast),
            "default" => Ok(PngCompression::Default),
            "best" => Ok(PngCompression::Best),
            other => Err(format!("unknown PNG compression level: {}", other)),
        }
    }
}

/// Lossless PNG codec
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec {
    compression: PngCompression,
}

impl PngCodec {
    pub fn new(compression: PngCompression) -> Self {
        Self { compression }
    }

    pub fn compression(&self) -> PngCompression {
        self.compression
    }
}

impl BitmapCodec for PngCodec {
    fn encode(&self, bitmap: &Bitmap) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            &mut bytes,
            self.compression.compression_type(),
            FilterType::Adaptive,
        );
        encoder
            .write_image(
                bitmap.pixels(),
                bitmap.width(),
                bitmap.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, CodecError> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|e| CodecError::Decode(e.to_string()))?
            .into_rgba8();
        let (width, height) = image.dimensions();
        Bitmap::from_rgba(width, height, image.into_raw())
    }
}
