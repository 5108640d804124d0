//! Frame buffers submitted for recognition
//!
//! A [`FrameBuffer`] is an owned copy of raw pixel data plus the geometry the
//! engine needs to interpret it. The pixel format is not passed explicitly;
//! it is inferred from the stride-to-width ratio the same way the engine's
//! buffer interface expects it.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Pixel layouts accepted by the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit single channel, stride == width
    Grayscale,
    /// 24-bit RGB, stride == 3 * width
    Rgb,
    /// 32-bit ARGB, stride == 4 * width
    Argb,
}

impl PixelFormat {
    /// Infer the format from the stride-to-width ratio.
    ///
    /// Equal means grayscale, 3x means RGB, 4x means ARGB; anything else is
    /// not a layout the engine understands.
    pub fn from_stride(width: u32, stride: u32) -> Result<Self, ScanError> {
        if stride == width {
            Ok(PixelFormat::Grayscale)
        } else if stride == width * 3 {
            Ok(PixelFormat::Rgb)
        } else if stride == width * 4 {
            Ok(PixelFormat::Argb)
        } else {
            Err(ScanError::UnsupportedStride { width, stride })
        }
    }

    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Grayscale => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Argb => 4,
        }
    }
}

/// An owned pixel buffer queued for one recognition attempt.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
}

impl FrameBuffer {
    /// Build a frame from raw bytes and geometry, inferring the pixel format.
    ///
    /// Rejects stride ratios the engine does not support and buffers whose
    /// length disagrees with `stride * height`; no engine call is attempted
    /// for either.
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32, stride: u32) -> Result<Self, ScanError> {
        let format = PixelFormat::from_stride(width, stride)?;

        let expected = stride as usize * height as usize;
        if data.len() != expected {
            return Err(ScanError::BufferSize {
                actual: data.len(),
                expected,
                stride,
                height,
            });
        }

        Ok(Self {
            data,
            width,
            height,
            stride,
            format,
        })
    }

    /// Copy pixels out of a decoded image.
    ///
    /// Grayscale images stay single-channel; everything else is flattened to
    /// tightly packed RGB, which is what the engine's recognition profile is
    /// tuned for.
    pub fn from_image(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageLuma8(gray) => Self {
                data: gray.as_raw().clone(),
                width: gray.width(),
                height: gray.height(),
                stride: gray.width(),
                format: PixelFormat::Grayscale,
            },
            other => {
                let rgb = other.to_rgb8();
                let (width, height) = rgb.dimensions();
                Self {
                    data: rgb.into_raw(),
                    width,
                    height,
                    stride: width * 3,
                    format: PixelFormat::Rgb,
                }
            }
        }
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row, including any padding.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Inferred pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Total byte length of the buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
