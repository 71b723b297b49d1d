// THEORY:
// The `PixelBuffer` is the most basic data container in the coin pipeline. Every
// stage reads one and writes another: the RGB frame, the HSV frame, each band mask,
// the cleaned mask and the final label map are all `PixelBuffer`s.
//
// Key architectural principles:
// 1.  **Owned, Contiguous Storage**: A buffer owns a single `Vec<u8>` laid out in
//     row-major order. Rows may be padded (`stride >= width * channels`), so all
//     indexing goes through `index`, never through ad-hoc `y * width + x` math.
// 2.  **Bounds-Checked Access**: `get`, `set` and `rgb_at` never panic on an
//     out-of-range coordinate. Stages that need a border convention (morphology,
//     labeling) state it explicitly instead of relying on raster-order tricks.
// 3.  **Fallible Allocation**: Frame-sized allocations go through `try_reserve`, so
//     running out of memory becomes a `VisionError::Allocation` that aborts one frame
//     instead of the whole process.
// 4.  **No Aliasing Across Stages**: A stage that wants to keep a buffer clones it.
//     Nothing in the pipeline hands out a mutable view of a buffer it does not own.

use crate::error::VisionError;
use image::{GrayImage, RgbImage};

/// Sample value used for foreground pixels in binary masks.
pub const FOREGROUND: u8 = 255;
/// Sample value used for background pixels in binary masks.
pub const BACKGROUND: u8 = 0;

/// Allocates a vector of `len` copies of `value`, reporting allocation failure as an error.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>, VisionError> {
    let bytes = len.saturating_mul(std::mem::size_of::<T>());
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| VisionError::Allocation { bytes })?;
    data.resize(len, value);
    Ok(data)
}

/// An owned rectangular grid of 8-bit samples with 1 (binary/gray) or 3 (RGB/HSV) channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    channels: u8,
    /// Maximum sample level. Always 255 for buffers created by the pipeline.
    levels: u8,
    /// Bytes per row, including any padding.
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates a zeroed buffer with tightly packed rows.
    pub fn new(width: u32, height: u32, channels: u8) -> Result<Self, VisionError> {
        let stride = Self::packed_stride(width, channels)?;
        Self::with_stride(width, height, channels, stride)
    }

    /// Allocates a zeroed buffer whose rows are `stride` bytes apart.
    pub fn with_stride(
        width: u32,
        height: u32,
        channels: u8,
        stride: usize,
    ) -> Result<Self, VisionError> {
        let packed = Self::packed_stride(width, channels)?;
        if height == 0 {
            return Err(VisionError::InvalidBuffer("height must be non-zero".into()));
        }
        if stride < packed {
            return Err(VisionError::InvalidBuffer(format!(
                "stride {stride} is smaller than width * channels ({packed})"
            )));
        }
        let len = stride
            .checked_mul(height as usize)
            .ok_or_else(|| VisionError::InvalidBuffer("buffer size overflows usize".into()))?;
        Ok(Self {
            width,
            height,
            channels,
            levels: u8::MAX,
            stride,
            data: try_filled(len, 0u8)?,
        })
    }

    /// Wraps tightly packed row-major samples.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: Vec<u8>,
    ) -> Result<Self, VisionError> {
        let stride = Self::packed_stride(width, channels)?;
        if height == 0 {
            return Err(VisionError::InvalidBuffer("height must be non-zero".into()));
        }
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(VisionError::InvalidBuffer(format!(
                "expected {expected} samples, found {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            levels: u8::MAX,
            stride,
            data,
        })
    }

    /// Copies an `image` RGB frame into a new 3-channel buffer.
    pub fn from_rgb_image(image: &RgbImage) -> Result<Self, VisionError> {
        Self::from_raw(image.width(), image.height(), 3, image.as_raw().clone())
    }

    /// Copies an `image` grayscale frame into a new 1-channel buffer.
    pub fn from_gray_image(image: &GrayImage) -> Result<Self, VisionError> {
        Self::from_raw(image.width(), image.height(), 1, image.as_raw().clone())
    }

    /// Converts a 3-channel buffer back into an `image` RGB frame, dropping row padding.
    pub fn to_rgb_image(&self) -> Result<RgbImage, VisionError> {
        self.ensure_channels(3)?;
        RgbImage::from_raw(self.width, self.height, self.packed_rows())
            .ok_or_else(|| VisionError::InvalidBuffer("RGB sample count mismatch".into()))
    }

    /// Converts a 1-channel buffer back into an `image` grayscale frame.
    pub fn to_gray_image(&self) -> Result<GrayImage, VisionError> {
        self.ensure_channels(1)?;
        GrayImage::from_raw(self.width, self.height, self.packed_rows())
            .ok_or_else(|| VisionError::InvalidBuffer("gray sample count mismatch".into()))
    }

    fn packed_stride(width: u32, channels: u8) -> Result<usize, VisionError> {
        if width == 0 {
            return Err(VisionError::InvalidBuffer("width must be non-zero".into()));
        }
        if channels != 1 && channels != 3 {
            return Err(VisionError::InvalidBuffer(format!(
                "unsupported channel count {channels}"
            )));
        }
        Ok(width as usize * channels as usize)
    }

    fn packed_rows(&self) -> Vec<u8> {
        let row_len = self.width as usize * self.channels as usize;
        let mut packed = Vec::with_capacity(row_len * self.height as usize);
        for row in (0..self.height).filter_map(|y| self.row(y)) {
            packed.extend_from_slice(row);
        }
        packed
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn levels(&self) -> u8 {
        self.levels
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The visible samples of row `y`, without padding, or `None` below the last row.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride;
        self.data.get(start..start + self.width as usize * self.channels as usize)
    }

    /// Byte offset of channel 0 of pixel (x, y), or `None` outside the image.
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        Some(y as usize * self.stride + x as usize * self.channels as usize)
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64, channel: u8) -> Option<u8> {
        if channel >= self.channels {
            return None;
        }
        self.index(x, y).map(|i| self.data[i + channel as usize])
    }

    /// Writes one sample. Out-of-range writes are ignored and reported as `false`.
    #[inline]
    pub fn set(&mut self, x: i64, y: i64, channel: u8, value: u8) -> bool {
        if channel >= self.channels {
            return false;
        }
        match self.index(x, y) {
            Some(i) => {
                self.data[i + channel as usize] = value;
                true
            }
            None => false,
        }
    }

    /// The three samples of pixel (x, y) of a 3-channel buffer.
    pub fn rgb_at(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        if self.channels != 3 {
            return None;
        }
        self.index(x, y)
            .map(|i| [self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    pub fn set_rgb(&mut self, x: i64, y: i64, rgb: [u8; 3]) -> bool {
        if self.channels != 3 {
            return false;
        }
        match self.index(x, y) {
            Some(i) => {
                self.data[i..i + 3].copy_from_slice(&rgb);
                true
            }
            None => false,
        }
    }

    /// True when (x, y) is inside the image and its first sample is non-zero.
    #[inline]
    pub fn is_foreground(&self, x: i64, y: i64) -> bool {
        self.get(x, y, 0).is_some_and(|v| v != BACKGROUND)
    }

    /// Number of non-zero pixels in a 1-channel buffer.
    pub fn count_foreground(&self) -> usize {
        (0..self.height)
            .filter_map(|y| self.row(y))
            .map(|row| row.iter().filter(|&&v| v != BACKGROUND).count())
            .sum()
    }

    pub fn ensure_channels(&self, expected: u8) -> Result<(), VisionError> {
        if self.channels != expected {
            return Err(VisionError::ChannelMismatch {
                expected,
                found: self.channels,
            });
        }
        Ok(())
    }

    /// Fails unless `other` has the same width and height as `self`.
    pub fn ensure_same_size(&self, other: &PixelBuffer) -> Result<(), VisionError> {
        if self.width != other.width || self.height != other.height {
            return Err(VisionError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                found_width: other.width,
                found_height: other.height,
            });
        }
        Ok(())
    }

    /// Fails unless `other` has the same width, height and channel count as `self`.
    pub fn ensure_same_shape(&self, other: &PixelBuffer) -> Result<(), VisionError> {
        self.ensure_same_size(other)?;
        other.ensure_channels(self.channels)
    }
}
