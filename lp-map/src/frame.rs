// SPDX-License-Identifier: MIT
// RGB8 frame buffer: row-major, 3 interleaved bytes per pixel, stride = w*3.

use crate::error::MapError;
use crate::geometry::{Size, BYTES_PER_PIXEL};

/// Owned, tightly packed RGB8 image.
///
/// The buffer length always equals `size.w * size.h * 3`; the only way to
/// change the size is [`RgbFrame::resize`], which reallocates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgbFrame {
    size: Size,
    data: Vec<u8>,
}

impl RgbFrame {
    /// Black frame of the given size.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            data: vec![0u8; size.byte_len()],
        }
    }

    /// Wrap an existing tightly packed buffer.
    pub fn from_raw(size: Size, data: Vec<u8>) -> Result<Self, MapError> {
        if data.len() != size.byte_len() {
            return Err(MapError::DimensionMismatch {
                what: "raw frame buffer",
                expected: size,
                actual: Size::new(size.w, (data.len() / size.stride().max(1)) as u32),
            });
        }
        Ok(Self { size, data })
    }

    /// Frame filled by `f(x, y)`.
    pub fn from_fn(size: Size, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        let mut frame = Self::new(size);
        for y in 0..size.h {
            for x in 0..size.w {
                frame.put_pixel(x, y, f(x, y));
            }
        }
        frame
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.w
    }

    pub fn height(&self) -> u32 {
        self.size.h
    }

    pub fn stride(&self) -> usize {
        self.size.stride()
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let s = self.stride();
        let off = (y as usize) * s;
        &self.data[off..off + s]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let s = self.stride();
        let off = (y as usize) * s;
        &mut self.data[off..off + s]
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = (y as usize) * self.stride() + (x as usize) * BYTES_PER_PIXEL;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, px: [u8; 3]) {
        let i = (y as usize) * self.stride() + (x as usize) * BYTES_PER_PIXEL;
        self.data[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
    }

    /// Reallocate to `size` if it differs; contents are zeroed on change.
    pub fn resize(&mut self, size: Size) {
        if self.size != size {
            self.size = size;
            self.data.clear();
            self.data.resize(size.byte_len(), 0);
        }
    }

    /// Copy `other` into `self`, reusing the allocation when sizes match.
    pub fn copy_from(&mut self, other: &RgbFrame) {
        self.resize(other.size);
        self.data.copy_from_slice(&other.data);
    }

    pub(crate) fn expect_size(&self, what: &'static str, expected: Size) -> Result<(), MapError> {
        if self.size != expected {
            return Err(MapError::mismatch(what, expected, self.size));
        }
        Ok(())
    }
}
