// SPDX-License-Identifier: MIT
// Cartesian -> Cartesian formatter: identity copy, exact 2:1 decimation,
// and a fast_image_resize (SIMD) nearest-neighbor fallback for everything else.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x3;
use fir::{ResizeAlg, ResizeOptions, Resizer};

use crate::error::MapError;
use crate::frame::RgbFrame;
use crate::geometry::{Size, BYTES_PER_PIXEL};

/// Which path [`RectResizer::apply`] took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RectPath {
    /// Zero-sized destination, nothing to do.
    Empty,
    Identity,
    Decimate2x,
    Resize,
}

/// Pick the path for a source/destination pair. Most specific first.
pub fn classify(src: Size, dst: Size) -> RectPath {
    if dst.is_empty() {
        RectPath::Empty
    } else if src == dst {
        RectPath::Identity
    } else if src.w == dst.w * 2 && src.h == dst.h * 2 {
        RectPath::Decimate2x
    } else {
        RectPath::Resize
    }
}

/// Rectangular formatter. Keeps one [`Resizer`] alive across frames.
pub struct RectResizer {
    resizer: Resizer,
    opts: ResizeOptions,
}

impl Default for RectResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RectResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            // Single-pass nearest-neighbor; switch to Convolution for filtered output.
            opts: ResizeOptions::new().resize_alg(ResizeAlg::Nearest),
        }
    }

    /// Format `src` into `dst` at `dst`'s current size.
    ///
    /// # Errors
    /// [`MapError::UnsupportedSourceState`] if `src` is empty while `dst` is not.
    pub fn apply(&mut self, src: &RgbFrame, dst: &mut RgbFrame) -> Result<RectPath, MapError> {
        let path = classify(src.size(), dst.size());
        if path != RectPath::Empty && src.is_empty() {
            return Err(MapError::UnsupportedSourceState("rectangular source frame is empty"));
        }
        match path {
            RectPath::Empty => {}
            RectPath::Identity => dst.as_bytes_mut().copy_from_slice(src.as_bytes()),
            RectPath::Decimate2x => decimate_2x(src, dst),
            RectPath::Resize => {
                let s = src.size();
                let d = dst.size();
                let src_view = TypedImageRef::<U8x3>::from_buffer(s.w, s.h, src.as_bytes())?;
                let mut dst_view = TypedImage::<U8x3>::from_buffer(d.w, d.h, dst.as_bytes_mut())?;
                self.resizer
                    .resize_typed::<U8x3>(&src_view, &mut dst_view, &self.opts)?;
            }
        }
        Ok(path)
    }
}

/// Every second pixel of every second row.
fn decimate_2x(src: &RgbFrame, dst: &mut RgbFrame) {
    let w = dst.width() as usize;
    for j in 0..dst.height() {
        let s = src.row(j * 2);
        let d = dst.row_mut(j);
        for k in 0..w {
            let si = k * 2 * BYTES_PER_PIXEL;
            let di = k * BYTES_PER_PIXEL;
            d[di..di + BYTES_PER_PIXEL].copy_from_slice(&s[si..si + BYTES_PER_PIXEL]);
        }
    }
}
