// SPDX-License-Identifier: MIT
//! # Foveal Crop
//!
//! The fovea is sampled uniformly: a centered `F × F` window of the source is
//! copied row by row into the destination, byte for byte. No interpolation.

use crate::error::MapError;
use crate::frame::RgbFrame;
use crate::geometry::{Size, BYTES_PER_PIXEL};

/// Top-left corner `(col, row)` of the centered `fovea × fovea` window.
pub fn crop_origin(source: Size, fovea: u32) -> (u32, u32) {
    (source.w / 2 - fovea / 2, source.h / 2 - fovea / 2)
}

/// Copy the centered `dst.width() × dst.width()` window of `src` into `dst`.
///
/// The fovea side is taken from the destination, which must be square.
///
/// # Errors
/// - [`MapError::UnsupportedSourceState`] if `src` is empty.
/// - [`MapError::DimensionMismatch`] if `dst` is not square or the fovea
///   exceeds either source side. Nothing is written in that case.
pub fn crop_fovea(src: &RgbFrame, dst: &mut RgbFrame) -> Result<(), MapError> {
    if src.is_empty() {
        return Err(MapError::UnsupportedSourceState("fovea source frame is empty"));
    }
    let fov = dst.width();
    dst.expect_size("fovea destination", Size::new(fov, fov))?;
    let source = src.size();
    if fov > source.w || fov > source.h {
        return Err(MapError::mismatch(
            "fovea larger than source",
            Size::new(fov, fov),
            source,
        ));
    }

    let (col, offset) = crop_origin(source, fov);
    let row_bytes = (fov as usize) * BYTES_PER_PIXEL;
    let col_bytes = (col as usize) * BYTES_PER_PIXEL;
    for r in 0..fov {
        let s = &src.row(r + offset)[col_bytes..col_bytes + row_bytes];
        dst.row_mut(r).copy_from_slice(s);
    }
    Ok(())
}

/// Stateless foveal formatter bound to one fovea size.
#[derive(Clone, Copy, Debug)]
pub struct FovealCropper {
    fovea: u32,
}

impl FovealCropper {
    pub fn new(fovea: u32) -> Self {
        Self { fovea }
    }

    pub fn fovea(&self) -> u32 {
        self.fovea
    }

    pub fn output_size(&self) -> Size {
        Size::new(self.fovea, self.fovea)
    }

    /// Like [`crop_fovea`], additionally checking `dst` against the bound size.
    pub fn apply(&self, src: &RgbFrame, dst: &mut RgbFrame) -> Result<(), MapError> {
        dst.expect_size("fovea destination", self.output_size())?;
        crop_fovea(src, dst)
    }
}
