// SPDX-License-Identifier: MIT
//! # Log-Polar Resampling
//!
//! [`remap`] applies a [`LookupTable`] to an RGB8 frame. [`LogPolarTransform`]
//! bundles a geometry with its forward table (and optionally the inverse one)
//! so a host constructs the tables once and reuses them every frame.
//!
//! ## Performance Characteristics
//!
//! - Destination rows are processed in parallel with rayon; cells have no
//!   cross-dependencies once the table exists.
//! - Single-tap tables degenerate to a byte gather (no arithmetic).
//! - No allocation per frame; the caller owns the destination buffer.

use log::trace;
use rayon::prelude::*;

use crate::error::MapError;
use crate::frame::RgbFrame;
use crate::geometry::{SensorGeometry, Size, BYTES_PER_PIXEL};
use crate::table::{LookupTable, TableDirection};

/// Resample `src` into `dst` through `table`.
///
/// Both frames must match the table exactly; on any mismatch nothing is
/// written to `dst`. The source is never mutated, and repeated calls with the
/// same inputs produce identical bytes.
///
/// # Errors
/// - [`MapError::UnsupportedSourceState`] if `src` is empty (no frame yet).
/// - [`MapError::DimensionMismatch`] if either frame differs from the table.
pub fn remap(table: &LookupTable, src: &RgbFrame, dst: &mut RgbFrame) -> Result<(), MapError> {
    if src.is_empty() {
        return Err(MapError::UnsupportedSourceState("remap source frame is empty"));
    }
    src.expect_size("remap source", table.source_size())?;
    dst.expect_size("remap destination", table.dest_size())?;

    let cols = table.dest_size().w as usize;
    let stride = table.dest_size().stride();
    let src_bytes = src.as_bytes();
    let single = table.is_single_tap();

    dst.as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let base = y * cols;
            for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                let taps = table.taps(base + x);
                if single {
                    let i = taps[0].index as usize * BYTES_PER_PIXEL;
                    px.copy_from_slice(&src_bytes[i..i + BYTES_PER_PIXEL]);
                    continue;
                }
                let mut acc = [0f32; BYTES_PER_PIXEL];
                for tap in taps {
                    let i = tap.index as usize * BYTES_PER_PIXEL;
                    for c in 0..BYTES_PER_PIXEL {
                        acc[c] += f32::from(src_bytes[i + c]) * tap.weight;
                    }
                }
                for c in 0..BYTES_PER_PIXEL {
                    px[c] = (acc[c] + 0.5).clamp(0.0, 255.0) as u8;
                }
            }
        });
    trace!("remapped {} -> {}", src.size(), table.dest_size());
    Ok(())
}

/// Long-lived geometry + lookup table pair.
#[derive(Clone, Debug)]
pub struct LogPolarTransform {
    geometry: SensorGeometry,
    forward: LookupTable,
    inverse: Option<LookupTable>,
}

impl LogPolarTransform {
    /// Build the forward table for `geometry`.
    pub fn new(geometry: SensorGeometry) -> Self {
        let forward = LookupTable::for_geometry(TableDirection::CartesianToLogPolar, &geometry);
        Self {
            geometry,
            forward,
            inverse: None,
        }
    }

    /// Validate parameters and build the forward table.
    pub fn from_params(
        source: Size,
        eccentricities: u32,
        angles: u32,
        fovea: u32,
        overlap: f64,
    ) -> Result<Self, MapError> {
        SensorGeometry::new(source, eccentricities, angles, fovea, overlap).map(Self::new)
    }

    /// Also build the log-polar → Cartesian table.
    pub fn with_inverse(mut self) -> Self {
        self.build_inverse();
        self
    }

    /// Build the inverse table if it does not exist yet.
    pub fn build_inverse(&mut self) {
        if self.inverse.is_none() {
            self.inverse = Some(LookupTable::for_geometry(
                TableDirection::LogPolarToCartesian,
                &self.geometry,
            ));
        }
    }

    pub fn has_inverse(&self) -> bool {
        self.inverse.is_some()
    }

    pub fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    pub fn forward_table(&self) -> &LookupTable {
        &self.forward
    }

    pub fn inverse_table(&self) -> Option<&LookupTable> {
        self.inverse.as_ref()
    }

    pub fn eccentricities(&self) -> u32 {
        self.geometry.eccentricities()
    }

    pub fn angles(&self) -> u32 {
        self.geometry.angles()
    }

    pub fn fovea(&self) -> u32 {
        self.geometry.fovea()
    }

    pub fn overlap(&self) -> f64 {
        self.geometry.overlap()
    }

    /// A destination buffer sized for [`Self::cart_to_logpolar`].
    pub fn logpolar_frame(&self) -> RgbFrame {
        RgbFrame::new(self.geometry.logpolar_size())
    }

    /// A destination buffer sized for [`Self::logpolar_to_cart`].
    pub fn cartesian_frame(&self) -> RgbFrame {
        RgbFrame::new(self.geometry.source())
    }

    pub fn cart_to_logpolar(&self, src: &RgbFrame, dst: &mut RgbFrame) -> Result<(), MapError> {
        remap(&self.forward, src, dst)
    }

    /// # Errors
    /// [`MapError::Configuration`] when the inverse table was never built, plus
    /// everything [`remap`] reports.
    pub fn logpolar_to_cart(&self, lp: &RgbFrame, dst: &mut RgbFrame) -> Result<(), MapError> {
        let table = self
            .inverse
            .as_ref()
            .ok_or_else(|| MapError::config("direction", "inverse table not built"))?;
        remap(table, lp, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(overlap: f64) -> SensorGeometry {
        SensorGeometry::new(Size::new(64, 48), 12, 24, 16, overlap).unwrap()
    }

    fn gradient(size: Size) -> RgbFrame {
        RgbFrame::from_fn(size, |x, y| [(x * 3) as u8, (y * 5) as u8, ((x + y) % 256) as u8])
    }

    #[test]
    fn nearest_remap_copies_table_pixels() {
        let t = LogPolarTransform::new(geometry(1.0));
        let src = gradient(Size::new(64, 48));
        let mut dst = t.logpolar_frame();
        t.cart_to_logpolar(&src, &mut dst).unwrap();
        let table = t.forward_table();
        for y in 0..dst.height() {
            for x in 0..dst.width() {
                let idx = table.taps_at(x, y)[0].index;
                assert_eq!(dst.pixel(x, y), src.pixel(idx % 64, idx / 64));
            }
        }
    }

    #[test]
    fn uniform_source_stays_uniform_with_overlap() {
        let t = LogPolarTransform::new(geometry(3.0));
        let src = RgbFrame::from_fn(Size::new(64, 48), |_, _| [10, 200, 77]);
        let mut dst = t.logpolar_frame();
        t.cart_to_logpolar(&src, &mut dst).unwrap();
        assert!(dst.as_bytes().chunks_exact(3).all(|p| p == [10, 200, 77]));
    }

    #[test]
    fn wrong_source_size_leaves_destination_untouched() {
        let t = LogPolarTransform::new(geometry(1.0));
        let src = gradient(Size::new(32, 48));
        let mut dst = t.logpolar_frame();
        dst.as_bytes_mut().fill(42);
        let err = t.cart_to_logpolar(&src, &mut dst).unwrap_err();
        assert!(matches!(err, MapError::DimensionMismatch { .. }));
        assert!(dst.as_bytes().iter().all(|&b| b == 42));
    }

    #[test]
    fn empty_source_is_unsupported_state() {
        let t = LogPolarTransform::new(geometry(1.0));
        let mut dst = t.logpolar_frame();
        let err = t.cart_to_logpolar(&RgbFrame::default(), &mut dst).unwrap_err();
        assert!(matches!(err, MapError::UnsupportedSourceState(_)));
    }

    #[test]
    fn inverse_requires_table() {
        let mut t = LogPolarTransform::new(geometry(1.0));
        let lp = gradient(Size::new(24, 12));
        let mut cart = t.cartesian_frame();
        assert!(t.logpolar_to_cart(&lp, &mut cart).is_err());
        t.build_inverse();
        t.logpolar_to_cart(&lp, &mut cart).unwrap();
    }

    #[test]
    fn inverse_of_uniform_logpolar_is_uniform() {
        let t = LogPolarTransform::new(geometry(2.0)).with_inverse();
        let lp = RgbFrame::from_fn(Size::new(24, 12), |_, _| [9, 99, 199]);
        let mut cart = t.cartesian_frame();
        t.logpolar_to_cart(&lp, &mut cart).unwrap();
        assert!(cart.as_bytes().chunks_exact(3).all(|p| p == [9, 99, 199]));
    }
}
