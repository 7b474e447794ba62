// SPDX-License-Identifier: MIT
//! # Coordinate Lookup Tables
//!
//! Precomputed mapping from every output cell to the source pixels that feed
//! it. A table is built once per [`SensorGeometry`] and reused for every frame;
//! the per-frame work in [`crate::logpolar`] is then a gather of weighted taps.
//!
//! ## Forward table (Cartesian → log-polar)
//!
//! Output is `angles × eccentricities` (one row per ring). Each cell is placed
//! at its ring/sector center (see [`crate::geometry`]).
//!
//! - **overlap = 1.0**: one tap, the source pixel containing the cell center.
//! - **overlap > 1.0**: a separable tent (bilinear-like) kernel whose half
//!   width is `overlap/2` times the cell footprint, never narrower than one
//!   pixel. With a half width of exactly one pixel this is plain bilinear
//!   interpolation.
//!
//! ## Inverse table (log-polar → Cartesian)
//!
//! Output is the Cartesian source size. Each pixel reads the cell covering it:
//! nearest cell for overlap = 1.0, bilinear over the four surrounding cells
//! otherwise. Sectors wrap around the full turn; rings clamp, so the fovea
//! takes the innermost ring.
//!
//! ## Edge policy
//!
//! Coordinates outside the source grid are clamped to the nearest border
//! pixel. Weights of each cell are normalized to sum to 1.
//!
//! ## Layout
//!
//! Taps are stored flat (`taps`) with a prefix-offset array (`offsets`) so a
//! cell's taps are `taps[offsets[c]..offsets[c + 1]]`. Tap indices are pixel
//! indices (`y * w + x`) into the table's source grid.

use log::debug;

use crate::error::MapError;
use crate::geometry::{RingLayout, SensorGeometry, Size};

/// Which way a table maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableDirection {
    /// Cartesian source → log-polar destination.
    CartesianToLogPolar,
    /// Log-polar source → Cartesian destination.
    LogPolarToCartesian,
}

/// One weighted source contribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tap {
    /// Pixel index `y * w + x` in the table's source grid.
    pub index: u32,
    pub weight: f32,
}

/// Direction-tagged lookup table bound to the geometry it was built from.
#[derive(Clone, Debug)]
pub struct LookupTable {
    direction: TableDirection,
    geometry: SensorGeometry,
    src: Size,
    dst: Size,
    offsets: Vec<u32>,
    taps: Vec<Tap>,
    /// True when every cell has a single tap of weight 1.
    single_tap: bool,
}

impl LookupTable {
    /// Validate the parameters and build a table.
    ///
    /// # Errors
    /// [`MapError::Configuration`] for any parameter rejected by
    /// [`SensorGeometry::new`].
    pub fn build(
        direction: TableDirection,
        source: Size,
        eccentricities: u32,
        angles: u32,
        fovea: u32,
        overlap: f64,
    ) -> Result<Self, MapError> {
        let geometry = SensorGeometry::new(source, eccentricities, angles, fovea, overlap)?;
        Ok(Self::for_geometry(direction, &geometry))
    }

    /// Build a table for an already validated geometry.
    ///
    /// # Performance
    /// O(cells × neighborhood) time; runs once per geometry.
    pub fn for_geometry(direction: TableDirection, geometry: &SensorGeometry) -> Self {
        let layout = geometry.layout();
        let (src, dst) = match direction {
            TableDirection::CartesianToLogPolar => (geometry.source(), geometry.logpolar_size()),
            TableDirection::LogPolarToCartesian => (geometry.logpolar_size(), geometry.source()),
        };
        let mut builder = TableBuilder::with_capacity(dst.pixels());
        match direction {
            TableDirection::CartesianToLogPolar => build_forward(&mut builder, geometry, &layout),
            TableDirection::LogPolarToCartesian => build_inverse(&mut builder, geometry, &layout),
        }
        let single_tap = geometry.overlap() <= 1.0;
        debug!(
            "built {:?} table {} -> {}: {} taps (max {} per cell), {} clamped",
            direction,
            src,
            dst,
            builder.taps.len(),
            builder.max_taps,
            builder.clamped
        );
        Self {
            direction,
            geometry: *geometry,
            src,
            dst,
            offsets: builder.offsets,
            taps: builder.taps,
            single_tap,
        }
    }

    pub fn direction(&self) -> TableDirection {
        self.direction
    }

    pub fn geometry(&self) -> &SensorGeometry {
        &self.geometry
    }

    /// Size of the grid the taps index into.
    pub fn source_size(&self) -> Size {
        self.src
    }

    /// Size of the grid produced by applying the table.
    pub fn dest_size(&self) -> Size {
        self.dst
    }

    pub fn cells(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn total_taps(&self) -> usize {
        self.taps.len()
    }

    pub fn is_single_tap(&self) -> bool {
        self.single_tap
    }

    /// Taps of destination cell `cell` (row-major in the destination grid).
    #[inline]
    pub fn taps(&self, cell: usize) -> &[Tap] {
        let a = self.offsets[cell] as usize;
        let b = self.offsets[cell + 1] as usize;
        &self.taps[a..b]
    }

    /// Taps of the destination cell at `(x, y)`.
    pub fn taps_at(&self, x: u32, y: u32) -> &[Tap] {
        self.taps((y as usize) * (self.dst.w as usize) + x as usize)
    }
}

struct TableBuilder {
    offsets: Vec<u32>,
    taps: Vec<Tap>,
    max_taps: usize,
    clamped: usize,
}

impl TableBuilder {
    fn with_capacity(cells: usize) -> Self {
        let mut offsets = Vec::with_capacity(cells + 1);
        offsets.push(0);
        Self {
            offsets,
            taps: Vec::with_capacity(cells),
            max_taps: 0,
            clamped: 0,
        }
    }

    fn cell_start(&self) -> usize {
        *self.offsets.last().unwrap_or(&0) as usize
    }

    /// Add a tap to the current cell. The caller guarantees `index` is not
    /// already in the cell.
    fn push(&mut self, index: u32, weight: f64) {
        if weight > 0.0 {
            self.taps.push(Tap {
                index,
                weight: weight as f32,
            });
        }
    }

    /// Add a tap to the current cell, merging with an existing tap on the same pixel.
    fn merge(&mut self, index: u32, weight: f64) {
        if weight <= 0.0 {
            return;
        }
        let start = self.cell_start();
        match self.taps[start..].iter_mut().find(|t| t.index == index) {
            Some(t) => t.weight += weight as f32,
            None => self.push(index, weight),
        }
    }

    /// Normalize the current cell's weights and close it.
    fn finish_cell(&mut self) {
        let start = self.cell_start();
        let cell = &mut self.taps[start..];
        let sum: f64 = cell.iter().map(|t| f64::from(t.weight)).sum();
        if sum > 0.0 {
            for t in cell.iter_mut() {
                t.weight = (f64::from(t.weight) / sum) as f32;
            }
        }
        self.max_taps = self.max_taps.max(cell.len());
        self.offsets.push(self.taps.len() as u32);
    }
}

#[inline]
fn clamp_index(v: i64, len: u32, clamped: &mut usize) -> u32 {
    let hi = i64::from(len) - 1;
    if v < 0 || v > hi {
        *clamped += 1;
    }
    v.clamp(0, hi) as u32
}

fn build_forward(b: &mut TableBuilder, g: &SensorGeometry, layout: &RingLayout) {
    let src = g.source();
    let overlap = g.overlap();
    let mut wx: Vec<(u32, f64)> = Vec::new();
    let mut wy: Vec<(u32, f64)> = Vec::new();

    for ring in 0..g.eccentricities() {
        let radial = layout.ring_width(ring);
        let arc = layout.radius(f64::from(ring) + 0.5) * layout.d_theta;
        let half = (0.5 * overlap * (radial * arc).sqrt()).max(1.0);

        for sector in 0..g.angles() {
            let (x, y) = layout.cell_center(ring, sector);
            if overlap <= 1.0 {
                let ix = clamp_index(x.floor() as i64, src.w, &mut b.clamped);
                let iy = clamp_index(y.floor() as i64, src.h, &mut b.clamped);
                b.push(iy * src.w + ix, 1.0);
            } else {
                // Pixel i has its center at i + 0.5.
                tent_weights(x - 0.5, half, src.w, &mut wx, &mut b.clamped);
                tent_weights(y - 0.5, half, src.h, &mut wy, &mut b.clamped);
                // Unique indices per axis give unique products.
                for &(iy, wyv) in &wy {
                    for &(ix, wxv) in &wx {
                        b.push(iy * src.w + ix, wyv * wxv);
                    }
                }
            }
            b.finish_cell();
        }
    }
}

/// 1D tent kernel centered at `u` (pixel-center units) with half width `half`,
/// clamped to `[0, len)` and merged so indices are unique and ascending.
fn tent_weights(u: f64, half: f64, len: u32, out: &mut Vec<(u32, f64)>, clamped: &mut usize) {
    out.clear();
    let lo = (u - half).ceil() as i64;
    let hi = (u + half).floor() as i64;
    for i in lo..=hi {
        let w = 1.0 - ((i as f64) - u).abs() / half;
        if w <= 0.0 {
            continue;
        }
        let idx = clamp_index(i, len, clamped);
        match out.last_mut() {
            Some(last) if last.0 == idx => last.1 += w,
            _ => out.push((idx, w)),
        }
    }
    if out.is_empty() {
        out.push((clamp_index(u.round() as i64, len, clamped), 1.0));
    }
}

fn build_inverse(b: &mut TableBuilder, g: &SensorGeometry, layout: &RingLayout) {
    let lp = g.logpolar_size();
    let src = g.source();
    let last_ring = f64::from(lp.h - 1);
    let nang = i64::from(lp.w);
    let wrap = |s: i64| s.rem_euclid(nang) as u32;

    for py in 0..src.h {
        for px in 0..src.w {
            let (ring_f, sector_f) =
                layout.cell_of(f64::from(px) + 0.5, f64::from(py) + 0.5);
            if ring_f < 0.0 || ring_f > last_ring {
                b.clamped += 1;
            }
            let ring_f = ring_f.clamp(0.0, last_ring);

            if g.overlap() <= 1.0 {
                let ring = ring_f.round() as u32;
                let sector = wrap(sector_f.round() as i64);
                b.push(ring * lp.w + sector, 1.0);
            } else {
                let r0 = ring_f.floor();
                let fr = ring_f - r0;
                let r0 = r0 as u32;
                let r1 = (r0 + 1).min(lp.h - 1);
                let s0 = sector_f.floor();
                let fs = sector_f - s0;
                let s0 = s0 as i64;
                let (a0, a1) = (wrap(s0), wrap(s0 + 1));
                // Sectors wrap and rings clamp, so corners can coincide.
                b.merge(r0 * lp.w + a0, (1.0 - fr) * (1.0 - fs));
                b.merge(r0 * lp.w + a1, (1.0 - fr) * fs);
                b.merge(r1 * lp.w + a0, fr * (1.0 - fs));
                b.merge(r1 * lp.w + a1, fr * fs);
                if b.cell_start() == b.taps.len() {
                    b.push(r0 * lp.w + a0, 1.0);
                }
            }
            b.finish_cell();
        }
    }
}
