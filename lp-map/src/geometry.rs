// SPDX-License-Identifier: MIT
//! # Sensor Geometry
//!
//! Fixed configuration of a foveated sensor: the Cartesian source size plus the
//! shape of the log-polar grid sampled from it. A [`SensorGeometry`] can only be
//! obtained through [`SensorGeometry::new`], so every value in circulation has
//! passed validation and lookup tables can trust it.
//!
//! ## Coordinate conventions
//!
//! - Pixel `(x, y)` covers the continuous square `[x, x+1) × [y, y+1)`.
//! - The sensor center is `(w/2, h/2)` in continuous coordinates.
//! - Angle is measured counter-clockwise from the +x axis, so image `y` grows
//!   opposite to `sin θ`.
//! - Ring `r` spans radii `[ρmin·kʳ, ρmin·kʳ⁺¹)` with `ρmin` the fovea
//!   boundary and `ρmin·kᴺ` the inscribed radius of the source (`N` rings).

use crate::error::MapError;

/// Bytes per pixel of every buffer handled here (interleaved RGB8).
pub const BYTES_PER_PIXEL: usize = 3;

/// Acquisition size of the reference sensor.
pub const REFERENCE_SOURCE: Size = Size { w: 640, h: 480 };
/// Ring count of the reference log-polar sensor (multiple of 6 for the foveal arrangement).
pub const DEFAULT_ECCENTRICITIES: u32 = 156;
/// Sector count of the reference log-polar sensor.
pub const DEFAULT_ANGLES: u32 = 252;
/// Side of the reference fovea.
pub const DEFAULT_FOVEA: u32 = 128;
/// Non-overlapping receptive fields.
pub const DEFAULT_OVERLAP: f64 = 1.0;

// `SensorGeometry::default` skips `new`, so the reference constants are checked here.
const _: () = {
    assert!(DEFAULT_ECCENTRICITIES > 0 && DEFAULT_ECCENTRICITIES % 6 == 0);
    assert!(DEFAULT_ANGLES > 0);
    assert!(DEFAULT_FOVEA > 0);
    assert!(DEFAULT_FOVEA <= REFERENCE_SOURCE.w && DEFAULT_FOVEA <= REFERENCE_SOURCE.h);
    assert!(DEFAULT_OVERLAP >= 1.0);
};

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn pixels(&self) -> usize {
        (self.w as usize) * (self.h as usize)
    }

    /// Tightly packed row length in bytes.
    pub fn stride(&self) -> usize {
        (self.w as usize) * BYTES_PER_PIXEL
    }

    pub fn byte_len(&self) -> usize {
        self.pixels() * BYTES_PER_PIXEL
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Immutable description of a foveated sensor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorGeometry {
    source: Size,
    eccentricities: u32,
    angles: u32,
    fovea: u32,
    overlap: f64,
}

impl SensorGeometry {
    /// Validate and build a geometry.
    ///
    /// # Errors
    /// [`MapError::Configuration`] when:
    /// - the source is empty,
    /// - `eccentricities` is not a positive multiple of 6,
    /// - `angles` is zero,
    /// - `fovea` is zero or larger than the shorter source side,
    /// - `overlap` is below 1.0 or not finite.
    pub fn new(
        source: Size,
        eccentricities: u32,
        angles: u32,
        fovea: u32,
        overlap: f64,
    ) -> Result<Self, MapError> {
        if source.is_empty() {
            return Err(MapError::config("source", format!("empty source size {}", source)));
        }
        if eccentricities == 0 || eccentricities % 6 != 0 {
            return Err(MapError::config(
                "eccentricities",
                format!("{} is not a positive multiple of 6", eccentricities),
            ));
        }
        if angles == 0 {
            return Err(MapError::config("angles", "must be greater than 0"));
        }
        let short_side = source.w.min(source.h);
        if fovea == 0 || fovea > short_side {
            return Err(MapError::config(
                "fovea",
                format!("{} must be within 1..={} for a {} source", fovea, short_side, source),
            ));
        }
        if !overlap.is_finite() || overlap < 1.0 {
            return Err(MapError::config(
                "overlap",
                format!("{} must be a finite value >= 1.0", overlap),
            ));
        }
        Ok(Self {
            source,
            eccentricities,
            angles,
            fovea,
            overlap,
        })
    }

    pub fn source(&self) -> Size {
        self.source
    }

    pub fn eccentricities(&self) -> u32 {
        self.eccentricities
    }

    pub fn angles(&self) -> u32 {
        self.angles
    }

    pub fn fovea(&self) -> u32 {
        self.fovea
    }

    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    /// Log-polar image size: one column per sector, one row per ring.
    pub fn logpolar_size(&self) -> Size {
        Size::new(self.angles, self.eccentricities)
    }

    pub fn fovea_size(&self) -> Size {
        Size::new(self.fovea, self.fovea)
    }

    pub(crate) fn layout(&self) -> RingLayout {
        RingLayout::new(self)
    }
}

impl Default for SensorGeometry {
    /// Reference sensor: 156 rings × 252 sectors over a
    /// 640×480 source with a 128 pixel fovea.
    fn default() -> Self {
        Self {
            source: REFERENCE_SOURCE,
            eccentricities: DEFAULT_ECCENTRICITIES,
            angles: DEFAULT_ANGLES,
            fovea: DEFAULT_FOVEA,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Derived radial/angular parameters of a geometry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RingLayout {
    pub cx: f64,
    pub cy: f64,
    pub rho_min: f64,
    pub rho_max: f64,
    /// `ln k`, zero when the fovea already reaches the inscribed radius.
    pub log_growth: f64,
    pub d_theta: f64,
}

impl RingLayout {
    fn new(g: &SensorGeometry) -> Self {
        let src = g.source;
        let rho_max = f64::from(src.w.min(src.h)) / 2.0;
        let rho_min = (f64::from(g.fovea) / 2.0).max(0.5).min(rho_max);
        let log_growth = if rho_max > rho_min {
            (rho_max / rho_min).ln() / f64::from(g.eccentricities)
        } else {
            0.0
        };
        Self {
            cx: f64::from(src.w) / 2.0,
            cy: f64::from(src.h) / 2.0,
            rho_min,
            rho_max,
            log_growth,
            d_theta: std::f64::consts::TAU / f64::from(g.angles),
        }
    }

    /// Radius at a fractional ring edge index.
    #[inline]
    pub fn radius(&self, ring: f64) -> f64 {
        self.rho_min * (self.log_growth * ring).exp()
    }

    /// Radial width of ring `r` in source pixels.
    #[inline]
    pub fn ring_width(&self, ring: u32) -> f64 {
        let r = f64::from(ring);
        self.radius(r + 1.0) - self.radius(r)
    }

    /// Center of cell `(ring, sector)` in continuous source coordinates.
    #[inline]
    pub fn cell_center(&self, ring: u32, sector: u32) -> (f64, f64) {
        let rho = self.radius(f64::from(ring) + 0.5);
        let theta = (f64::from(sector) + 0.5) * self.d_theta;
        (self.cx + rho * theta.cos(), self.cy - rho * theta.sin())
    }

    /// Fractional ring/sector coordinates of a source point, measured so that
    /// integer values land on cell centers. The ring value is unclamped.
    #[inline]
    pub fn cell_of(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.cx;
        let dy = self.cy - y;
        let rho = dx.hypot(dy);
        let ring = if self.log_growth > 0.0 && rho > 0.0 {
            (rho / self.rho_min).ln() / self.log_growth - 0.5
        } else {
            0.0
        };
        let theta = dy.atan2(dx).rem_euclid(std::f64::consts::TAU);
        (ring, theta / self.d_theta - 0.5)
    }
}
