// SPDX-License-Identifier: MIT
//! # lp-map: Log-Polar Remapping for Foveated Sensors
//!
//! This crate turns Cartesian RGB8 frames into the non-uniform, foveated
//! representation of a log-polar sensor: resolution is highest at the center
//! and falls off geometrically with eccentricity.
//!
//! ## Key Components
//!
//! - [`geometry`]: validated sensor geometry and the ring/sector layout
//! - [`table`]: lookup-table construction (forward and inverse)
//! - [`logpolar`]: per-frame resampling through a table
//! - [`fovea`]: centered 1:1 crop of the uniformly sampled fovea
//! - [`rect`]: Cartesian resize (identity, 2:1 decimation, SIMD fallback)
//! - [`frame`]: the tightly packed RGB8 buffer every routine reads and writes
//!
//! ## Performance Characteristics
//!
//! - **Tables built once**: construction cost is paid per geometry, not per frame
//! - **Zero-allocation per frame**: destinations are caller-owned and reused
//! - **Parallel gather**: log-polar rows are resampled with rayon
//! - **SIMD fallback**: generic resizes go through fast_image_resize
//!
//! ## Usage Example
//!
//! ```rust
//! use lp_map::{frame::RgbFrame, geometry::SensorGeometry, logpolar::LogPolarTransform};
//!
//! let transform = LogPolarTransform::new(SensorGeometry::default());
//! let src = RgbFrame::new(SensorGeometry::default().source());
//! let mut lp = transform.logpolar_frame();
//! transform.cart_to_logpolar(&src, &mut lp)?;
//! assert_eq!((lp.width(), lp.height()), (252, 156));
//! # Ok::<(), lp_map::error::MapError>(())
//! ```

pub mod error;
pub mod fovea;
pub mod frame;
pub mod geometry;
pub mod logpolar;
pub mod rect;
pub mod table;

pub use error::MapError;
pub use frame::RgbFrame;
pub use geometry::{SensorGeometry, Size};
pub use logpolar::LogPolarTransform;
