//! Behavioral properties of the transform core on the reference sensor and
//! a handful of other geometries.

use lp_map::fovea::{crop_fovea, FovealCropper};
use std::time::{Duration, Instant};

use lp_map::geometry::{
    SensorGeometry, Size, DEFAULT_ANGLES, DEFAULT_ECCENTRICITIES, DEFAULT_FOVEA, DEFAULT_OVERLAP,
    REFERENCE_SOURCE,
};
use lp_map::rect::{RectPath, RectResizer};
use lp_map::table::{LookupTable, TableDirection};
use lp_map::{LogPolarTransform, MapError, RgbFrame};

/// Deterministic noise so every pixel differs from its neighbours.
fn noise(size: Size, seed: u32) -> RgbFrame {
    let mut state = seed.wrapping_mul(2_654_435_761).max(1);
    RgbFrame::from_fn(size, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        [next(), next(), next()]
    })
}

#[test]
fn reference_constants_form_the_default_geometry() {
    let g = SensorGeometry::new(
        REFERENCE_SOURCE,
        DEFAULT_ECCENTRICITIES,
        DEFAULT_ANGLES,
        DEFAULT_FOVEA,
        DEFAULT_OVERLAP,
    )
    .unwrap();
    assert_eq!(g, SensorGeometry::default());
}

#[test]
fn wide_kernels_build_in_linear_time() {
    // 12 cells whose outer kernels cover most of the source: a few million
    // taps in total, but far too many to merge pairwise per cell.
    let start = Instant::now();
    let table = LookupTable::build(
        TableDirection::CartesianToLogPolar,
        REFERENCE_SOURCE,
        6,
        2,
        1,
        64.0,
    )
    .unwrap();
    let elapsed = start.elapsed();
    assert!(table.total_taps() > 1_000_000);
    assert!(elapsed < Duration::from_secs(60), "table build took {:?}", elapsed);
    for c in 0..table.cells() {
        let taps = table.taps(c);
        let mut indices: Vec<u32> = taps.iter().map(|t| t.index).collect();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), taps.len(), "cell {} repeats a pixel", c);
    }
}

#[test]
fn valid_geometries_build_complete_tables() {
    let cases = [
        (REFERENCE_SOURCE, DEFAULT_ECCENTRICITIES, DEFAULT_ANGLES, DEFAULT_FOVEA, 1.0),
        (Size::new(640, 480), 6, 1, 1, 1.0),
        (Size::new(320, 240), 48, 90, 240, 1.0),
        (Size::new(100, 100), 30, 64, 20, 1.75),
        (Size::new(64, 48), 12, 36, 8, 4.0),
    ];
    for (source, necc, nang, fovea, overlap) in cases {
        let table = LookupTable::build(
            TableDirection::CartesianToLogPolar,
            source,
            necc,
            nang,
            fovea,
            overlap,
        )
        .unwrap();
        assert_eq!(table.cells(), (necc * nang) as usize);
        assert_eq!(table.dest_size(), Size::new(nang, necc));
        for c in 0..table.cells() {
            let taps = table.taps(c);
            assert!(!taps.is_empty(), "cell {} has no taps", c);
            let sum: f32 = taps.iter().map(|t| t.weight).sum();
            assert!((sum - 1.0).abs() < 1e-4, "cell {} weights sum to {}", c, sum);
        }
    }
}

#[test]
fn eccentricity_not_multiple_of_six_is_configuration_error() {
    let err = LookupTable::build(
        TableDirection::CartesianToLogPolar,
        REFERENCE_SOURCE,
        100,
        252,
        128,
        1.0,
    )
    .unwrap_err();
    assert!(matches!(err, MapError::Configuration { .. }));
}

#[test]
fn nearest_taps_stay_inside_source() {
    // Fovea as large as the short side pushes cells onto the border.
    let g = SensorGeometry::new(Size::new(64, 48), 18, 40, 48, 1.0).unwrap();
    let table = LookupTable::for_geometry(TableDirection::CartesianToLogPolar, &g);
    let limit = g.source().pixels() as u32;
    for c in 0..table.cells() {
        let taps = table.taps(c);
        assert_eq!(taps.len(), 1);
        assert!(taps[0].index < limit);
        assert_eq!(taps[0].weight, 1.0);
    }
}

#[test]
fn rect_identity_is_byte_identical() {
    let src = noise(REFERENCE_SOURCE, 1);
    let mut dst = RgbFrame::new(REFERENCE_SOURCE);
    RectResizer::new().apply(&src, &mut dst).unwrap();
    assert_eq!(dst.as_bytes(), src.as_bytes());
}

#[test]
fn reference_decimation_reads_even_coordinates() {
    let src = noise(REFERENCE_SOURCE, 2);
    let mut dst = RgbFrame::new(Size::new(320, 240));
    let path = RectResizer::new().apply(&src, &mut dst).unwrap();
    assert_eq!(path, RectPath::Decimate2x);
    for y in 0..240 {
        for x in 0..320 {
            assert_eq!(dst.pixel(x, y), src.pixel(2 * x, 2 * y));
        }
    }
}

#[test]
fn fovea_matches_centered_source_window() {
    for (w, h, f) in [(640u32, 480u32, 128u32), (101, 77, 33), (50, 50, 50)] {
        let src = noise(Size::new(w, h), w + f);
        let mut dst = RgbFrame::new(Size::new(f, f));
        FovealCropper::new(f).apply(&src, &mut dst).unwrap();
        for j in 0..f {
            for i in 0..f {
                assert_eq!(dst.pixel(i, j), src.pixel(w / 2 - f / 2 + i, h / 2 - f / 2 + j));
            }
        }
    }
}

#[test]
fn fovea_exceeding_source_is_dimension_mismatch() {
    let src = noise(Size::new(40, 30), 3);
    let mut dst = RgbFrame::new(Size::new(31, 31));
    assert!(matches!(
        crop_fovea(&src, &mut dst),
        Err(MapError::DimensionMismatch { .. })
    ));
}

#[test]
fn repeated_remaps_are_bit_identical() {
    for overlap in [1.0, 2.5] {
        let g = SensorGeometry::new(
            REFERENCE_SOURCE,
            DEFAULT_ECCENTRICITIES,
            DEFAULT_ANGLES,
            DEFAULT_FOVEA,
            overlap,
        ).unwrap();
        let t = LogPolarTransform::new(g);
        let src = noise(REFERENCE_SOURCE, 4);
        let before = src.clone();
        let mut a = t.logpolar_frame();
        let mut b = t.logpolar_frame();
        t.cart_to_logpolar(&src, &mut a).unwrap();
        t.cart_to_logpolar(&src, &mut b).unwrap();
        assert_eq!(a, b);
        assert_eq!(src, before);
    }
}

#[test]
fn wrong_sized_source_fails_without_writing() {
    let t = LogPolarTransform::new(SensorGeometry::default());
    let src = noise(Size::new(320, 240), 5);
    let mut dst = t.logpolar_frame();
    dst.as_bytes_mut().fill(0xAB);
    assert!(matches!(
        t.cart_to_logpolar(&src, &mut dst),
        Err(MapError::DimensionMismatch { .. })
    ));
    assert!(dst.as_bytes().iter().all(|&b| b == 0xAB));
}

#[test]
fn innermost_ring_samples_fovea_boundary() {
    // Nearest-neighbor cells of ring 0 sit just outside the fovea radius.
    let g = SensorGeometry::default();
    let table = LookupTable::for_geometry(TableDirection::CartesianToLogPolar, &g);
    let (cx, cy) = (320.0f64, 240.0f64);
    for sector in 0..g.angles() {
        let idx = table.taps_at(sector, 0)[0].index;
        let (x, y) = (f64::from(idx % 640) + 0.5, f64::from(idx / 640) + 0.5);
        let rho = (x - cx).hypot(y - cy);
        assert!((63.0..=66.5).contains(&rho), "sector {} at radius {}", sector, rho);
    }
}
