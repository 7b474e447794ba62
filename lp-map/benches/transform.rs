use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lp_map::fovea::FovealCropper;
use lp_map::geometry::{SensorGeometry, Size, REFERENCE_SOURCE};
use lp_map::rect::RectResizer;
use lp_map::table::{LookupTable, TableDirection};
use lp_map::{LogPolarTransform, RgbFrame};

fn source() -> RgbFrame {
    RgbFrame::from_fn(REFERENCE_SOURCE, |x, y| {
        [(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]
    })
}

fn bench_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_build");
    for overlap in [1.0, 2.0] {
        let g = SensorGeometry::new(REFERENCE_SOURCE, 156, 252, 128, overlap).unwrap();
        group.bench_with_input(BenchmarkId::new("c2l", overlap), &g, |b, g| {
            b.iter(|| LookupTable::for_geometry(TableDirection::CartesianToLogPolar, g))
        });
    }
    group.finish();
}

fn bench_remap(c: &mut Criterion) {
    let src = source();
    let mut group = c.benchmark_group("cart_to_logpolar");
    group.throughput(Throughput::Elements(156 * 252));
    for overlap in [1.0, 2.0] {
        let g = SensorGeometry::new(REFERENCE_SOURCE, 156, 252, 128, overlap).unwrap();
        let t = LogPolarTransform::new(g);
        let mut dst = t.logpolar_frame();
        group.bench_function(BenchmarkId::from_parameter(overlap), |b| {
            b.iter(|| t.cart_to_logpolar(&src, &mut dst).unwrap())
        });
    }
    group.finish();
}

fn bench_formatters(c: &mut Criterion) {
    let src = source();
    let mut group = c.benchmark_group("formatters");
    let mut resizer = RectResizer::new();
    for out in [Size::new(320, 240), Size::new(400, 300)] {
        let mut dst = RgbFrame::new(out);
        group.bench_function(BenchmarkId::new("rect", out), |b| {
            b.iter(|| resizer.apply(&src, &mut dst).unwrap())
        });
    }
    let fovea = FovealCropper::new(128);
    let mut dst = RgbFrame::new(fovea.output_size());
    group.bench_function("fovea", |b| b.iter(|| fovea.apply(&src, &mut dst).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_table_build, bench_remap, bench_formatters);
criterion_main!(benches);
