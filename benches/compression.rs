use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::tempdir;
use timebox_codec::{date_delta, pipeline};
use timebox_core::{CompressionMode, Tag, TagIdentifier, TagOptions, TimeBoxFile, TypedColumn};

fn benchmark_date_delta_regular(c: &mut Criterion) {
    c.bench_function("date_delta_regular_60s", |b| {
        let timestamps: Vec<i64> = (0..10_000).map(|i| i * 60).collect();
        b.iter(|| {
            let result = date_delta::compute(black_box(&timestamps)).unwrap();
            black_box(result);
        })
    });
}

fn benchmark_date_delta_irregular(c: &mut Criterion) {
    c.bench_function("date_delta_irregular", |b| {
        let mut timestamps = Vec::with_capacity(10_000);
        let mut current = 0i64;
        for i in 0..10_000 {
            current += 50 + (i % 37);
            timestamps.push(current);
        }
        b.iter(|| {
            let result = date_delta::compute(black_box(&timestamps)).unwrap();
            black_box(result);
        })
    });
}

fn benchmark_pipeline_min_offset(c: &mut Criterion) {
    c.bench_function("pipeline_min_offset_i32", |b| {
        let data = TypedColumn::I32((0..10_000).map(|i| 1_000 + (i % 37)).collect());
        let options = TagOptions {
            use_compression: true,
            ..Default::default()
        };
        b.iter(|| {
            let encoded = pipeline::encode(
                black_box(&data),
                &options,
                CompressionMode::MinOffset,
                None,
            )
            .unwrap();
            black_box(encoded);
        })
    });
}

fn benchmark_pipeline_exact_derivative(c: &mut Criterion) {
    c.bench_function("pipeline_exact_derivative_u64", |b| {
        let data = TypedColumn::U64((0..10_000).map(|i| i as u64 * 3).collect());
        let options = TagOptions {
            use_compression: true,
            ..Default::default()
        };
        b.iter(|| {
            let encoded = pipeline::encode(
                black_box(&data),
                &options,
                CompressionMode::ExactDerivative,
                None,
            )
            .unwrap();
            black_box(encoded);
        })
    });
}

fn benchmark_file_write_read_round_trip(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.timebox");

    let timestamps: Vec<i64> = (0..5_000).map(|i| i * 60).collect();
    let tags: Vec<Tag> = (0..8)
        .map(|t| {
            Tag::new(
                TagIdentifier::Integer(t),
                TagOptions {
                    use_compression: true,
                    ..Default::default()
                },
                TypedColumn::I32((0..5_000).map(|i| (i % 500) + t as i32).collect()),
            )
        })
        .collect();
    let file = TimeBoxFile::from_columns(timestamps, tags, false).unwrap();

    c.bench_function("file_write_read_round_trip_8_tags_5000_points", |b| {
        b.iter(|| {
            timebox_storage::write_file(black_box(&path), black_box(&file)).unwrap();
            let read_back = timebox_storage::read_file(black_box(&path)).unwrap();
            black_box(read_back);
        })
    });
}

criterion_group!(
    benches,
    benchmark_date_delta_regular,
    benchmark_date_delta_irregular,
    benchmark_pipeline_min_offset,
    benchmark_pipeline_exact_derivative,
    benchmark_file_write_read_round_trip,
);
criterion_main!(benches);
