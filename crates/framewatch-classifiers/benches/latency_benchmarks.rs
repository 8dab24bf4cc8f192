//! Latency benchmarks for the per-frame classification pass
//!
//! Every pass runs synchronously on the notifying thread, so its latency
//! bounds the frame rate a source can be classified at.
//!
//! Run with: cargo bench -p framewatch-classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use framewatch_classifiers::preprocess::prepare;
use framewatch_classifiers::{
    classify, default_labels, scaffold_model, CandleImageModel, ImageModel, InferenceSession,
    ModelDescriptor, MonitorSettings,
};
use framewatch_core::{Frame, LastClassState};
use framewatch_telemetry::MetricsCollector;

fn frame(size: usize, components: usize) -> Frame {
    let data: Vec<f32> = (0..size * size * components)
        .map(|i| (i % 4096) as f32)
        .collect();
    Frame::new("bench", [size, size, 1], components, data).expect("Failed to build frame")
}

/// Benchmark preprocessing (resize + normalize) at common source sizes
fn benchmark_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocess");
    group.sample_size(100);

    for (name, size, components) in [
        ("gray_128", 128, 1),
        ("gray_512", 512, 1),
        ("rgb_256", 256, 3),
    ] {
        let input = frame(size, components);
        group.bench_with_input(BenchmarkId::new("prepare_to_32", name), &input, |b, input| {
            b.iter(|| prepare(black_box(input), 32).unwrap());
        });
    }

    group.finish();
}

/// Benchmark a full pass through a scaffolded candle model
fn benchmark_candle_pass(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    scaffold_model(&ModelDescriptor::simple_cnn("bench", 32, 1), dir.path())
        .expect("Failed to scaffold model");
    let model = CandleImageModel::load(dir.path()).expect("Failed to load model");
    let labels = default_labels();
    let input = frame(256, 1);

    let mut group = c.benchmark_group("Candle_Pass");
    group.sample_size(100);

    group.bench_function("classify_256_to_32", |b| {
        b.iter(|| classify(black_box(&input), &model, 32, &labels).unwrap());
    });

    let model: Arc<dyn ImageModel> = Arc::new(model);
    let session = InferenceSession::new(
        model,
        &MonitorSettings::default(),
        LastClassState::new(),
        MetricsCollector::new(),
    )
    .expect("Failed to create session");

    group.bench_function("session_on_frame", |b| {
        b.iter(|| session.on_frame(black_box(&input)));
    });

    group.finish();
}

criterion_group!(benches, benchmark_preprocess, benchmark_candle_pass);
criterion_main!(benches);
