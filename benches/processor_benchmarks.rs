//! Frame processor benchmarks using Criterion.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use footfall_rs::{CrossingLines, Detection, FrameProcessor, MatchWindow, ProcessorConfig};

/// Create a row of walkers at frame `step`, spread along x so no two share a window.
fn create_test_detections(n: usize, step: usize) -> Vec<Detection> {
    (0..n)
        .map(|i| {
            let x = (i * 40) as i32;
            let y = if i % 2 == 0 {
                480 - ((step * 7) % 480) as i32
            } else {
                ((step * 7) % 480) as i32
            };
            Detection::new(x, y, 20, 40, 800.0)
        })
        .collect()
}

fn create_processor(window: MatchWindow) -> FrameProcessor {
    let lines = CrossingLines::new(192, 288).expect("valid lines");
    let mut config = ProcessorConfig::new(lines, 100.0);
    config.match_window = window;
    FrameProcessor::new(config).expect("valid processor")
}

fn bench_walkers(c: &mut Criterion, name: &str, n: usize, window: MatchWindow) {
    let frames: Vec<Vec<Detection>> = (0..64).map(|step| create_test_detections(n, step)).collect();
    let mut processor = create_processor(window);
    let mut step = 0;

    c.bench_function(name, |b| {
        b.iter(|| {
            let frame = frames[step % frames.len()].clone();
            step += 1;
            black_box(processor.process(black_box(frame)).expect("frame processed"));
        })
    });
}

fn benchmark_process_10_walkers(c: &mut Criterion) {
    bench_walkers(c, "process_10_walkers", 10, MatchWindow::default());
}

fn benchmark_process_50_walkers(c: &mut Criterion) {
    bench_walkers(c, "process_50_walkers", 50, MatchWindow::default());
}

fn benchmark_process_100_walkers_bbox(c: &mut Criterion) {
    bench_walkers(c, "process_100_walkers_bbox", 100, MatchWindow::BoundingBox);
}

/// Detections far apart every frame: tracks churn through creation and eviction.
fn benchmark_process_churn(c: &mut Criterion) {
    let mut processor = create_processor(MatchWindow::default());
    let mut step = 0i32;

    c.bench_function("process_churn_20", |b| {
        b.iter(|| {
            let frame: Vec<Detection> = (0..20)
                .map(|i| Detection::new(i * 40, (step * 97 + i * 13) % 480, 20, 40, 800.0))
                .collect();
            step += 1;
            black_box(processor.process(frame).expect("frame processed"));
        })
    });
}

criterion_group!(
    benches,
    benchmark_process_10_walkers,
    benchmark_process_50_walkers,
    benchmark_process_100_walkers_bbox,
    benchmark_process_churn,
);

criterion_main!(benches);
