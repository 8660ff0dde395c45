//! Benchmarks for plot compilation and rasterization.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trueno_plot::prelude::*;
use trueno_plot::render::rasterize;

fn frame(size: usize) -> DataFrame {
    let x: Vec<f64> = (0..size).map(|i| i as f64).collect();
    let y: Vec<f64> = (0..size).map(|i| (i as f64 / 50.0).sin()).collect();
    let g: Vec<&str> = (0..size).map(|i| ["a", "b", "c"][i % 3]).collect();
    DataFrame::new()
        .column("x", x)
        .and_then(|d| d.column("y", y))
        .and_then(|d| d.column("g", g))
        .unwrap()
}

fn compile_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for size in [100, 1_000, 10_000] {
        let data = std::sync::Arc::new(frame(size));

        group.bench_with_input(BenchmarkId::new("dots", size), &size, |b, _| {
            b.iter(|| {
                Plot::new()
                    .data(black_box(data.clone()))
                    .x("x")
                    .y("y")
                    .color("g")
                    .add(Dot::new())
                    .compile()
                    .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("hist", size), &size, |b, _| {
            b.iter(|| {
                Plot::new()
                    .data(black_box(data.clone()))
                    .x("y")
                    .layer(Layer::new(Bars::new()).stat(Hist::new()))
                    .compile()
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn render_benchmark(c: &mut Criterion) {
    let compiled = Plot::new()
        .data(frame(1_000))
        .x("x")
        .y("y")
        .color("g")
        .add(Line::new())
        .compile()
        .unwrap();

    c.bench_function("rasterize_lines_1000", |b| {
        b.iter(|| rasterize(black_box(compiled.scene()), 1.0).unwrap());
    });
    c.bench_function("svg_lines_1000", |b| b.iter(|| black_box(&compiled).to_svg()));
}

criterion_group!(benches, compile_benchmark, render_benchmark);
criterion_main!(benches);
