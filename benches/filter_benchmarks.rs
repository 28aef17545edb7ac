//! Benchmarks for the brightness filter and in-memory sampling.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::Criterion;
use frameset::{BrightnessFilter, FrameSampler, ImageFrames, SamplerOptions};
use image::{DynamicImage, Rgb, RgbImage};

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let value = ((x + y) % 256) as u8;
        Rgb([value, value / 2, 255 - value])
    }))
}

fn benchmark_classify(criterion: &mut Criterion) {
    let filter = BrightnessFilter::default();
    let hd = gradient(1280, 720);
    let full_hd = gradient(1920, 1080);

    criterion.bench_function("classify 720p frame", |bencher| {
        bencher.iter(|| filter.classify(black_box(&hd)));
    });

    criterion.bench_function("classify 1080p frame", |bencher| {
        bencher.iter(|| filter.classify(black_box(&full_hd)));
    });
}

fn benchmark_sampling(criterion: &mut Criterion) {
    let frames: Vec<DynamicImage> = (0..60).map(|_| gradient(320, 180)).collect();
    let sampler = FrameSampler::new(SamplerOptions::new().with_interval(10));

    criterion.bench_function("sample 60 frames every 10th", |bencher| {
        bencher.iter(|| {
            let output = tempfile::tempdir().unwrap();
            let mut source = ImageFrames::new(frames.clone());
            sampler.sample(&mut source, output.path()).unwrap()
        });
    });
}

criterion::criterion_group!(benches, benchmark_classify, benchmark_sampling);
criterion::criterion_main!(benches);
