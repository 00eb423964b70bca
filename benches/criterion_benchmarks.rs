use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use segdelta::diff::{CancellationToken, DifferenceEngine};
use segdelta::source::{SegmentDescriptor, VirtualSource};
use std::sync::Arc;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

fn mutate(base: &[u8], stride: usize) -> Vec<u8> {
    let mut out = base.to_vec();
    for i in (0..out.len()).step_by(stride.max(1)) {
        out[i] = out[i].wrapping_add(1);
    }
    out
}

fn calculate(old: &Arc<VirtualSource>, new: &Arc<VirtualSource>) -> DifferenceEngine {
    let mut engine = DifferenceEngine::new();
    engine
        .calculate(Some(old), new, None, &CancellationToken::new())
        .unwrap();
    engine
}

fn bench_calculate_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("calculate_speed_mb_s");
    for size in [64 * 1024usize, 1024 * 1024, 4 * 1024 * 1024] {
        let base = gen_data(size, 1);
        let old = Arc::new(VirtualSource::from_bytes(base.clone()).unwrap());
        let new = Arc::new(VirtualSource::from_bytes(mutate(&base, 1024)).unwrap());
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let engine = calculate(black_box(&old), black_box(&new));
                black_box(engine.result().len());
            });
        });
    }
    g.finish();
}

fn bench_segment_density(c: &mut Criterion) {
    // Denser mutations mean more run transitions and more descriptors.
    let mut g = c.benchmark_group("calculate_vs_mutation_stride");
    let size = 1024 * 1024usize;
    let base = gen_data(size, 2);
    for stride in [64usize, 512, 4096, 32768] {
        let old = Arc::new(VirtualSource::from_bytes(base.clone()).unwrap());
        let new = Arc::new(VirtualSource::from_bytes(mutate(&base, stride)).unwrap());
        g.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, _| {
            b.iter(|| {
                let engine = calculate(&old, &new);
                black_box(engine.result().len());
            });
        });
    }
    g.finish();
}

fn bench_composed_read(c: &mut Criterion) {
    let mut g = c.benchmark_group("composed_read_mb_s");
    let size = 4 * 1024 * 1024usize;
    let base = gen_data(size, 3);
    let old = Arc::new(VirtualSource::from_bytes(base.clone()).unwrap());
    let new = Arc::new(VirtualSource::from_bytes(mutate(&base, 2048)).unwrap());
    let engine = calculate(&old, &new);
    let segments = engine.result().to_vec();

    g.throughput(Throughput::Bytes(size as u64));
    g.bench_function("bulk", |b| {
        b.iter(|| {
            let stitched = VirtualSource::from_segments(segments.clone()).unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut total = 0usize;
            loop {
                let n = stitched.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                total += n;
            }
            black_box(total);
        });
    });

    g.bench_function("byte_at_a_time", |b| {
        b.iter(|| {
            let stitched = VirtualSource::from_segments(segments.clone()).unwrap();
            let mut total = 0usize;
            while stitched.read_byte().is_ok() {
                total += 1;
            }
            black_box(total);
        });
    });
    g.finish();
}

fn bench_many_small_segments(c: &mut Criterion) {
    // Stitching from thousands of tiny descriptors stresses the
    // covering-segment lookup.
    let mut g = c.benchmark_group("stitch_many_segments");
    let base = Arc::new(VirtualSource::from_bytes(gen_data(1024 * 1024, 4)).unwrap());
    for count in [1024usize, 8192, 32768] {
        let span = (base.len() as usize / count) as i64;
        let segments: Vec<SegmentDescriptor> = (0..count as i64)
            .map(|i| SegmentDescriptor::new(base.clone(), i * span, i * span + span - 1))
            .collect();
        g.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let stitched = VirtualSource::from_segments(segments.clone()).unwrap();
                let mut buf = vec![0u8; 64 * 1024];
                let mut total = 0usize;
                loop {
                    let n = stitched.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                black_box(total);
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_calculate_speed,
    bench_segment_density,
    bench_composed_read,
    bench_many_small_segments
);
criterion_main!(benches);
