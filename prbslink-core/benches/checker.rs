use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prbslink_core::{
    codec::FrameCodec, constants::HEADER_SIZE, scanner::StreamReassembler, LinkId, LinkMonitor,
    MonitorConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn config(payload_len: usize) -> MonitorConfig {
    MonitorConfig {
        payload_len,
        max_payload_len: 8192,
        ..Default::default()
    }
}

fn bench_loopback(c: &mut Criterion) {
    let mut group = c.benchmark_group("loopback");

    for size in [256, 1024, 8192] {
        let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config(size)).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                let frame = monitor.next_tx_frame();
                monitor.submit_rx(frame);
            });
        });
    }

    group.finish();
}

fn bench_corrupted(c: &mut Criterion) {
    let mut group = c.benchmark_group("corrupted");
    let size = 1024;
    let mut source = LinkMonitor::new(LinkId::ethernet(0), &config(size)).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let frames: Vec<Bytes> = (0..1000)
        .map(|_| {
            let mut raw = source.next_tx_frame().to_vec();
            for _ in 0..rng.gen_range(0..16) {
                let offset = rng.gen_range(HEADER_SIZE..raw.len());
                raw[offset] ^= 1 << rng.gen_range(0..8u8);
            }
            Bytes::from(raw)
        })
        .collect();

    group.throughput(Throughput::Bytes((frames.len() * size) as u64));
    group.bench_function("1000_frames", |b| {
        b.iter(|| {
            let mut monitor = LinkMonitor::new(LinkId::ethernet(0), &config(size)).unwrap();
            for frame in &frames {
                monitor.submit_rx(frame.clone());
            }
            black_box(monitor.snapshot())
        });
    });

    group.finish();
}

fn bench_reassemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassemble");

    let mut source = LinkMonitor::new(LinkId::point_to_point(0), &config(1000)).unwrap();
    let mut stream = Vec::new();
    for _ in 0..1000 {
        stream.extend_from_slice(&source.next_tx_frame());
    }

    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("1000_frames", |b| {
        b.iter(|| {
            let mut reassembler = StreamReassembler::new(FrameCodec::new(8192).unwrap());
            let mut found = 0;
            for chunk in stream.chunks(1500) {
                found += reassembler.push(black_box(chunk)).len();
            }
            found
        });
    });

    group.finish();
}

criterion_group!(benches, bench_loopback, bench_corrupted, bench_reassemble);
criterion_main!(benches);
