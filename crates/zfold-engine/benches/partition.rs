//! Criterion benches for the forward DP pass.
//!
//! Input sequences are deterministic across runs so results are comparable
//! over time. Throughput is reported in **residues**.

#![deny(rust_2018_idioms)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zfold_engine::{FoldParams, Partition, Topology};

/// Deterministic pairing-rich sequence of length `n`.
fn det_sequence(n: usize) -> String {
    const MOTIF: &[u8] = b"CGAUGC";
    (0..n).map(|i| MOTIF[i % MOTIF.len()] as char).collect()
}

fn bench_forward_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_forward");

    for &n in &[12usize, 24usize, 36usize] {
        let seq = det_sequence(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(BenchmarkId::new("run", n), |b| {
            b.iter(|| {
                let topo = Topology::single(black_box(&seq), false).unwrap();
                let mut p = Partition::new(topo, FoldParams::default(), true);
                p.run();
                black_box(p.z());
            });
        });
    }

    group.finish();
}

fn bench_traceback(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_mfe");

    let seq = det_sequence(24);
    let topo = Topology::single(&seq, false).unwrap();
    let mut p = Partition::new(topo, FoldParams::default(), false);
    p.run();

    group.bench_function("mfe", |b| {
        b.iter(|| {
            let (pairs, prob) = p.mfe().unwrap();
            black_box((pairs, prob));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_forward_pass, bench_traceback);
criterion_main!(benches);
