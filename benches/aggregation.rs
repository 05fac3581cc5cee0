//! Benchmarks for snapshot averaging.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use fedsim::federated::average;
use fedsim::model::{ParameterSnapshot, Tensor};

fn snapshots(clients: usize, weight_len: usize) -> Vec<ParameterSnapshot> {
    (0..clients)
        .map(|i| {
            let mut snapshot = ParameterSnapshot::new();
            snapshot.insert(
                "weight",
                Tensor::from_vec(vec![weight_len], vec![i as f32 * 0.01; weight_len]).unwrap(),
            );
            snapshot.insert(
                "bias",
                Tensor::from_vec(vec![16], vec![0.5; 16]).unwrap(),
            );
            snapshot
        })
        .collect()
}

fn bench_average(c: &mut Criterion) {
    let few = snapshots(10, 4096);
    c.bench_function("average_10_clients", |b| {
        b.iter(|| average(black_box(&few)).unwrap())
    });

    let many = snapshots(100, 4096);
    c.bench_function("average_100_clients", |b| {
        b.iter(|| average(black_box(&many)).unwrap())
    });
}

criterion_group!(benches, bench_average);
criterion_main!(benches);
