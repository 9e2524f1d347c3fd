use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use geocode_transform::execution::{BatchDispatcher, DispatchOptions};
use geocode_transform::logging::MemoryLogger;
use geocode_transform::rate_gate::RateGate;
use geocode_transform::types::{DataType, Field, Schema};

fn bench_uncontended_admission(c: &mut Criterion) {
    // Limit high enough that the gate never blocks.
    let gate = RateGate::new(u32::MAX, Duration::from_millis(1)).unwrap();
    c.bench_function("rate_gate/admit_uncontended", |b| {
        b.iter(|| black_box(gate.wait_to_proceed().unwrap()))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let schema = Schema::new(vec![Field::new("Address", DataType::Utf8)])
        .with_calculated(vec![Field::new("Latitude", DataType::Float64)]);
    let address = schema.field_id("Address").unwrap();
    let latitude = schema.field_id("Latitude").unwrap();

    let mut group = c.benchmark_group("dispatch/batch");
    for batch_size in [1usize, 16, 128] {
        let gate = Arc::new(RateGate::new(u32::MAX, Duration::from_millis(1)).unwrap());
        let dispatcher = BatchDispatcher::new(
            gate,
            DispatchOptions {
                batch_size,
                num_threads: None,
            },
            Arc::new(MemoryLogger::default()),
            None,
        )
        .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &n| {
                b.iter(|| {
                    let rows: Vec<_> = (0..n)
                        .map(|i| {
                            let mut row = schema.new_row();
                            row.set(address, format!("{i} Main Street"));
                            row
                        })
                        .collect();
                    black_box(dispatcher.dispatch(rows, |mut row| {
                        row.set(latitude, 42.0);
                        row
                    }))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_uncontended_admission, bench_dispatch);
criterion_main!(benches);
