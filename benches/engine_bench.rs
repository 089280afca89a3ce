//! Engine throughput benchmark.
//!
//! Runs a seeded 500-process workload to completion under each policy,
//! with the event log discarded.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use schedsim::engine::Engine;
use schedsim::ready::Policy;
use schedsim::sink::EventLog;
use schedsim::workload::{self, Workload};

fn bench_policies(c: &mut Criterion) {
    let specs = workload::generate(500, Some(42));

    let mut group = c.benchmark_group("engine_run");
    for (name, policy) in [
        ("hpf", Policy::Hpf),
        ("srtn", Policy::Srtn),
        ("rr_q4", Policy::Rr { quantum: 4 }),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &policy, |b, &policy| {
            b.iter(|| {
                let workload = Workload::from_specs(specs.clone()).expect("workload");
                let log = EventLog::new(std::io::sink()).expect("log");
                let mut engine = Engine::new(policy, workload, log);
                engine.run().expect("run")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_policies);
criterion_main!(benches);
