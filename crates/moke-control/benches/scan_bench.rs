use criterion::{criterion_group, criterion_main, Criterion};
use moke_control::scan::ScanOrchestrator;
use moke_control::setpoints::hysteresis_vector;
use moke_control::sim::SimulatedRig;
use moke_types::config::{AcquisitionConfig, DelayLineConfig, ScanConfig, TransientConfig};
use std::hint::black_box;

fn transient(delays: f64, loops: usize) -> ScanConfig {
    ScanConfig {
        acquisition: AcquisitionConfig {
            repeats: 200,
            ..AcquisitionConfig::default()
        },
        transient: Some(TransientConfig {
            delay_start: 480.0,
            delay_end: 480.0 + 10.0 * delays,
            delay_step: 10.0,
            delay_segments: None,
            loops,
            field_amplitudes: vec![2.0],
        }),
        hysteresis: None,
        fluences: vec![],
        delay_line: DelayLineConfig::default(),
    }
}

fn bench_hysteresis_vector(c: &mut Criterion) {
    c.bench_function("hysteresis_vector_2V_10loops", |b| {
        b.iter(|| hysteresis_vector(black_box(2.0), None, black_box(10)))
    });
}

fn bench_simulated_scan(c: &mut Criterion) {
    let cfg = transient(50.0, 2);
    let mut group = c.benchmark_group("simulated_transient_scan");
    group.sample_size(10);
    group.bench_function("50_delays_2_loops", |b| {
        b.iter(|| {
            let rig = SimulatedRig::new(42).expect("valid rig");
            let mut scan = ScanOrchestrator::new(&cfg, rig.collaborators()).expect("valid config");
            black_box(scan.run_to_completion().expect("scan completes"))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_hysteresis_vector, bench_simulated_scan);
criterion_main!(benches);
