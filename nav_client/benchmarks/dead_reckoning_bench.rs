use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nav_client::dead_reckon;
use nav_runtime::{MovementFlags, PhysicsInput, Position};

fn agent_inputs(count: usize) -> Vec<PhysicsInput> {
    (0..count)
        .map(|index| {
            let flags = match index % 3 {
                0 => MovementFlags::FORWARD,
                1 => MovementFlags::BACKWARD | MovementFlags::FALLING,
                _ => MovementFlags::empty(),
            };
            PhysicsInput::new(0, Position::new(index as f32, 0.0, 10.0), 1.0 / 30.0)
                .with_flags(flags)
                .with_facing(index as f32 * 0.1)
        })
        .collect()
}

fn bench_dead_reckoning(c: &mut Criterion) {
    let mut group = c.benchmark_group("dead_reckoning");

    for agents in [64usize, 1024, 16384] {
        let inputs = agent_inputs(agents);
        group.bench_with_input(BenchmarkId::new("tick", agents), &inputs, |b, inputs| {
            b.iter(|| {
                for input in inputs {
                    black_box(dead_reckon(black_box(input)));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(dead_reckoning_benches, bench_dead_reckoning);
criterion_main!(dead_reckoning_benches);
