use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nav_runtime::{MovementFlags, PhysicsInput, Position, Request};
use nav_server::{dispatch, handle_frame, StaticWorldEngine};

fn bench_dispatch(c: &mut Criterion) {
    let engine = StaticWorldEngine::builtin();
    let mut group = c.benchmark_group("dispatch");

    let detour = Request::ComputePath {
        map_id: 0,
        start: Position::new(0.0, 0.0, 0.0),
        end: Position::new(45.0, 25.0, 0.0),
        want_smoothed: true,
    };
    group.bench_function("compute_path_detour", |b| {
        b.iter(|| black_box(dispatch(&engine, black_box(&detour))))
    });

    let sight = Request::LineOfSight {
        map_id: 0,
        from: Position::new(0.0, 0.0, 1.0),
        to: Position::new(20.0, 0.0, 1.0),
    };
    group.bench_function("line_of_sight", |b| {
        b.iter(|| black_box(dispatch(&engine, black_box(&sight))))
    });

    let step = Request::PhysicsStep(
        PhysicsInput::new(0, Position::new(0.0, -10.0, 0.0), 1.0 / 30.0)
            .with_flags(MovementFlags::FORWARD),
    );
    let step_frame = step.encode_to_vec().expect("encode physics step");
    group.bench_function("physics_step_frame", |b| {
        b.iter(|| black_box(handle_frame(&engine, black_box(&step_frame))))
    });

    group.finish();
}

criterion_group!(dispatch_benches, bench_dispatch);
criterion_main!(dispatch_benches);
