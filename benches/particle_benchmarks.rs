//! 粒子系统与调度器性能基准测试
//!
//! 测试发射器推进、发射类型采样和调度器推进的性能

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spark_engine::core::Scheduler;
use spark_engine::render::particles::{
    Emission, EmitterSettings, EmitterType, ParticleEmitter,
};
use std::sync::Arc;

fn bench_emitter_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter_tick");

    for capacity in [256usize, 4096] {
        group.bench_with_input(
            BenchmarkId::new("cone", capacity),
            &capacity,
            |b, &capacity| {
                let settings = EmitterSettings {
                    capacity,
                    emission: Emission::PerTick(capacity as u32 / 32),
                    ..Default::default()
                };
                let emitter_type = Arc::new(EmitterType::cone(Vec2::Y, 0.8).unwrap());
                let mut emitter =
                    ParticleEmitter::new(emitter_type, Vec2::ZERO, settings, 42).unwrap();

                b.iter(|| {
                    emitter.tick(black_box(1.0 / 60.0));
                    black_box(emitter.alive_count())
                });
            },
        );
    }

    group.finish();
}

fn bench_emitter_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter_sampling");
    let mut rng = StdRng::seed_from_u64(7);

    let cone = EmitterType::cone(Vec2::new(0.3, 0.7), 1.2).unwrap();
    let ring = EmitterType::ring(Vec2::Y, 2.0).unwrap();

    group.bench_function("cone_direction", |b| {
        b.iter(|| black_box(cone.direction(&mut rng)));
    });

    group.bench_function("ring_position", |b| {
        b.iter(|| black_box(ring.position(black_box(Vec2::ZERO), &mut rng)));
    });

    group.finish();
}

fn bench_scheduler_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_tick");

    for pending in [16usize, 1024] {
        group.bench_with_input(
            BenchmarkId::new("pending", pending),
            &pending,
            |b, &pending| {
                b.iter(|| {
                    let mut scheduler = Scheduler::new();
                    for i in 0..pending {
                        scheduler.schedule(i as f64 * 0.01, || {}).unwrap();
                    }
                    while scheduler.pending_count() > 0 {
                        scheduler.tick(black_box(1.0 / 60.0)).unwrap();
                    }
                    black_box(scheduler.fired_total())
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_emitter_tick,
    bench_emitter_sampling,
    bench_scheduler_tick
);
criterion_main!(benches);
