//! # ECS Benchmark
//!
//! Measures the sparse-set hot paths:
//! - entity churn (create/destroy with recycling)
//! - component insert and swap-remove
//! - multi-component walks, rarest type first vs. most common first
//! - group iteration vs. fresh queries
//!
//! Run with: `cargo bench --package strata_core`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_core::{impl_component, Entity, Registry};

const ENTITY_COUNT: usize = 100_000;

struct Position {
    x: f64,
    y: f64,
}
impl_component!(Position { x, y });

struct Velocity {
    vx: f64,
    vy: f64,
}
impl_component!(Velocity { vx, vy });

struct Frozen;
impl_component!(Frozen);

/// Every entity gets a Position, every second one a Velocity, every
/// hundredth one Frozen.
fn populated(count: usize) -> (Registry, Vec<Entity>) {
    let mut registry = Registry::new::<(Position, Velocity, Frozen)>();
    registry.pre_allocate(count);

    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let e = registry.create();
        let f = i as f64;
        registry.add(e, Position { x: f, y: f }).ok();
        if i % 2 == 0 {
            registry.add(e, Velocity { vx: 0.1, vy: 0.2 }).ok();
        }
        if i % 100 == 0 {
            registry.add(e, Frozen).ok();
        }
        entities.push(e);
    }
    (registry, entities)
}

fn bench_entity_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_churn");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut registry = Registry::new::<(Position,)>();
            b.iter(|| {
                let entities: Vec<Entity> = (0..count).map(|_| registry.create()).collect();
                for e in entities {
                    registry.destroy(e);
                }
                black_box(registry.alive_count())
            });
        });
    }

    group.finish();
}

fn bench_add_remove(c: &mut Criterion) {
    let (mut registry, entities) = populated(ENTITY_COUNT);

    c.bench_function("add_remove_velocity_100k", |b| {
        b.iter(|| {
            for &e in &entities {
                registry.add(e, Velocity { vx: 1.0, vy: 1.0 }).ok();
            }
            for &e in &entities {
                black_box(registry.remove::<Velocity>(e));
            }
        });
    });
}

fn bench_movement_walk(c: &mut Criterion) {
    let (mut registry, _) = populated(ENTITY_COUNT);
    let mut group = c.benchmark_group("movement_walk");

    group.bench_function("velocity_first", |b| {
        b.iter(|| {
            registry
                .for_each_with::<(Velocity, Position), _>(|_, (vel, pos)| {
                    pos.x += vel.vx * 0.016;
                    pos.y += vel.vy * 0.016;
                })
                .ok();
        });
    });

    group.bench_function("position_first", |b| {
        b.iter(|| {
            registry
                .for_each_with::<(Position, Velocity), _>(|_, (pos, vel)| {
                    pos.x += vel.vx * 0.016;
                    pos.y += vel.vy * 0.016;
                })
                .ok();
        });
    });

    group.bench_function("rare_tag_first", |b| {
        b.iter(|| {
            let mut frozen = 0_usize;
            registry
                .for_each_with::<(Frozen, Position), _>(|_, _| frozen += 1)
                .ok();
            black_box(frozen)
        });
    });

    group.finish();
}

fn bench_group_vs_query(c: &mut Criterion) {
    let (mut registry, _) = populated(ENTITY_COUNT);
    let Ok(cached) = registry.group::<(Velocity, Position)>() else {
        return;
    };
    let mut group = c.benchmark_group("group_vs_query");

    group.bench_function("cached_group", |b| {
        b.iter(|| {
            if let Ok(walk) = cached.iter_mut(&mut registry) {
                for (_, (vel, pos)) in walk {
                    pos.x += vel.vx;
                }
            }
        });
    });

    group.bench_function("fresh_query", |b| {
        b.iter(|| {
            if let Ok(walk) = registry.query::<(Velocity, Position)>() {
                for (_, (vel, pos)) in walk {
                    pos.x += vel.vx;
                }
            }
        });
    });

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let (registry, entities) = populated(ENTITY_COUNT);

    c.bench_function("has_all_100k", |b| {
        b.iter(|| {
            entities
                .iter()
                .filter(|&&e| registry.has_all::<(Position, Velocity)>(e))
                .count()
        });
    });

    c.bench_function("get_if_sum_100k", |b| {
        b.iter(|| {
            let sum: f64 = entities
                .iter()
                .filter_map(|&e| registry.get_if::<Position>(e))
                .map(|pos| pos.x + pos.y)
                .sum();
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_entity_churn,
    bench_add_remove,
    bench_movement_walk,
    bench_group_vs_query,
    bench_lookup,
);
criterion_main!(benches);
