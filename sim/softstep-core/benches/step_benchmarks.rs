//! Benchmarks for the frame step.
//!
//! Run with: cargo bench -p softstep-core

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_precision_loss
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use softstep_core::{
    DistanceJoint, FlatGround, HeightField, Shape, SoftnessParams, World, WorldConfig,
};

const DT: f64 = 1.0 / 60.0;

/// A row of balls resting on the ground, each tied to the next.
fn chain_world(links: usize) -> World {
    let mut world = World::new(WorldConfig::default()).unwrap();
    let mut previous = None;
    for i in 0..links {
        let ball = world
            .add_body_from_shapes(
                &[Shape::sphere(Vector3::zeros(), 0.25)],
                500.0,
                Point3::new(i as f64 * 0.6, 0.0, 0.25),
                UnitQuaternion::identity(),
            )
            .unwrap();
        if let Some(prev) = previous {
            let (a, b) = world.body_pair(prev, ball).unwrap();
            let anchor = Point3::new(i as f64 * 0.6 - 0.3, 0.0, 0.25);
            let joint = DistanceJoint::new(a, b, &anchor, SoftnessParams::stiff()).unwrap();
            world.add_joint(joint).unwrap();
        }
        previous = Some(ball);
    }
    world
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let ground = FlatGround::new(0.0);

    for &links in &[1, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(links), &links, |b, &links| {
            let mut world = chain_world(links);
            b.iter(|| {
                world.step(black_box(DT), &ground, &()).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_height_field(c: &mut Criterion) {
    let field = HeightField::from_fn(64, 64, 0.5, |x, y| 0.1 * (x.sin() + y.cos()))
        .unwrap()
        .with_origin(-16.0, -16.0);
    let mut world = chain_world(8);

    c.bench_function("world_step_height_field", |b| {
        b.iter(|| {
            world.step(black_box(DT), &field, &()).unwrap();
        });
    });
}

criterion_group!(benches, bench_step, bench_height_field);
criterion_main!(benches);
