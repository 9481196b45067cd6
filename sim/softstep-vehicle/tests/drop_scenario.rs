//! A car dropped onto flat ground must come to rest.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nalgebra::Point3;
use softstep_core::{FlatGround, World, WorldConfig};
use softstep_vehicle::{create_car, Car, CarConfig, DriverInput};

const DT: f64 = 1.0 / 60.0;

/// A car whose wheels start `height` above the ground plane at z = 0.
fn drop_car(height: f64) -> (World, Car) {
    let mut world = World::new(WorldConfig::default()).unwrap();
    let config = CarConfig::default();
    let rest = config.wheel_radius - config.wheel_offsets[0].z;
    let car = create_car(&mut world, &config, Point3::new(0.0, 0.0, rest + height)).unwrap();
    (world, car)
}

/// Chassis height after every frame of `seconds` of simulation.
fn simulate(world: &mut World, car: &mut Car, seconds: f64) -> Vec<f64> {
    let frames = (seconds / DT).round() as usize;
    let ground = FlatGround::new(0.0);
    let mut heights = Vec::with_capacity(frames);
    for _ in 0..frames {
        car.apply_input(world, &DriverInput::default()).unwrap();
        car.step(world, DT, &ground).unwrap();
        heights.push(world.body(car.chassis()).unwrap().position.z);
    }
    heights
}

#[test]
fn dropped_car_settles() {
    let (mut world, mut car) = drop_car(1.0);
    let heights = simulate(&mut world, &mut car, 2.0);

    let chassis = world.body(car.chassis()).unwrap();
    assert!(chassis.velocity.z.abs() < 0.01, "vz = {}", chassis.velocity.z);

    // Rebounds after the first touchdown shrink.
    let touchdown = heights
        .windows(2)
        .position(|w| w[1] > w[0])
        .unwrap_or(heights.len());
    let peaks: Vec<f64> = heights[touchdown..]
        .windows(3)
        .filter(|w| w[1] > w[0] && w[1] >= w[2])
        .map(|w| w[1])
        .collect();
    for pair in peaks.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-6, "rebound grew: {peaks:?}");
    }

    // Height is stable over the last half second.
    let tail = &heights[heights.len() - 30..];
    let (lo, hi) = tail
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &z| (lo.min(z), hi.max(z)));
    assert!(hi - lo < 1e-3, "chassis still moving: {lo}..{hi}");
}

#[test]
fn settled_car_rests_on_its_wheels() {
    let (mut world, mut car) = drop_car(1.0);
    simulate(&mut world, &mut car, 2.0);

    let config = car.config();
    let rest = config.wheel_radius - config.wheel_offsets[0].z;
    let z = world.body(car.chassis()).unwrap().position.z;
    // Sag under load, but the chassis box stays clear of the ground.
    assert!(z < rest + 0.01, "z = {z}");
    assert!(z > config.chassis_half_extents.z, "z = {z}");

    for (wheel, telemetry) in car.wheels().iter().zip(car.telemetry()) {
        assert!(telemetry.in_contact, "{:?} airborne", wheel.position);
        assert!(telemetry.suspension_impulse > 0.0);
    }
    assert!(world.contact_for(car.chassis()).is_none());
}

#[test]
fn parked_car_stays_put() {
    let (mut world, car) = drop_car(0.0);
    let ground = FlatGround::new(0.0);
    for _ in 0..120 {
        world.step(DT, &ground, &()).unwrap();
    }

    let parked = world.body(car.chassis()).unwrap().position;
    let mut bodies = vec![car.chassis()];
    bodies.extend(car.wheels().iter().map(|w| w.body));
    for frame in 0..(30.0 / DT) as usize {
        world.step(DT, &ground, &()).unwrap();
        for &handle in &bodies {
            let speed = world.body(handle).unwrap().velocity.norm();
            assert!(speed < 1e-3, "{handle} at {speed} m/s after frame {frame}");
        }
    }

    let chassis = world.body(car.chassis()).unwrap();
    let drift = (chassis.position - parked).xy().norm();
    assert!(drift < 1e-3, "chassis drifted {drift} m");
    for wheel in car.wheels() {
        assert!(world.contact_for(wheel.body).unwrap().is_touching());
    }
}

#[test]
fn reset_mid_fall_returns_to_spawn() {
    let (mut world, mut car) = drop_car(1.0);
    simulate(&mut world, &mut car, 0.2);
    let input = DriverInput {
        reset: true,
        ..Default::default()
    };
    car.apply_input(&mut world, &input).unwrap();
    let chassis = world.body(car.chassis()).unwrap();
    assert_eq!(chassis.position, car.spawn());
    assert_eq!(chassis.velocity.norm(), 0.0);
}
