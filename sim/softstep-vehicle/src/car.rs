//! Car assembly and per-frame driving.
//!
//! A car is five bodies: a chassis box and four sphere wheels. Each wheel
//! hangs from the chassis on two joints:
//!
//! - a soft [`DistanceJoint`] at the wheel centre, which is the suspension
//! - a [`HingeJoint`] about the chassis −X axis, which is the axle
//!
//! With the axle along −X a positive motor speed rolls the car forward (+Y).
//! Front axles can be steered about the chassis Z axis; rear axles carry the
//! drive motor. All four brake.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use softstep_core::{
    BodyHandle, DistanceJoint, HingeJoint, Joint, JointHandle, RigidBody, Shape, SimError,
    StepReport, Terrain, World,
};
use softstep_types::math::normalize_or_self;

use crate::config::CarConfig;
use crate::input::DriverInput;
use crate::load::WheelLoad;
use crate::telemetry::{engine_rpm, slip_ratio, WheelTelemetry};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest frame the car will simulate in one step (s).
pub const MAX_FRAME_DELTA: f64 = 1.0 / 30.0;

/// Limit a frame delta to [`MAX_FRAME_DELTA`].
///
/// Non-finite deltas pass through so the world step can reject them.
#[must_use]
pub fn clamp_frame_delta(dt: f64) -> f64 {
    if dt > MAX_FRAME_DELTA {
        tracing::trace!(dt, max = MAX_FRAME_DELTA, "frame delta clamped");
        MAX_FRAME_DELTA
    } else {
        dt
    }
}

/// Where a wheel sits on the car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WheelPosition {
    /// Front left.
    FrontLeft,
    /// Front right.
    FrontRight,
    /// Rear left.
    RearLeft,
    /// Rear right.
    RearRight,
}

impl WheelPosition {
    /// All positions, in wheel order.
    pub const ALL: [Self; 4] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::RearLeft,
        Self::RearRight,
    ];

    /// Index into per-wheel arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this is a steered wheel.
    #[must_use]
    pub const fn is_front(self) -> bool {
        matches!(self, Self::FrontLeft | Self::FrontRight)
    }

    /// Whether this is a driven wheel.
    #[must_use]
    pub const fn is_rear(self) -> bool {
        !self.is_front()
    }
}

/// Handles of one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Wheel {
    /// Where the wheel sits.
    pub position: WheelPosition,
    /// The wheel body.
    pub body: BodyHandle,
    /// Suspension joint.
    pub suspension: JointHandle,
    /// Axle joint.
    pub axle: JointHandle,
}

/// A car living in a [`World`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Car {
    config: CarConfig,
    spawn: Point3<f64>,
    chassis: BodyHandle,
    wheels: [Wheel; 4],
    telemetry: [WheelTelemetry; 4],
    engine_rpm: f64,
}

/// Build a car with its chassis origin at `spawn`.
pub fn create_car(
    world: &mut World,
    config: &CarConfig,
    spawn: Point3<f64>,
) -> softstep_core::Result<Car> {
    config.validate()?;

    let chassis = world.add_body_from_shapes(
        &[Shape::cuboid(Vector3::zeros(), config.chassis_half_extents)],
        config.chassis_density,
        spawn,
        UnitQuaternion::identity(),
    )?;
    set_friction(world, chassis, config.chassis_friction)?;

    let wheels = [
        add_wheel(world, config, chassis, spawn, WheelPosition::FrontLeft)?,
        add_wheel(world, config, chassis, spawn, WheelPosition::FrontRight)?,
        add_wheel(world, config, chassis, spawn, WheelPosition::RearLeft)?,
        add_wheel(world, config, chassis, spawn, WheelPosition::RearRight)?,
    ];

    tracing::debug!(%chassis, x = spawn.x, y = spawn.y, z = spawn.z, "car created");
    Ok(Car {
        config: *config,
        spawn,
        chassis,
        wheels,
        telemetry: [WheelTelemetry::default(); 4],
        engine_rpm: config.idle_rpm,
    })
}

fn set_friction(world: &mut World, body: BodyHandle, friction: f64) -> softstep_core::Result<()> {
    world
        .body_mut(body)
        .ok_or(SimError::InvalidBodyId(body.0))?
        .friction = friction;
    Ok(())
}

fn add_wheel(
    world: &mut World,
    config: &CarConfig,
    chassis: BodyHandle,
    spawn: Point3<f64>,
    position: WheelPosition,
) -> softstep_core::Result<Wheel> {
    let offset = config.wheel_offsets[position.index()];
    let body = world.add_body_from_shapes(
        &[Shape::sphere(Vector3::zeros(), config.wheel_radius)],
        config.wheel_density,
        spawn + offset,
        UnitQuaternion::identity(),
    )?;
    set_friction(world, body, config.wheel_friction)?;

    let (a, b) = world.body_pair(chassis, body)?;
    let suspension = DistanceJoint::new(a, b, &b.position, config.suspension)?;
    let mut axle = HingeJoint::new(a, b, &-Vector3::x(), config.axle)?;
    if position.is_front() {
        axle = axle.with_steering(a, &Vector3::z());
    }

    Ok(Wheel {
        position,
        body,
        suspension: world.add_joint(suspension)?,
        axle: world.add_joint(axle)?,
    })
}

fn body(world: &World, id: BodyHandle) -> softstep_core::Result<&RigidBody> {
    world.body(id).ok_or(SimError::InvalidBodyId(id.0))
}

fn hinge(world: &World, id: JointHandle) -> softstep_core::Result<&HingeJoint> {
    world
        .joint(id)
        .and_then(Joint::as_hinge)
        .ok_or(SimError::InvalidJointId(id.0))
}

fn hinge_mut(world: &mut World, id: JointHandle) -> softstep_core::Result<&mut HingeJoint> {
    world
        .joint_mut(id)
        .and_then(Joint::as_hinge_mut)
        .ok_or(SimError::InvalidJointId(id.0))
}

impl Car {
    /// The configuration the car was built with.
    #[must_use]
    pub fn config(&self) -> &CarConfig {
        &self.config
    }

    /// Chassis body.
    #[must_use]
    pub fn chassis(&self) -> BodyHandle {
        self.chassis
    }

    /// Wheels, ordered front-left, front-right, rear-left, rear-right.
    #[must_use]
    pub fn wheels(&self) -> &[Wheel; 4] {
        &self.wheels
    }

    /// Where the car is reset to.
    #[must_use]
    pub fn spawn(&self) -> Point3<f64> {
        self.spawn
    }

    /// Telemetry from the last [`Car::step`].
    #[must_use]
    pub fn telemetry(&self) -> &[WheelTelemetry; 4] {
        &self.telemetry
    }

    /// Engine speed from the last [`Car::step`] (rpm).
    #[must_use]
    pub fn engine_rpm(&self) -> f64 {
        self.engine_rpm
    }

    /// Chassis velocity along its forward axis (m/s).
    pub fn forward_speed(&self, world: &World) -> softstep_core::Result<f64> {
        let chassis = body(world, self.chassis)?;
        Ok(chassis.velocity.dot(&(chassis.rotation * Vector3::y())))
    }

    /// Chassis world transform.
    pub fn chassis_transform(&self, world: &World) -> softstep_core::Result<Matrix4<f64>> {
        Ok(body(world, self.chassis)?.transform())
    }

    /// Wheel world transforms in wheel order.
    pub fn wheel_transforms(&self, world: &World) -> softstep_core::Result<[Matrix4<f64>; 4]> {
        let mut transforms = [Matrix4::identity(); 4];
        for (t, wheel) in transforms.iter_mut().zip(&self.wheels) {
            *t = body(world, wheel.body)?.transform();
        }
        Ok(transforms)
    }

    /// Map driver input onto steering and wheel motors.
    ///
    /// A set `reset` flag resets the car and ignores the rest of the input.
    pub fn apply_input(&mut self, world: &mut World, input: &DriverInput) -> softstep_core::Result<()> {
        if input.reset {
            return self.reset(world);
        }

        let input = input.clamped();
        let forward_speed = self.forward_speed(world)?;
        let steer = input.steer * self.config.max_steer_angle;

        for wheel in &self.wheels {
            let motor = input.motor_for(&self.config, wheel.position, forward_speed);
            let axle = hinge_mut(world, wheel.axle)?;
            if wheel.position.is_front() {
                axle.set_steer_angle(steer);
            }
            *axle.motor_mut() = motor;
        }
        Ok(())
    }

    /// Put the car back at its spawn point, upright and at rest.
    ///
    /// Joint and contact impulses are kept; they fade once motion stops.
    pub fn reset(&mut self, world: &mut World) -> softstep_core::Result<()> {
        world.reset_body(self.chassis, self.spawn, UnitQuaternion::identity())?;
        for wheel in &self.wheels {
            let offset = self.config.wheel_offsets[wheel.position.index()];
            world.reset_body(wheel.body, self.spawn + offset, UnitQuaternion::identity())?;
            hinge_mut(world, wheel.axle)?.set_steer_angle(0.0);
        }
        self.telemetry = [WheelTelemetry::default(); 4];
        self.engine_rpm = self.config.idle_rpm;
        tracing::debug!(chassis = %self.chassis, "car reset");
        Ok(())
    }

    /// Advance the world by one frame of at most [`MAX_FRAME_DELTA`], with
    /// wheel loads applied, and refresh the telemetry.
    pub fn step<T>(&mut self, world: &mut World, dt: f64, terrain: &T) -> softstep_core::Result<StepReport>
    where
        T: Terrain + ?Sized,
    {
        let load = WheelLoad::new(&self.config, self.wheels.map(|w| w.body));
        let report = world.step(clamp_frame_delta(dt), terrain, &load)?;
        self.refresh_telemetry(world)?;
        Ok(report)
    }

    fn refresh_telemetry(&mut self, world: &World) -> softstep_core::Result<()> {
        let chassis = body(world, self.chassis)?;
        let mut drive_speed = 0.0;

        for (wheel, telemetry) in self.wheels.iter().zip(self.telemetry.iter_mut()) {
            let wheel_body = body(world, wheel.body)?;
            let axle = hinge(world, wheel.axle)?;
            let suspension = world
                .joint(wheel.suspension)
                .and_then(Joint::as_distance)
                .ok_or(SimError::InvalidJointId(wheel.suspension.0))?;

            let angular_speed = axle.relative_speed(chassis, wheel_body);
            let forward = normalize_or_self(&axle.world_axis(chassis).cross(&Vector3::z()));
            let forward_speed = chassis.velocity.dot(&forward);

            *telemetry = WheelTelemetry {
                slip_ratio: slip_ratio(angular_speed * self.config.wheel_radius, forward_speed),
                angular_speed,
                suspension_impulse: suspension.linear_impulse().norm(),
                hinge_impulse: axle.angular_impulse().norm(),
                motor_impulse: axle.motor_impulse(),
                in_contact: world
                    .contact_for(wheel.body)
                    .is_some_and(|c| c.is_touching()),
            };

            if wheel.position.is_rear() {
                drive_speed += 0.5 * angular_speed;
            }
        }

        self.engine_rpm = engine_rpm(&self.config, drive_speed);
        Ok(())
    }
}
