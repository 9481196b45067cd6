//! Hinge joint: two rotational degrees of freedom removed.
//!
//! Body B may only spin relative to body A about a shared axis. Translation
//! is left free; pair the hinge with a [`DistanceJoint`](crate::DistanceJoint)
//! to build an axle.
//!
//! # Formulation
//!
//! With `a1` the hinge axis fixed in A and `a2` the one fixed in B, pick two
//! unit vectors `b2, c2` perpendicular to `a2`. The axes are aligned when
//!
//! ```text
//! C = [a1 · b2, a1 · c2] = 0
//! Ċ = [(ω_B − ω_A) · (b2 × a1), (ω_B − ω_A) · (c2 × a1)]
//! ```
//!
//! which gives a 2×2 effective mass over the angular inertia of both bodies.
//!
//! # Motor and steering
//!
//! An optional [`HingeMotor`] drives the relative spin about `a1` with a
//! clamped accumulated impulse, solved ahead of the alignment rows. The axis
//! on A can be rotated about a steering axis, which is how front wheels turn.

use nalgebra::{Matrix2, UnitQuaternion, Vector2, Vector3};
use softstep_types::math::{invert_or_zero, invert_or_zero_2, normalize_or_self, perpendicular};
use softstep_types::{RigidBody, SimError, SoftnessParams};

use crate::base::JointBase;
use crate::motor::HingeMotor;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// `a1 · a2` at or below which the axes are treated as degenerate.
const DEGENERATE_DOT: f64 = 1.0e-3;

/// World-space axes derived from the current orientations.
#[derive(Debug, Clone, Copy)]
struct HingeAxes {
    a1: Vector3<f64>,
    b2xa1: Vector3<f64>,
    c2xa1: Vector3<f64>,
    /// `[a1 · b2, a1 · c2]`.
    error: Vector2<f64>,
}

/// Revolute joint with an optional velocity motor and steering offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HingeJoint {
    pub(crate) base: JointBase,
    local_axis_a: Vector3<f64>,
    local_axis_b: Vector3<f64>,
    /// Steering axis in A's body space.
    local_steer_axis: Vector3<f64>,
    steer_angle: f64,
    motor: HingeMotor,

    angular_impulse: Vector2<f64>,
    motor_impulse: f64,
    effective_mass: Matrix2<f64>,
    motor_mass: f64,
}

impl HingeJoint {
    /// Hinge `b` to `a` about the world-space `axis`.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        axis: &Vector3<f64>,
        softness: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        if axis.norm() < f64::EPSILON {
            return Err(SimError::invalid_joint("hinge axis must be non-zero"));
        }
        let axis = axis.normalize();

        Ok(Self {
            base: JointBase::new(a, b, &b.position, softness)?,
            local_axis_a: a.rotation.transpose() * axis,
            local_axis_b: b.rotation.transpose() * axis,
            local_steer_axis: Vector3::zeros(),
            steer_angle: 0.0,
            motor: HingeMotor::disabled(),
            angular_impulse: Vector2::zeros(),
            motor_impulse: 0.0,
            effective_mass: Matrix2::zeros(),
            motor_mass: 0.0,
        })
    }

    /// Attach a motor.
    #[must_use]
    pub fn with_motor(mut self, motor: HingeMotor) -> Self {
        self.motor = motor;
        self
    }

    /// Allow the axis on A to be steered about the world-space `steer_axis`.
    #[must_use]
    pub fn with_steering(mut self, a: &RigidBody, steer_axis: &Vector3<f64>) -> Self {
        self.local_steer_axis = a.rotation.transpose() * normalize_or_self(steer_axis);
        self
    }

    /// Rotate the axis on A by `angle` radians about the steering axis.
    pub fn set_steer_angle(&mut self, angle: f64) {
        self.steer_angle = angle;
    }

    /// Current steering angle (rad).
    #[must_use]
    pub fn steer_angle(&self) -> f64 {
        self.steer_angle
    }

    /// The motor settings.
    #[must_use]
    pub fn motor(&self) -> &HingeMotor {
        &self.motor
    }

    /// Mutable access to the motor settings.
    pub fn motor_mut(&mut self) -> &mut HingeMotor {
        &mut self.motor
    }

    /// Accumulated alignment impulse (N·m·s), one entry per removed axis.
    #[must_use]
    pub fn angular_impulse(&self) -> Vector2<f64> {
        self.angular_impulse
    }

    /// Accumulated motor impulse (N·m·s).
    #[must_use]
    pub fn motor_impulse(&self) -> f64 {
        self.motor_impulse
    }

    /// Shared joint state.
    #[must_use]
    pub fn base(&self) -> &JointBase {
        &self.base
    }

    /// Hinge axis on A in body space, including the steering offset.
    fn steered_local_axis(&self) -> Vector3<f64> {
        if self.steer_angle == 0.0 {
            return self.local_axis_a;
        }
        UnitQuaternion::from_scaled_axis(self.local_steer_axis * self.steer_angle) * self.local_axis_a
    }

    /// World-space hinge axis on A.
    #[must_use]
    pub fn world_axis(&self, a: &RigidBody) -> Vector3<f64> {
        a.rotation * self.steered_local_axis()
    }

    /// Relative angular speed of B about the hinge axis (rad/s).
    #[must_use]
    pub fn relative_speed(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        (b.angular_velocity - a.angular_velocity).dot(&self.world_axis(a))
    }

    fn axes(&self, a: &RigidBody, b: &RigidBody) -> HingeAxes {
        let a1 = self.world_axis(a);
        let mut a2 = b.rotation * self.local_axis_b;

        let dot = a1.dot(&a2);
        if dot <= DEGENERATE_DOT {
            tracing::trace!(dot, "hinge axes degenerate, blending in a perpendicular");
            let perp = a2 - a1 * dot;
            let perp = if perp.norm_squared() < 1.0e-12 {
                perpendicular(&a1)
            } else {
                perp.normalize()
            };
            a2 = normalize_or_self(&(perp * 0.99 + a1 * 0.01));
        }

        let b2 = perpendicular(&a2);
        let c2 = a2.cross(&b2);

        HingeAxes {
            a1,
            b2xa1: b2.cross(&a1),
            c2xa1: c2.cross(&a1),
            error: Vector2::new(a1.dot(&b2), a1.dot(&c2)),
        }
    }

    /// Cache effective masses and soft coefficients for this step.
    pub fn pre_solve(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.base.prepare(a, b, h);
        let axes = self.axes(a, b);
        let inv_i = self.base.inv_i_a + self.base.inv_i_b;

        let iu = inv_i * axes.b2xa1;
        let iv = inv_i * axes.c2xa1;
        let k = Matrix2::new(
            axes.b2xa1.dot(&iu),
            axes.b2xa1.dot(&iv),
            axes.c2xa1.dot(&iu),
            axes.c2xa1.dot(&iv),
        );
        self.effective_mass = invert_or_zero_2(&k);

        if self.motor.is_active() {
            self.motor_mass = invert_or_zero(axes.a1.dot(&(inv_i * axes.a1)));
            let max = self.motor.max_impulse(h);
            self.motor_impulse = self.motor_impulse.clamp(-max, max);
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }
    }

    /// Re-apply the accumulated alignment and motor impulses.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let axes = self.axes(a, b);
        let l = axes.b2xa1 * self.angular_impulse.x
            + axes.c2xa1 * self.angular_impulse.y
            + axes.a1 * self.motor_impulse;
        self.base.apply_angular(a, b, &l);
    }

    /// One soft iteration; the motor runs in both passes.
    pub fn solve(&mut self, a: &mut RigidBody, b: &mut RigidBody, h: f64, use_bias: bool) {
        if self.motor.is_active() {
            let a1 = self.world_axis(a);
            let cdot = (b.angular_velocity - a.angular_velocity).dot(&a1) - self.motor.target_speed();
            let impulse = -self.motor_mass * cdot;

            let max = self.motor.max_impulse(h);
            let old = self.motor_impulse;
            self.motor_impulse = (old + impulse).clamp(-max, max);
            let applied = self.motor_impulse - old;

            self.base.apply_angular(a, b, &(a1 * applied));
        }

        let axes = self.axes(a, b);
        let soft = self.base.softness.for_pass(use_bias);

        let w = b.angular_velocity - a.angular_velocity;
        let cdot = Vector2::new(w.dot(&axes.b2xa1), w.dot(&axes.c2xa1));
        let bias = axes.error * soft.bias_rate;

        let impulse = -(self.effective_mass * (cdot + bias)) * soft.mass_scale
            - self.angular_impulse * soft.impulse_scale;
        self.angular_impulse += impulse;

        let l = axes.b2xa1 * impulse.x + axes.c2xa1 * impulse.y;
        self.base.apply_angular(a, b, &l);
    }

    /// Sine of the angle between the two bodies' hinge axes.
    #[must_use]
    pub fn position_error(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let a1 = self.world_axis(a);
        let a2 = b.rotation * self.local_axis_b;
        a1.cross(&a2).norm()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_util::{ball, run_frames, H};
    use crate::Joint;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use softstep_types::BodyHandle;

    fn ground_and_wheel() -> (RigidBody, RigidBody) {
        (
            RigidBody::fixed(BodyHandle(0), Point3::origin()),
            ball(1, Point3::new(0.0, 0.0, 1.0)),
        )
    }

    #[test]
    fn rejects_zero_axis() {
        let (a, b) = ground_and_wheel();
        assert!(HingeJoint::new(&a, &b, &Vector3::zeros(), SoftnessParams::stiff()).is_err());
    }

    #[test]
    fn free_spin_about_axis_is_untouched() {
        let (mut a, mut b) = ground_and_wheel();
        b.angular_velocity = Vector3::new(0.0, 0.0, 3.0);
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff()).unwrap();
        hinge.pre_solve(&a, &b, H);
        hinge.warm_start(&mut a, &mut b);
        hinge.solve(&mut a, &mut b, H, true);
        hinge.solve(&mut a, &mut b, H, false);
        assert_relative_eq!(b.angular_velocity, Vector3::new(0.0, 0.0, 3.0), epsilon = 1e-9);
    }

    #[test]
    fn off_axis_spin_is_removed() {
        let (mut a, mut b) = ground_and_wheel();
        b.angular_velocity = Vector3::new(2.0, -1.0, 3.0);
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff()).unwrap();
        hinge.pre_solve(&a, &b, H);
        hinge.solve(&mut a, &mut b, H, false);
        assert_relative_eq!(b.angular_velocity.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.angular_velocity.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.angular_velocity.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn misalignment_converges() {
        let (a, mut b) = ground_and_wheel();
        let hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff()).unwrap();

        b.reset_to(
            b.origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.1),
        );
        let mut joint = Joint::from(hinge);
        let mut bodies = vec![a, b];
        let initial = joint.position_error(&bodies);
        assert!(initial > 0.09);

        let errors = run_frames(&mut joint, &mut bodies, 10);
        assert!(errors[0] < initial);
        assert!(*errors.last().unwrap() < 1e-3);
    }

    #[test]
    fn motor_impulse_is_clamped() {
        let (mut a, mut b) = ground_and_wheel();
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff())
            .unwrap()
            .with_motor(HingeMotor::velocity(100.0, 1.0));
        hinge.pre_solve(&a, &b, H);

        for _ in 0..4 {
            hinge.warm_start(&mut a, &mut b);
            hinge.solve(&mut a, &mut b, H, true);
            hinge.solve(&mut a, &mut b, H, false);
            assert!(hinge.motor_impulse().abs() <= H * 1.0 + 1e-15);
        }
        assert_relative_eq!(hinge.motor_impulse(), H, epsilon = 1e-12);
        assert!(b.angular_velocity.z > 0.0);
        assert!(b.angular_velocity.z < 100.0);
    }

    #[test]
    fn strong_motor_reaches_target_speed() {
        let (mut a, mut b) = ground_and_wheel();
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff())
            .unwrap()
            .with_motor(HingeMotor::velocity(5.0, 1.0e4));
        hinge.pre_solve(&a, &b, H);
        hinge.solve(&mut a, &mut b, H, true);
        assert_relative_eq!(hinge.relative_speed(&a, &b), 5.0, epsilon = 1e-9);

        hinge.motor_mut().braking = true;
        hinge.solve(&mut a, &mut b, H, true);
        assert_relative_eq!(hinge.relative_speed(&a, &b), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn disabled_motor_drops_its_impulse() {
        let (mut a, mut b) = ground_and_wheel();
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff())
            .unwrap()
            .with_motor(HingeMotor::velocity(5.0, 10.0));
        hinge.pre_solve(&a, &b, H);
        hinge.solve(&mut a, &mut b, H, true);
        assert!(hinge.motor_impulse() > 0.0);

        hinge.motor_mut().enabled = false;
        hinge.pre_solve(&a, &b, H);
        assert_eq!(hinge.motor_impulse(), 0.0);
    }

    #[test]
    fn steering_rotates_world_axis() {
        let (a, b) = ground_and_wheel();
        let mut hinge = HingeJoint::new(&a, &b, &-Vector3::x(), SoftnessParams::stiff())
            .unwrap()
            .with_steering(&a, &Vector3::z());
        hinge.set_steer_angle(std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(hinge.world_axis(&a), -Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(hinge.steer_angle(), std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn perpendicular_axes_stay_finite() {
        let (mut a, mut b) = ground_and_wheel();
        let mut hinge = HingeJoint::new(&a, &b, &Vector3::z(), SoftnessParams::stiff()).unwrap();
        b.reset_to(
            b.origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2),
        );
        b.angular_velocity = Vector3::new(0.5, 0.5, 0.5);
        hinge.pre_solve(&a, &b, H);
        hinge.warm_start(&mut a, &mut b);
        hinge.solve(&mut a, &mut b, H, true);
        hinge.solve(&mut a, &mut b, H, false);
        assert!(b.is_finite());
    }
}
