//! Rigid body state and the substep integrator.
//!
//! A [`RigidBody`] tracks its centre of mass in world space. During a frame
//! the solver never moves `position` directly: every substep accumulates into
//! `delta_position`, and [`RigidBody::finalize_position`] commits the delta
//! once after the last substep. Constraint bias terms therefore see a
//! consistent `position + delta_position` no matter which constraint is
//! solved first.
//!
//! The orientation is stored as a quaternion and the rotation matrix is
//! always re-derived from it, never integrated on its own.

use nalgebra::{Matrix3, Matrix4, Point3, Quaternion, UnitQuaternion, Vector3};

use crate::config::IntegrationParams;
use crate::error::SimError;
use crate::math::{integrate_rotation, quat_to_matrix, transform_matrix};
use crate::shape::MassProperties;
use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable index of a body in the world's body arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyHandle(pub usize);

impl BodyHandle {
    /// Create a new body handle.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index into the body arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for BodyHandle {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// A rigid body advanced by the substep solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBody {
    /// Handle of this body in its arena.
    pub id: BodyHandle,
    /// Mass in kg (0 for static bodies).
    pub mass: f64,
    /// `1 / mass`, or 0 for static bodies.
    pub inv_mass: f64,
    /// Linear velocity of the centre of mass (m/s).
    pub velocity: Vector3<f64>,
    /// Angular velocity in world space (rad/s).
    pub angular_velocity: Vector3<f64>,
    /// World-space centre of mass, committed once per frame.
    pub position: Point3<f64>,
    /// Translation accumulated over the substeps of the current frame.
    pub delta_position: Vector3<f64>,
    /// Centre of mass relative to the body origin, in body space.
    pub local_center: Vector3<f64>,
    /// Orientation quaternion (kept normalized).
    pub orientation: Quaternion<f64>,
    /// Rotation matrix derived from `orientation`.
    pub rotation: Matrix3<f64>,
    /// Inverse inertia tensor in body space (constant).
    pub inv_inertia_body: Matrix3<f64>,
    /// Inverse inertia tensor in world space, `R · I⁻¹ · Rᵀ`.
    pub inv_inertia_world: Matrix3<f64>,
    /// Friction coefficient of this body's surfaces.
    pub friction: f64,
    /// Number of collision shapes attached to this body.
    pub shape_count: usize,
}

impl RigidBody {
    /// Create a body from mass properties, placing its origin at `origin`.
    #[must_use]
    pub fn new(
        id: BodyHandle,
        props: &MassProperties,
        origin: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> Self {
        let orientation = *orientation.quaternion();
        let rotation = quat_to_matrix(&orientation);
        let inv_inertia_body = props.inverse_inertia();
        Self {
            id,
            mass: if props.is_static() { 0.0 } else { props.mass },
            inv_mass: props.inverse_mass(),
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            position: origin + rotation * props.center_of_mass,
            delta_position: Vector3::zeros(),
            local_center: props.center_of_mass,
            orientation,
            rotation,
            inv_inertia_body,
            inv_inertia_world: rotation * inv_inertia_body * rotation.transpose(),
            friction: 0.6,
            shape_count: 0,
        }
    }

    /// Create a static body at `origin`.
    #[must_use]
    pub fn fixed(id: BodyHandle, origin: Point3<f64>) -> Self {
        Self::new(
            id,
            &MassProperties::infinite(),
            origin,
            UnitQuaternion::identity(),
        )
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Whether the body has infinite mass.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Centre of mass including this frame's uncommitted translation.
    #[must_use]
    pub fn current_position(&self) -> Point3<f64> {
        self.position + self.delta_position
    }

    /// World-space body origin: `position − R · local_center`.
    #[must_use]
    pub fn origin(&self) -> Point3<f64> {
        self.position - self.rotation * self.local_center
    }

    /// World transform `translate(origin) · R`.
    #[must_use]
    pub fn transform(&self) -> Matrix4<f64> {
        transform_matrix(&self.origin(), &self.rotation)
    }

    /// Orientation as a unit quaternion.
    #[must_use]
    pub fn unit_orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::new_normalize(self.orientation)
    }

    /// World-space point for a body-space point given relative to the origin.
    #[must_use]
    pub fn world_point(&self, local: &Vector3<f64>) -> Point3<f64> {
        self.origin() + self.rotation * local
    }

    /// Lever arm from the centre of mass to a body-space point given relative
    /// to the origin, rotated into world space.
    #[must_use]
    pub fn lever_arm(&self, local_origin_anchor: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * (local_origin_anchor - self.local_center)
    }

    /// Body-space point (relative to the origin) of a world-space point.
    #[must_use]
    pub fn local_point(&self, world: &Point3<f64>) -> Vector3<f64> {
        self.rotation.transpose() * (world - self.origin())
    }

    /// Velocity of a point at lever arm `r` from the centre of mass.
    #[must_use]
    pub fn velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(r)
    }

    /// Re-derive the world-space inverse inertia from the current rotation.
    pub fn update_world_inertia(&mut self) {
        self.inv_inertia_world = self.rotation * self.inv_inertia_body * self.rotation.transpose();
    }

    /// Apply forces for one substep of length `h`.
    ///
    /// ```text
    /// F = −Kdl · v · |v| + m · g + external
    /// T = −Kda · ω
    /// ```
    pub fn integrate_velocities(
        &mut self,
        h: f64,
        params: &IntegrationParams,
        external_force: &Vector3<f64>,
    ) {
        if self.is_static() {
            return;
        }

        let v = self.velocity;
        let force = -v * (params.linear_drag * v.norm()) + params.gravity * self.mass + external_force;
        let torque = -self.angular_velocity * params.angular_damping;

        self.velocity += force * (self.inv_mass * h);
        self.update_world_inertia();
        self.angular_velocity += self.inv_inertia_world * torque * h;
    }

    /// Advance the accumulated translation and the orientation by `h`.
    pub fn integrate_positions(&mut self, h: f64) {
        if self.is_static() {
            return;
        }

        self.delta_position += self.velocity * h;
        self.orientation = integrate_rotation(&self.orientation, &self.angular_velocity, h);
        self.rotation = quat_to_matrix(&self.orientation);
    }

    /// Commit the frame's accumulated translation.
    pub fn finalize_position(&mut self) {
        self.position += self.delta_position;
        self.delta_position = Vector3::zeros();
    }

    /// Teleport the body origin and orientation, zeroing all motion.
    pub fn reset_to(&mut self, origin: Point3<f64>, orientation: UnitQuaternion<f64>) {
        self.orientation = *orientation.quaternion();
        self.rotation = quat_to_matrix(&self.orientation);
        self.position = origin + self.rotation * self.local_center;
        self.delta_position = Vector3::zeros();
        self.velocity = Vector3::zeros();
        self.angular_velocity = Vector3::zeros();
        self.update_world_inertia();
    }

    /// Check that no state component is `NaN` or `Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.iter().all(|x| x.is_finite())
            && self.position.coords.iter().all(|x| x.is_finite())
            && self.delta_position.iter().all(|x| x.is_finite())
            && self.orientation.coords.iter().all(|x| x.is_finite())
    }
}

/// Borrow two distinct bodies mutably.
///
/// # Errors
///
/// Returns [`SimError::InvalidJoint`] if `a == b` and
/// [`SimError::InvalidBodyId`] if either handle is outside `bodies`.
pub fn body_pair_mut(
    bodies: &mut [RigidBody],
    a: BodyHandle,
    b: BodyHandle,
) -> Result<(&mut RigidBody, &mut RigidBody)> {
    if a == b {
        return Err(SimError::invalid_joint(format!("both ends attached to {a}")));
    }
    let out_of_range = a.0.max(b.0);
    if out_of_range >= bodies.len() {
        return Err(SimError::InvalidBodyId(out_of_range));
    }
    if a.0 < b.0 {
        let (lo, hi) = bodies.split_at_mut(b.0);
        Ok((&mut lo[a.0], &mut hi[0]))
    } else {
        let (lo, hi) = bodies.split_at_mut(a.0);
        Ok((&mut hi[0], &mut lo[b.0]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_sphere() -> RigidBody {
        RigidBody::new(
            BodyHandle(0),
            &MassProperties::sphere(1.0, 0.5),
            Point3::origin(),
            UnitQuaternion::identity(),
        )
    }

    #[test]
    fn test_body_handle() {
        let id = BodyHandle::new(3);
        assert_eq!(id.index(), 3);
        assert_eq!(id.to_string(), "Body(3)");
        assert_eq!(BodyHandle::from(3), id);
    }

    #[test]
    fn inverse_mass_invariant() {
        let body = RigidBody::new(
            BodyHandle(0),
            &MassProperties::sphere(4.0, 1.0),
            Point3::origin(),
            UnitQuaternion::identity(),
        );
        assert_relative_eq!(body.inv_mass, 1.0 / body.mass, epsilon = f64::EPSILON);

        let ground = RigidBody::fixed(BodyHandle(1), Point3::origin());
        assert!(ground.is_static());
        assert_eq!(ground.inv_mass, 0.0);
        assert_eq!(ground.inv_inertia_world, Matrix3::zeros());
    }

    #[test]
    fn gravity_integration() {
        let mut body = unit_sphere();
        let params = IntegrationParams {
            gravity: Vector3::new(0.0, 0.0, -15.0),
            linear_drag: 0.0,
            angular_damping: 0.0,
        };
        let h = 1.0 / 480.0;
        body.integrate_velocities(h, &params, &Vector3::zeros());
        assert_relative_eq!(body.velocity, Vector3::new(0.0, 0.0, -15.0 * h), epsilon = 1e-12);
    }

    #[test]
    fn quadratic_drag_opposes_motion() {
        let mut body = unit_sphere().with_velocity(Vector3::new(10.0, 0.0, 0.0));
        let params = IntegrationParams {
            gravity: Vector3::zeros(),
            linear_drag: 0.1,
            angular_damping: 0.0,
        };
        body.integrate_velocities(0.01, &params, &Vector3::zeros());
        // dv = -0.1 * 10 * 10 * 0.01
        assert_relative_eq!(body.velocity.x, 9.9, epsilon = 1e-12);
    }

    #[test]
    fn angular_damping_slows_spin() {
        let mut body = unit_sphere();
        body.angular_velocity = Vector3::new(0.0, 0.0, 4.0);
        let params = IntegrationParams {
            gravity: Vector3::zeros(),
            linear_drag: 0.0,
            angular_damping: 0.5,
        };
        body.integrate_velocities(0.01, &params, &Vector3::zeros());
        // ω += I⁻¹ · (−Kda · ω) · h = 4 − 10 · 0.5 · 4 · 0.01
        assert_relative_eq!(body.angular_velocity.z, 3.8, epsilon = 1e-12);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut ground = RigidBody::fixed(BodyHandle(0), Point3::new(0.0, 0.0, 1.0));
        ground.integrate_velocities(0.1, &IntegrationParams::default(), &Vector3::new(5.0, 0.0, 0.0));
        ground.integrate_positions(0.1);
        ground.finalize_position();
        assert_eq!(ground.velocity, Vector3::zeros());
        assert_eq!(ground.position, Point3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn positions_commit_only_on_finalize() {
        let mut body = unit_sphere().with_velocity(Vector3::new(1.0, 0.0, 0.0));
        for _ in 0..4 {
            body.integrate_positions(0.25);
        }
        assert_eq!(body.position, Point3::origin());
        assert_relative_eq!(body.delta_position.x, 1.0, epsilon = 1e-12);

        body.finalize_position();
        assert_relative_eq!(body.position.x, 1.0, epsilon = 1e-12);
        assert_eq!(body.delta_position, Vector3::zeros());
    }

    #[test]
    fn rotation_tracks_orientation() {
        let mut body = unit_sphere();
        body.angular_velocity = Vector3::new(0.3, -1.2, 0.7);
        for _ in 0..100 {
            body.integrate_positions(0.01);
        }
        assert_relative_eq!(body.orientation.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.rotation, quat_to_matrix(&body.orientation), epsilon = 1e-12);
        assert_relative_eq!(
            body.rotation * body.rotation.transpose(),
            Matrix3::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn origin_accounts_for_local_center() {
        let props = MassProperties::new(2.0, Vector3::new(0.0, 0.0, 0.5), Matrix3::identity());
        let body = RigidBody::new(BodyHandle(0), &props, Point3::new(1.0, 2.0, 3.0), UnitQuaternion::identity());
        assert_relative_eq!(body.position, Point3::new(1.0, 2.0, 3.5), epsilon = 1e-12);
        assert_relative_eq!(body.origin(), Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);

        let t = body.transform();
        assert_relative_eq!(t[(0, 3)], 1.0);
        assert_relative_eq!(t[(2, 3)], 3.0);
    }

    #[test]
    fn reset_zeroes_motion() {
        let mut body = unit_sphere().with_velocity(Vector3::new(3.0, 0.0, 0.0));
        body.angular_velocity = Vector3::new(1.0, 0.0, 0.0);
        body.delta_position = Vector3::new(0.2, 0.0, 0.0);
        body.reset_to(Point3::new(0.0, 0.0, 2.0), UnitQuaternion::identity());
        assert_eq!(body.velocity, Vector3::zeros());
        assert_eq!(body.angular_velocity, Vector3::zeros());
        assert_eq!(body.delta_position, Vector3::zeros());
        assert_relative_eq!(body.position.z, 2.0);
    }

    #[test]
    fn pair_borrow_in_either_order() {
        let mut bodies = vec![unit_sphere(), unit_sphere(), unit_sphere()];
        {
            let (a, b) = body_pair_mut(&mut bodies, BodyHandle(2), BodyHandle(0)).unwrap();
            a.velocity.x = 2.0;
            b.velocity.x = 1.0;
        }
        assert_eq!(bodies[0].velocity.x, 1.0);
        assert_eq!(bodies[2].velocity.x, 2.0);
    }

    #[test]
    fn pair_borrow_reports_bad_handles() {
        let mut bodies = vec![unit_sphere(), unit_sphere()];
        let err = body_pair_mut(&mut bodies, BodyHandle(1), BodyHandle(1)).unwrap_err();
        assert!(matches!(err, SimError::InvalidJoint { .. }));
        assert!(err.to_string().contains("Body(1)"));

        let err = body_pair_mut(&mut bodies, BodyHandle(0), BodyHandle(5)).unwrap_err();
        assert_eq!(err, SimError::InvalidBodyId(5));
    }
}
