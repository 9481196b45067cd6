//! Simulation world: body arena, collision shapes, joints and contacts.
//!
//! Body 0 is always the static ground body that terrain contacts attach to.
//! Bodies and joints are never removed, so their handles stay valid for the
//! life of the world.

use nalgebra::{Matrix4, Point3, UnitQuaternion};
use softstep_constraint::Joint;
use softstep_contact::{ContactManifold, ContactSolver, ManifoldSet};
use softstep_types::{BodyHandle, MassProperties, RigidBody, Shape, SimError};

use crate::config::WorldConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable index of a joint in the world's joint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointHandle(pub usize);

impl std::fmt::Display for JointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Joint({})", self.0)
    }
}

/// A collision shape and the body it is attached to.
///
/// The index of a `ShapeEntry` in the world is the stable id of the contact
/// it produces.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShapeEntry {
    /// Owning body.
    pub body: BodyHandle,
    /// Shape in the body's space.
    pub shape: Shape,
}

/// All simulation state.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) bodies: Vec<RigidBody>,
    pub(crate) shapes: Vec<ShapeEntry>,
    pub(crate) joints: Vec<Joint>,
    pub(crate) manifolds: ManifoldSet,
    pub(crate) contact_solver: ContactSolver,
    time: f64,
    step_count: u64,
}

impl World {
    /// Handle of the static ground body.
    pub const GROUND: BodyHandle = BodyHandle(0);

    /// An empty world holding only the ground body.
    pub fn new(config: WorldConfig) -> softstep_types::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            bodies: vec![RigidBody::fixed(Self::GROUND, Point3::origin())],
            shapes: Vec::new(),
            joints: Vec::new(),
            manifolds: ManifoldSet::new(config.max_contacts),
            contact_solver: ContactSolver::new(config.contacts),
            time: 0.0,
            step_count: 0,
        })
    }

    /// The world configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Simulated time (s).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub(crate) fn advance_time(&mut self, dt: f64) {
        self.time += dt;
        self.step_count += 1;
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Add a body with explicit mass properties.
    pub fn add_body(
        &mut self,
        props: &MassProperties,
        origin: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> softstep_types::Result<BodyHandle> {
        props.validate()?;
        let id = BodyHandle(self.bodies.len());
        self.bodies.push(RigidBody::new(id, props, origin, orientation));
        tracing::debug!(body = %id, mass = props.mass, "body added");
        Ok(id)
    }

    /// Add an immovable body at `origin`.
    pub fn add_static_body(&mut self, origin: Point3<f64>) -> BodyHandle {
        let id = BodyHandle(self.bodies.len());
        self.bodies.push(RigidBody::fixed(id, origin));
        tracing::debug!(body = %id, "static body added");
        id
    }

    /// Add a body whose mass comes from `shapes` at uniform `density`, and
    /// attach those shapes to it.
    pub fn add_body_from_shapes(
        &mut self,
        shapes: &[Shape],
        density: f64,
        origin: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> softstep_types::Result<BodyHandle> {
        if !(density.is_finite() && density > 0.0) {
            return Err(SimError::invalid_mass("density must be positive and finite"));
        }
        if self.shapes.len() + shapes.len() > self.manifolds.capacity() {
            return Err(SimError::ContactCapacityExceeded {
                capacity: self.manifolds.capacity(),
            });
        }
        let id = self.add_body(&MassProperties::from_shapes(shapes, density), origin, orientation)?;
        for shape in shapes {
            self.attach_shape(id, *shape)?;
        }
        Ok(id)
    }

    /// Attach a collision shape to `body`, returning its contact id.
    pub fn attach_shape(&mut self, body: BodyHandle, shape: Shape) -> softstep_types::Result<usize> {
        let target = self
            .bodies
            .get_mut(body.0)
            .ok_or(SimError::InvalidBodyId(body.0))?;
        if self.shapes.len() >= self.manifolds.capacity() {
            return Err(SimError::ContactCapacityExceeded {
                capacity: self.manifolds.capacity(),
            });
        }
        target.shape_count += 1;
        self.shapes.push(ShapeEntry { body, shape });
        Ok(self.shapes.len() - 1)
    }

    /// Number of bodies, including the ground.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Get a body.
    #[must_use]
    pub fn body(&self, id: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    /// Get a body mutably.
    pub fn body_mut(&mut self, id: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    /// Borrow two bodies, for joint construction.
    pub fn body_pair(
        &self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> softstep_types::Result<(&RigidBody, &RigidBody)> {
        let body_a = self.body(a).ok_or(SimError::InvalidBodyId(a.0))?;
        let body_b = self.body(b).ok_or(SimError::InvalidBodyId(b.0))?;
        Ok((body_a, body_b))
    }

    /// All bodies in handle order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// All collision shapes in contact-id order.
    #[must_use]
    pub fn shapes(&self) -> &[ShapeEntry] {
        &self.shapes
    }

    /// World transform of a body: `translate(origin) · R`.
    #[must_use]
    pub fn transform(&self, id: BodyHandle) -> Option<Matrix4<f64>> {
        self.body(id).map(RigidBody::transform)
    }

    /// Teleport a body and zero its motion.
    pub fn reset_body(
        &mut self,
        id: BodyHandle,
        origin: Point3<f64>,
        orientation: UnitQuaternion<f64>,
    ) -> softstep_types::Result<()> {
        let body = self.body_mut(id).ok_or(SimError::InvalidBodyId(id.0))?;
        body.reset_to(origin, orientation);
        Ok(())
    }

    // =========================================================================
    // Joints
    // =========================================================================

    /// Add a joint. Joints are solved in insertion order.
    pub fn add_joint(&mut self, joint: impl Into<Joint>) -> softstep_types::Result<JointHandle> {
        let joint = joint.into();
        let (a, b) = joint.bodies();
        if a.0 >= self.bodies.len() {
            return Err(SimError::InvalidBodyId(a.0));
        }
        if b.0 >= self.bodies.len() {
            return Err(SimError::InvalidBodyId(b.0));
        }
        if a == b {
            return Err(SimError::invalid_joint(format!("both ends attached to {a}")));
        }

        let id = JointHandle(self.joints.len());
        tracing::debug!(joint = %id, kind = %joint.kind(), %a, %b, "joint added");
        self.joints.push(joint);
        Ok(id)
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Get a joint.
    #[must_use]
    pub fn joint(&self, id: JointHandle) -> Option<&Joint> {
        self.joints.get(id.0)
    }

    /// Get a joint mutably (to drive motors or steering between steps).
    pub fn joint_mut(&mut self, id: JointHandle) -> Option<&mut Joint> {
        self.joints.get_mut(id.0)
    }

    /// All joints in solve order.
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    /// Live contact manifolds.
    #[must_use]
    pub fn manifolds(&self) -> &ManifoldSet {
        &self.manifolds
    }

    /// The live contact involving `body`, if any.
    #[must_use]
    pub fn contact_for(&self, body: BodyHandle) -> Option<&ContactManifold> {
        self.manifolds.for_body(body)
    }

    /// Forget every contact and its impulse history.
    pub fn clear_contacts(&mut self) {
        self.manifolds.clear();
    }

    /// Check that every body state is finite.
    pub fn validate(&self) -> softstep_types::Result<()> {
        for body in &self.bodies {
            if !body.is_finite() {
                return Err(SimError::diverged(format!(
                    "{} has non-finite state",
                    body.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use softstep_constraint::DistanceJoint;
    use softstep_types::SoftnessParams;

    #[test]
    fn ground_is_body_zero() {
        let world = World::new(WorldConfig::default()).unwrap();
        assert_eq!(world.body_count(), 1);
        assert!(world.body(World::GROUND).unwrap().is_static());
        assert!(World::new(WorldConfig::default().with_sub_steps(0)).is_err());
    }

    #[test]
    fn static_bodies_never_move() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let post = world.add_static_body(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(post, BodyHandle(1));
        let body = world.body(post).unwrap();
        assert!(body.is_static());
        assert_eq!(body.inv_mass, 0.0);
    }

    #[test]
    fn shapes_define_mass_and_contact_ids() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let shapes = [Shape::sphere(Vector3::zeros(), 0.5)];
        let b = world
            .add_body_from_shapes(&shapes, 1000.0, Point3::new(0.0, 0.0, 2.0), UnitQuaternion::identity())
            .unwrap();
        let body = world.body(b).unwrap();
        let volume = 4.0 / 3.0 * std::f64::consts::PI * 0.125;
        assert_relative_eq!(body.mass, 1000.0 * volume, epsilon = 1e-9);
        assert_eq!(body.shape_count, 1);
        assert_eq!(world.shapes()[0].body, b);

        assert!(world
            .add_body_from_shapes(&shapes, -1.0, Point3::origin(), UnitQuaternion::identity())
            .is_err());
    }

    #[test]
    fn shape_count_is_bounded_by_contact_capacity() {
        let mut world = World::new(WorldConfig::default().with_max_contacts(1)).unwrap();
        let b = world
            .add_body(&MassProperties::sphere(1.0, 0.5), Point3::origin(), UnitQuaternion::identity())
            .unwrap();
        world.attach_shape(b, Shape::sphere(Vector3::zeros(), 0.5)).unwrap();
        let err = world
            .attach_shape(b, Shape::sphere(Vector3::zeros(), 0.5))
            .unwrap_err();
        assert_eq!(err, SimError::ContactCapacityExceeded { capacity: 1 });
        assert_eq!(
            world.attach_shape(BodyHandle(9), Shape::sphere(Vector3::zeros(), 0.5)),
            Err(SimError::InvalidBodyId(9))
        );
    }

    #[test]
    fn joints_must_reference_known_bodies() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let b = world
            .add_body(&MassProperties::sphere(1.0, 0.5), Point3::new(0.0, 0.0, 1.0), UnitQuaternion::identity())
            .unwrap();
        let (ground, ball) = world.body_pair(World::GROUND, b).unwrap();
        let joint = DistanceJoint::new(ground, ball, &Point3::origin(), SoftnessParams::stiff()).unwrap();
        let id = world.add_joint(joint.clone()).unwrap();
        assert_eq!(id, JointHandle(0));
        assert_eq!(id.to_string(), "Joint(0)");
        assert!(world.joint(id).unwrap().as_distance().is_some());

        let mut small = World::new(WorldConfig::default()).unwrap();
        assert_eq!(small.add_joint(joint), Err(SimError::InvalidBodyId(1)));
    }

    #[test]
    fn reset_and_transform() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let b = world
            .add_body(&MassProperties::sphere(1.0, 0.5), Point3::origin(), UnitQuaternion::identity())
            .unwrap();
        world.body_mut(b).unwrap().velocity = Vector3::new(1.0, 2.0, 3.0);
        world
            .reset_body(b, Point3::new(4.0, 5.0, 6.0), UnitQuaternion::identity())
            .unwrap();
        let t = world.transform(b).unwrap();
        assert_relative_eq!(t[(0, 3)], 4.0);
        assert_relative_eq!(t[(2, 3)], 6.0);
        assert_eq!(world.body(b).unwrap().velocity, Vector3::zeros());
    }

    #[test]
    fn non_finite_state_is_reported() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let b = world
            .add_body(&MassProperties::sphere(1.0, 0.5), Point3::origin(), UnitQuaternion::identity())
            .unwrap();
        assert!(world.validate().is_ok());
        world.body_mut(b).unwrap().velocity.x = f64::NAN;
        assert!(world.validate().unwrap_err().is_diverged());
    }
}
