//! State shared by every joint: endpoints, anchors and per-step caches.

use nalgebra::{Matrix3, Point3, Vector3};
use softstep_types::{BodyHandle, RigidBody, SimError, Softness, SoftnessParams};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Endpoints, anchors and the quantities cached by `pre_solve`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointBase {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    /// Anchor on A in body space, relative to A's origin.
    pub(crate) local_origin_anchor_a: Vector3<f64>,
    /// Anchor on B in body space, relative to B's origin.
    pub(crate) local_origin_anchor_b: Vector3<f64>,
    pub(crate) softness_params: SoftnessParams,

    pub(crate) inv_mass_a: f64,
    pub(crate) inv_mass_b: f64,
    pub(crate) inv_i_a: Matrix3<f64>,
    pub(crate) inv_i_b: Matrix3<f64>,
    /// `position_b − position_a` at `pre_solve` time.
    pub(crate) delta_center: Vector3<f64>,
    pub(crate) softness: Softness,
}

impl JointBase {
    /// Anchor both bodies at the same world point.
    pub(crate) fn new(
        a: &RigidBody,
        b: &RigidBody,
        world_anchor: &Point3<f64>,
        softness_params: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        if a.id == b.id {
            return Err(SimError::invalid_joint(format!(
                "both ends attached to {}",
                a.id
            )));
        }
        softness_params.validate()?;

        Ok(Self {
            body_a: a.id,
            body_b: b.id,
            local_origin_anchor_a: a.local_point(world_anchor),
            local_origin_anchor_b: b.local_point(world_anchor),
            softness_params,
            inv_mass_a: a.inv_mass,
            inv_mass_b: b.inv_mass,
            inv_i_a: a.inv_inertia_world,
            inv_i_b: b.inv_inertia_world,
            delta_center: b.position - a.position,
            softness: Softness::RIGID,
        })
    }

    /// Cache masses, world inertias, the centre offset and soft coefficients.
    pub(crate) fn prepare(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.inv_mass_a = a.inv_mass;
        self.inv_mass_b = b.inv_mass;
        self.inv_i_a = a.inv_inertia_world;
        self.inv_i_b = b.inv_inertia_world;
        self.delta_center = b.position - a.position;
        self.softness = self.softness_params.resolve(h);
    }

    /// Current lever arms from each centre of mass to its anchor.
    pub(crate) fn lever_arms(&self, a: &RigidBody, b: &RigidBody) -> (Vector3<f64>, Vector3<f64>) {
        (
            a.lever_arm(&self.local_origin_anchor_a),
            b.lever_arm(&self.local_origin_anchor_b),
        )
    }

    /// Vector from anchor A to anchor B, rebuilt from this frame's deltas.
    pub(crate) fn separation(
        &self,
        a: &RigidBody,
        b: &RigidBody,
        r_a: &Vector3<f64>,
        r_b: &Vector3<f64>,
    ) -> Vector3<f64> {
        (b.delta_position - a.delta_position) + self.delta_center + (r_b - r_a)
    }

    /// Vector from anchor A to anchor B measured from absolute positions.
    pub(crate) fn current_separation(
        &self,
        a: &RigidBody,
        b: &RigidBody,
        r_a: &Vector3<f64>,
        r_b: &Vector3<f64>,
    ) -> Vector3<f64> {
        (b.current_position() + r_b) - (a.current_position() + r_a)
    }

    /// Apply a linear impulse `p` at the anchors (+p on B, −p on A).
    pub(crate) fn apply_linear(
        &self,
        a: &mut RigidBody,
        b: &mut RigidBody,
        r_a: &Vector3<f64>,
        r_b: &Vector3<f64>,
        p: &Vector3<f64>,
    ) {
        a.velocity -= p * self.inv_mass_a;
        a.angular_velocity -= self.inv_i_a * r_a.cross(p);
        b.velocity += p * self.inv_mass_b;
        b.angular_velocity += self.inv_i_b * r_b.cross(p);
    }

    /// Apply an angular impulse `l` (+l on B, −l on A).
    pub(crate) fn apply_angular(&self, a: &mut RigidBody, b: &mut RigidBody, l: &Vector3<f64>) {
        a.angular_velocity -= self.inv_i_a * l;
        b.angular_velocity += self.inv_i_b * l;
    }

    /// The bodies this joint connects.
    #[must_use]
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    /// Softness parameters of the positional correction.
    #[must_use]
    pub fn softness_params(&self) -> SoftnessParams {
        self.softness_params
    }
}
