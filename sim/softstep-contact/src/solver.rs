//! Soft contact resolver with speculative contacts and box friction.
//!
//! Constraints are rebuilt from the manifold set once per frame by
//! [`ContactSolver::pre_solve`] and then iterated every substep. For the
//! normal row:
//!
//! - separation `s > 0` (approaching, not touching): speculative, `bias = s / h`
//!   with a rigid solve, so the contact only stops the approach that would
//!   close the gap within this substep
//! - `s ≤ 0` in the biased pass: soft push-out, `bias = max(β·s, −v_max)`
//! - `s ≤ 0` in the relax pass: rigid, no bias
//!
//! The accumulated normal impulse is clamped to be non-negative. Friction is
//! solved right after the normal row with a symmetric clamp
//! `|λ_t| ≤ μ · λ_n` using the normal impulse just computed.
//!
//! Lever arms are frozen in world space at `pre_solve` and do not turn with
//! the bodies over the substeps. The separation follows only the
//! centre-of-mass translation, so a rolling sphere keeps its support point
//! under the centre and the normal row exerts no torque on it.

use nalgebra::{Matrix3, Vector2, Vector3};
use softstep_types::math::invert_or_zero;
use softstep_types::{body_pair_mut, BodyHandle, RigidBody, SimError, Softness, SoftnessParams};

use crate::manifold::ManifoldSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning of the contact resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactSettings {
    /// Softness of the push-out (20 Hz, critically damped by default).
    pub softness: SoftnessParams,
    /// Largest push-out velocity the bias may request (m/s).
    pub max_pushout_velocity: f64,
    /// Gap below which a contact is tracked before touching (m).
    pub speculative_distance: f64,
}

impl Default for ContactSettings {
    fn default() -> Self {
        Self {
            softness: SoftnessParams::new(20.0, 1.0),
            max_pushout_velocity: 3.0,
            speculative_distance: 0.02,
        }
    }
}

impl ContactSettings {
    /// Set the push-out softness.
    #[must_use]
    pub fn with_softness(mut self, softness: SoftnessParams) -> Self {
        self.softness = softness;
        self
    }

    /// Set the maximum push-out velocity.
    #[must_use]
    pub fn with_max_pushout_velocity(mut self, velocity: f64) -> Self {
        self.max_pushout_velocity = velocity;
        self
    }

    /// Set the speculative distance.
    #[must_use]
    pub fn with_speculative_distance(mut self, distance: f64) -> Self {
        self.speculative_distance = distance;
        self
    }

    /// Validate the settings.
    pub fn validate(&self) -> softstep_types::Result<()> {
        self.softness.validate()?;
        if !(self.max_pushout_velocity.is_finite() && self.max_pushout_velocity > 0.0) {
            return Err(SimError::invalid_config(
                "max push-out velocity must be positive and finite",
            ));
        }
        if !(self.speculative_distance.is_finite() && self.speculative_distance >= 0.0) {
            return Err(SimError::invalid_config(
                "speculative distance must be non-negative and finite",
            ));
        }
        Ok(())
    }
}

/// Combined friction of two surfaces: `sqrt(μ_A + μ_B)`.
#[must_use]
pub fn mix_friction(friction_a: f64, friction_b: f64) -> f64 {
    (friction_a + friction_b).sqrt()
}

/// Per-frame constraint built from one manifold.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactConstraint {
    /// Contact id of the source manifold.
    pub contact_id: usize,
    /// First body.
    pub body_a: BodyHandle,
    /// Second body.
    pub body_b: BodyHandle,
    /// Unit normal from A to B.
    pub normal: Vector3<f64>,
    /// Friction directions.
    pub tangents: [Vector3<f64>; 2],
    /// Combined friction coefficient.
    pub friction: f64,
    /// Accumulated normal impulse (N·s).
    pub normal_impulse: f64,
    /// Accumulated friction impulses (N·s).
    pub tangent_impulse: Vector2<f64>,

    /// Lever arm from A's centre of mass, world space, fixed for the frame.
    anchor_a: Vector3<f64>,
    /// Lever arm from B's centre of mass, world space, fixed for the frame.
    anchor_b: Vector3<f64>,
    /// Separation at `pre_solve`.
    base_separation: f64,
    normal_mass: f64,
    tangent_mass: [f64; 2],
    inv_mass_a: f64,
    inv_mass_b: f64,
    inv_i_a: Matrix3<f64>,
    inv_i_b: Matrix3<f64>,
}

impl ContactConstraint {
    fn apply(
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

    fn row_mass(&self, r_a: &Vector3<f64>, r_b: &Vector3<f64>, dir: &Vector3<f64>) -> f64 {
        let ra_n = r_a.cross(dir);
        let rb_n = r_b.cross(dir);
        invert_or_zero(
            self.inv_mass_a
                + self.inv_mass_b
                + ra_n.dot(&(self.inv_i_a * ra_n))
                + rb_n.dot(&(self.inv_i_b * rb_n)),
        )
    }

    /// Current separation rebuilt from the frame's position deltas.
    fn current_separation(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        (b.delta_position - a.delta_position).dot(&self.normal) + self.base_separation
    }
}

/// Iterates the contact constraints of one frame.
#[derive(Debug, Clone, Default)]
pub struct ContactSolver {
    settings: ContactSettings,
    softness: Softness,
    constraints: Vec<ContactConstraint>,
}

impl ContactSolver {
    /// A solver with the given settings.
    #[must_use]
    pub fn new(settings: ContactSettings) -> Self {
        Self {
            settings,
            softness: Softness::RIGID,
            constraints: Vec::new(),
        }
    }

    /// The resolver settings.
    #[must_use]
    pub fn settings(&self) -> &ContactSettings {
        &self.settings
    }

    /// This frame's constraints.
    #[must_use]
    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    /// Rebuild the constraints from the live manifolds.
    pub fn pre_solve(&mut self, manifolds: &ManifoldSet, bodies: &[RigidBody], h: f64) {
        self.softness = self.settings.softness.resolve(h);
        self.constraints.clear();

        for m in manifolds.iter() {
            let a = &bodies[m.body_a.0];
            let b = &bodies[m.body_b.0];

            let mut c = ContactConstraint {
                contact_id: m.contact_id,
                body_a: m.body_a,
                body_b: m.body_b,
                normal: m.normal,
                tangents: [m.tangents.0, m.tangents.1],
                friction: mix_friction(a.friction, b.friction),
                normal_impulse: m.point.normal_impulse,
                tangent_impulse: m.point.tangent_impulse,
                anchor_a: a.lever_arm(&m.point.local_anchor_a),
                anchor_b: b.lever_arm(&m.point.local_anchor_b),
                base_separation: m.point.separation,
                normal_mass: 0.0,
                tangent_mass: [0.0; 2],
                inv_mass_a: a.inv_mass,
                inv_mass_b: b.inv_mass,
                inv_i_a: a.inv_inertia_world,
                inv_i_b: b.inv_inertia_world,
            };

            let (r_a, r_b) = (c.anchor_a, c.anchor_b);
            c.normal_mass = c.row_mass(&r_a, &r_b, &m.normal);
            c.tangent_mass = [
                c.row_mass(&r_a, &r_b, &c.tangents[0]),
                c.row_mass(&r_a, &r_b, &c.tangents[1]),
            ];

            self.constraints.push(c);
        }
    }

    /// Re-apply the accumulated normal and friction impulses.
    pub fn warm_start(&self, bodies: &mut [RigidBody]) -> softstep_types::Result<()> {
        for c in &self.constraints {
            let (a, b) = body_pair_mut(bodies, c.body_a, c.body_b)?;
            let (r_a, r_b) = (c.anchor_a, c.anchor_b);
            let p = c.normal * c.normal_impulse
                + c.tangents[0] * c.tangent_impulse.x
                + c.tangents[1] * c.tangent_impulse.y;
            c.apply(a, b, &r_a, &r_b, &p);
        }
        Ok(())
    }

    /// One pass over every contact; `use_bias` selects push-out or relax.
    pub fn solve(
        &mut self,
        bodies: &mut [RigidBody],
        inv_h: f64,
        use_bias: bool,
    ) -> softstep_types::Result<()> {
        let max_pushout = self.settings.max_pushout_velocity;
        let softness = self.softness;

        for c in &mut self.constraints {
            let (a, b) = body_pair_mut(bodies, c.body_a, c.body_b)?;
            let (r_a, r_b) = (c.anchor_a, c.anchor_b);

            // Normal.
            let s = c.current_separation(a, b);
            let (bias, mass_scale, impulse_scale) = if s > 0.0 {
                (s * inv_h, 1.0, 0.0)
            } else if use_bias {
                (
                    (softness.bias_rate * s).max(-max_pushout),
                    softness.mass_scale,
                    softness.impulse_scale,
                )
            } else {
                (0.0, 1.0, 0.0)
            };

            let vn = (b.velocity_at(&r_b) - a.velocity_at(&r_a)).dot(&c.normal);
            let impulse =
                -c.normal_mass * mass_scale * (vn + bias) - impulse_scale * c.normal_impulse;
            let old = c.normal_impulse;
            c.normal_impulse = (old + impulse).max(0.0);
            let p = c.normal * (c.normal_impulse - old);
            c.apply(a, b, &r_a, &r_b, &p);

            // Friction, bounded by the normal impulse just computed.
            let max_friction = c.friction * c.normal_impulse;
            for i in 0..2 {
                let t = c.tangents[i];
                let vt = (b.velocity_at(&r_b) - a.velocity_at(&r_a)).dot(&t);
                let impulse = -c.tangent_mass[i] * vt;
                let old = c.tangent_impulse[i];
                c.tangent_impulse[i] = (old + impulse).clamp(-max_friction, max_friction);
                let p = t * (c.tangent_impulse[i] - old);
                c.apply(a, b, &r_a, &r_b, &p);
            }
        }
        Ok(())
    }

    /// Write the accumulated impulses back for next frame's warm start.
    pub fn store_impulses(&self, manifolds: &mut ManifoldSet) {
        for c in &self.constraints {
            if let Some(m) = manifolds.get_mut(c.contact_id) {
                m.point.normal_impulse = c.normal_impulse;
                m.point.tangent_impulse = c.tangent_impulse;
            }
        }
    }
}
