//! The per-frame step.
//!
//! One call to [`World::step`] advances the world by `dt`:
//!
//! 1. Refresh contact manifolds against the terrain
//! 2. `pre_solve` every joint, then every contact, once for the frame
//! 3. For each of `sub_steps` substeps of length `h = dt / sub_steps`:
//!    integrate velocities, warm start joints then contacts, solve joints
//!    then contacts with bias, integrate positions, solve joints then
//!    contacts again without bias (relax)
//! 4. Commit positions and store contact impulses for the next frame
//!
//! Joints and contacts are solved sequentially in insertion order, each
//! reading the velocities the previous one wrote.

use nalgebra::{Point3, Vector3};
use softstep_contact::ContactManifold;
use softstep_types::{RigidBody, SimError};

use crate::terrain::Terrain;
use crate::world::World;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Extra force applied to bodies during velocity integration.
///
/// Called once per dynamic body per substep, with the contact the body is
/// part of (if any). Gravity and drag are applied separately.
pub trait ExternalForces {
    /// World-space force (N) on the centre of mass of `body`.
    fn force(&self, body: &RigidBody, contact: Option<&ContactManifold>) -> Vector3<f64>;
}

impl ExternalForces for () {
    fn force(&self, _body: &RigidBody, _contact: Option<&ContactManifold>) -> Vector3<f64> {
        Vector3::zeros()
    }
}

impl<T: ExternalForces + ?Sized> ExternalForces for &T {
    fn force(&self, body: &RigidBody, contact: Option<&ContactManifold>) -> Vector3<f64> {
        (**self).force(body, contact)
    }
}

/// Summary of one completed step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepReport {
    /// Live contacts during the step.
    pub contacts: usize,
    /// Substeps taken.
    pub sub_steps: usize,
    /// Substep length (s).
    pub h: f64,
    /// Simulated time after the step (s).
    pub time: f64,
}

impl World {
    /// Advance the world by `dt` seconds.
    ///
    /// # Errors
    ///
    /// - [`SimError::InvalidTimestep`] if `dt` is not positive and finite
    /// - [`SimError::ContactCapacityExceeded`] if contact discovery overflows
    /// - [`SimError::Diverged`] if any body ends the step with `NaN` or `Inf`
    ///   state
    pub fn step<T, F>(&mut self, dt: f64, terrain: &T, forces: &F) -> softstep_types::Result<StepReport>
    where
        T: Terrain + ?Sized,
        F: ExternalForces + ?Sized,
    {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }

        let sub_steps = self.config.sub_steps;
        #[allow(clippy::cast_precision_loss)]
        let h = dt / sub_steps as f64;
        let inv_h = 1.0 / h;

        self.update_contacts(terrain)?;

        for joint in &mut self.joints {
            joint.pre_solve(&self.bodies, h);
        }
        self.contact_solver
            .pre_solve(&self.manifolds, &self.bodies, h);

        let integration = self.config.integration;
        for _ in 0..sub_steps {
            for body in &mut self.bodies {
                if body.is_static() {
                    continue;
                }
                let force = forces.force(body, self.manifolds.for_body(body.id));
                body.integrate_velocities(h, &integration, &force);
            }

            for joint in &self.joints {
                joint.warm_start(&mut self.bodies)?;
            }
            self.contact_solver.warm_start(&mut self.bodies)?;

            for joint in &mut self.joints {
                joint.solve(&mut self.bodies, h, true)?;
            }
            self.contact_solver.solve(&mut self.bodies, inv_h, true)?;

            for body in &mut self.bodies {
                body.integrate_positions(h);
            }

            for joint in &mut self.joints {
                joint.solve(&mut self.bodies, h, false)?;
            }
            self.contact_solver.solve(&mut self.bodies, inv_h, false)?;
        }

        for body in &mut self.bodies {
            body.finalize_position();
            body.update_world_inertia();
        }
        self.contact_solver.store_impulses(&mut self.manifolds);

        if let Err(err) = self.validate() {
            tracing::warn!(time = self.time(), %err, "simulation diverged");
            return Err(err);
        }

        self.advance_time(dt);
        let report = StepReport {
            contacts: self.manifolds.len(),
            sub_steps,
            h,
            time: self.time(),
        };
        tracing::trace!(
            step = self.step_count(),
            time = report.time,
            contacts = report.contacts,
            "step complete"
        );
        Ok(report)
    }

    /// Step repeatedly until `duration` seconds have been simulated.
    ///
    /// Returns the number of steps taken.
    ///
    /// # Errors
    ///
    /// Returns the first error any step produces.
    pub fn run_for<T, F>(
        &mut self,
        duration: f64,
        dt: f64,
        terrain: &T,
        forces: &F,
    ) -> softstep_types::Result<u64>
    where
        T: Terrain + ?Sized,
        F: ExternalForces + ?Sized,
    {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidTimestep(dt));
        }
        let end = self.time() + duration;
        let mut steps = 0;
        // Half a step of slack absorbs accumulated rounding in `time`.
        while self.time() + 0.5 * dt < end {
            self.step(dt, terrain, forces)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Match every shape against the terrain, creating, refreshing or
    /// dropping its manifold.
    ///
    /// A shape's representative point is its deepest contact candidate; for
    /// spheres the candidate is pushed out to the surface along the terrain
    /// normal. Shapes closer than the speculative distance keep a manifold.
    pub(crate) fn update_contacts<T>(&mut self, terrain: &T) -> softstep_types::Result<()>
    where
        T: Terrain + ?Sized,
    {
        let speculative = self.config.contacts.speculative_distance;
        let ground = &self.bodies[Self::GROUND.0];

        for (contact_id, entry) in self.shapes.iter().enumerate() {
            let body = &self.bodies[entry.body.0];
            let radius = entry.shape.radius();

            let mut deepest: Option<(f64, Vector3<f64>, Point3<f64>)> = None;
            for local in entry.shape.contact_candidates().as_slice() {
                let p = body.world_point(local);
                let (depth, normal) = terrain.height_and_normal_at(&p);
                let separation = depth - radius;
                if deepest.map_or(true, |(s, _, _)| separation < s) {
                    deepest = Some((separation, normal, p - normal * radius));
                }
            }

            let Some((separation, normal, point)) = deepest else {
                continue;
            };

            if separation < speculative {
                self.manifolds
                    .upsert(contact_id, ground, body, &point, &normal, separation)?;
            } else {
                self.manifolds.remove(contact_id);
            }
        }
        Ok(())
    }
}
