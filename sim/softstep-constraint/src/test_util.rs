//! Fixtures shared by the joint tests.

use nalgebra::{Point3, UnitQuaternion};
use softstep_types::{BodyHandle, MassProperties, RigidBody};

use crate::Joint;

pub(crate) const SUB_STEPS: usize = 8;
pub(crate) const H: f64 = 1.0 / (60.0 * SUB_STEPS as f64);

/// A 1 kg ball of radius 0.5 centred at `at`.
pub(crate) fn ball(index: usize, at: Point3<f64>) -> RigidBody {
    RigidBody::new(
        BodyHandle(index),
        &MassProperties::sphere(1.0, 0.5),
        at,
        UnitQuaternion::identity(),
    )
}

/// Run `frames` gravity-free frames of the substep pipeline for a single
/// joint and return the joint's position error after each frame.
pub(crate) fn run_frames(joint: &mut Joint, bodies: &mut [RigidBody], frames: usize) -> Vec<f64> {
    let mut errors = Vec::with_capacity(frames);
    for _ in 0..frames {
        joint.pre_solve(bodies, H);
        for _ in 0..SUB_STEPS {
            joint.warm_start(bodies).unwrap();
            joint.solve(bodies, H, true).unwrap();
            for body in bodies.iter_mut() {
                body.integrate_positions(H);
            }
            joint.solve(bodies, H, false).unwrap();
        }
        for body in bodies.iter_mut() {
            body.finalize_position();
            body.update_world_inertia();
        }
        errors.push(joint.position_error(bodies));
    }
    errors
}
