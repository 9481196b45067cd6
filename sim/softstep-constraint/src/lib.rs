//! Soft-constraint joints for the softstep solver.
//!
//! Every joint connects two bodies of a body arena by [`BodyHandle`] and
//! removes some of their relative degrees of freedom:
//!
//! - [`DistanceJoint`]: anchors coincide (3 translational DOF)
//! - [`HingeJoint`]: shared rotation axis (2 rotational DOF), optional
//!   [`HingeMotor`] and steering offset
//! - [`SliderJoint`]: anchor B stays on an axis fixed in A (2 translational DOF)
//! - [`AxisJoint`]: travel along an axis limited to a range (one-sided)
//! - [`FixedJoint`]: weld (all 6 DOF)
//!
//! They are gathered in the closed [`Joint`] enum, which the stepper drives
//! through `pre_solve`, `warm_start` and `solve`.
//!
//! # Soft constraints
//!
//! Positional error is corrected through [`Softness`] coefficients derived
//! from a frequency and damping ratio instead of a Baumgarte factor. The
//! biased pass uses them; the relax pass after position integration is a
//! rigid velocity solve that removes the energy the bias injected.
//!
//! # Example
//!
//! ```
//! use softstep_constraint::{DistanceJoint, Joint};
//! use softstep_types::{BodyHandle, MassProperties, RigidBody, SoftnessParams};
//! use nalgebra::{Point3, UnitQuaternion};
//!
//! let ground = RigidBody::fixed(BodyHandle::new(0), Point3::origin());
//! let ball = RigidBody::new(
//!     BodyHandle::new(1),
//!     &MassProperties::sphere(1.0, 0.25),
//!     Point3::new(0.0, 0.0, -1.0),
//!     UnitQuaternion::identity(),
//! );
//!
//! let joint = DistanceJoint::new(&ground, &ball, &Point3::origin(), SoftnessParams::stiff())?;
//! let mut joint = Joint::from(joint);
//! let mut bodies = vec![ground, ball];
//!
//! let h = 1.0 / 480.0;
//! joint.pre_solve(&bodies, h);
//! joint.warm_start(&mut bodies)?;
//! joint.solve(&mut bodies, h, true)?;
//! # Ok::<(), softstep_types::SimError>(())
//! ```
//!
//! [`BodyHandle`]: softstep_types::BodyHandle
//! [`Softness`]: softstep_types::Softness

#![doc(html_root_url = "https://docs.rs/softstep-constraint/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::too_many_arguments,
    clippy::missing_errors_doc
)]

mod axis;
mod base;
mod distance;
mod fixed;
mod hinge;
mod joint;
mod motor;
mod slider;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod test_util;

pub use axis::AxisJoint;
pub use base::JointBase;
pub use distance::DistanceJoint;
pub use fixed::FixedJoint;
pub use hinge::HingeJoint;
pub use joint::{Joint, JointKind};
pub use motor::{HingeMotor, MIN_MOTOR_TORQUE};
pub use slider::SliderJoint;
