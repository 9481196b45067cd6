//! Core types for the softstep rigid-body solver.
//!
//! This crate provides the leaf building blocks shared by every other
//! softstep crate:
//!
//! - [`math`] - guarded normalization, basis construction, effective-mass helpers
//! - [`Softness`] - soft-constraint coefficients for a given substep size
//! - [`RigidBody`] - body state and the substep integrator
//! - [`Shape`] / [`MassProperties`] - geometry and mass from density
//! - [`IntegrationParams`] - gravity, drag and damping
//! - [`SimError`] - the error type for every fallible operation
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use softstep_types::{BodyHandle, IntegrationParams, MassProperties, RigidBody};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let mut body = RigidBody::new(
//!     BodyHandle::new(0),
//!     &MassProperties::sphere(1.0, 0.5),
//!     Point3::new(0.0, 0.0, 1.0),
//!     UnitQuaternion::identity(),
//! );
//!
//! let h = 1.0 / 480.0;
//! body.integrate_velocities(h, &IntegrationParams::default(), &Vector3::zeros());
//! body.integrate_positions(h);
//! body.finalize_position();
//!
//! assert!(body.velocity.z < 0.0);
//! assert!(body.position.z < 1.0);
//! ```

#![doc(html_root_url = "https://docs.rs/softstep-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc
)]

mod body;
mod config;
mod error;
pub mod math;
mod shape;
mod softness;

pub use body::{body_pair_mut, BodyHandle, RigidBody};
pub use config::{default_gravity, IntegrationParams};
pub use error::SimError;
pub use shape::{ContactCandidates, MassProperties, Shape};
pub use softness::{Softness, SoftnessParams};

// Re-export math types for convenience
pub use nalgebra::{Matrix2, Matrix3, Matrix4, Point3, Quaternion, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
