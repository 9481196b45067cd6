//! Contact manifolds and the soft contact resolver.
//!
//! - [`ManifoldSet`] keeps one [`ContactManifold`] per live contact, keyed by
//!   a stable contact id so accumulated impulses carry over between frames.
//!   It is bounded and reports [`SimError::ContactCapacityExceeded`] instead
//!   of growing past its capacity.
//! - [`ContactSolver`] rebuilds a [`ContactConstraint`] per manifold each
//!   frame and iterates them with warm starting, speculative contact and
//!   Coulomb box friction.
//!
//! # Example
//!
//! ```
//! use softstep_contact::{ContactSolver, ManifoldSet};
//! use softstep_types::{BodyHandle, MassProperties, RigidBody};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let ground = RigidBody::fixed(BodyHandle::new(0), Point3::origin());
//! let ball = RigidBody::new(
//!     BodyHandle::new(1),
//!     &MassProperties::sphere(1.0, 0.5),
//!     Point3::new(0.0, 0.0, 0.49),
//!     UnitQuaternion::identity(),
//! )
//! .with_velocity(Vector3::new(0.0, 0.0, -1.0));
//!
//! let mut manifolds = ManifoldSet::default();
//! manifolds.upsert(0, &ground, &ball, &Point3::new(0.0, 0.0, -0.01), &Vector3::z(), -0.01)?;
//!
//! let mut bodies = vec![ground, ball];
//! let h = 1.0 / 480.0;
//! let mut solver = ContactSolver::default();
//! solver.pre_solve(&manifolds, &bodies, h);
//! solver.warm_start(&mut bodies)?;
//! solver.solve(&mut bodies, 1.0 / h, true)?;
//! solver.store_impulses(&mut manifolds);
//!
//! assert!(bodies[1].velocity.z > -1.0);
//! # Ok::<(), softstep_types::SimError>(())
//! ```
//!
//! [`SimError::ContactCapacityExceeded`]: softstep_types::SimError::ContactCapacityExceeded

#![doc(html_root_url = "https://docs.rs/softstep-contact/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc
)]

mod manifold;
mod solver;

pub use manifold::{ContactManifold, ContactPoint, ManifoldSet, MAX_CONTACTS};
pub use solver::{mix_friction, ContactConstraint, ContactSettings, ContactSolver};
