//! World management and the substepped frame loop of the softstep solver.
//!
//! This crate ties the body arena, the joints of [`softstep_constraint`] and
//! the contact resolver of [`softstep_contact`] together behind one
//! [`World::step`] call, and defines the [`Terrain`] query contacts are
//! discovered against.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       World::step                            │
//! │  contacts → pre_solve → N × substep → finalize → validate   │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          World                               │
//! │  Contains: bodies (ground at 0), shapes, joints, manifolds  │
//! └─────────────┬─────────────────────────────┬─────────────────┘
//!               │                             │
//!               ▼                             ▼
//! ┌───────────────────────────┐ ┌───────────────────────────────┐
//! │    softstep-constraint    │ │        softstep-contact       │
//! │  Distance, Hinge, Slider, │ │  ManifoldSet, ContactSolver   │
//! │  Axis, Fixed              │ │  speculative + box friction   │
//! └───────────────────────────┘ └───────────────────────────────┘
//! ```
//!
//! A substep is:
//!
//! ```text
//! integrate velocities → warm start → solve (biased) → integrate positions → solve (relax)
//! ```
//!
//! # Quick Start
//!
//! ```
//! use softstep_core::{FlatGround, Shape, World, WorldConfig};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let mut world = World::new(WorldConfig::default())?;
//! let ball = world.add_body_from_shapes(
//!     &[Shape::sphere(Vector3::zeros(), 0.5)],
//!     100.0,
//!     Point3::new(0.0, 0.0, 2.0),
//!     UnitQuaternion::identity(),
//! )?;
//!
//! let ground = FlatGround::new(0.0);
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0, &ground, &())?;
//! }
//!
//! let z = world.body(ball).map(|b| b.position.z).unwrap_or_default();
//! assert!((z - 0.5).abs() < 0.05);
//! # Ok::<(), softstep_core::SimError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/softstep-core/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc
)]

mod config;
mod stepper;
pub mod terrain;
mod world;

pub use config::{WorldConfig, DEFAULT_SUB_STEPS};
pub use stepper::{ExternalForces, StepReport};
pub use terrain::{FlatGround, HeightField, Terrain};
pub use world::{JointHandle, ShapeEntry, World};

// Re-export the lower layers so most users need only this crate.
pub use softstep_constraint::{
    AxisJoint, DistanceJoint, FixedJoint, HingeJoint, HingeMotor, Joint, JointKind, SliderJoint,
};
pub use softstep_contact::{ContactManifold, ContactSettings, ManifoldSet, MAX_CONTACTS};
pub use softstep_types::{
    BodyHandle, IntegrationParams, MassProperties, Result, RigidBody, Shape, SimError, Softness,
    SoftnessParams,
};
