//! A four-wheel car on the softstep solver.
//!
//! [`create_car`] adds a chassis and four wheels to a [`World`], each wheel
//! hung on a soft suspension joint and an axle hinge. [`Car::apply_input`]
//! maps a [`DriverInput`] onto the axle motors and front steering, and
//! [`Car::step`] advances the world with rolling resistance and downforce on
//! grounded wheels, then refreshes the per-wheel [`WheelTelemetry`].
//!
//! # Example
//!
//! ```
//! use softstep_core::{FlatGround, World, WorldConfig};
//! use softstep_vehicle::{create_car, CarConfig, DriverInput};
//! use nalgebra::Point3;
//!
//! let mut world = World::new(WorldConfig::default())?;
//! let mut car = create_car(&mut world, &CarConfig::default(), Point3::new(0.0, 0.0, 1.0))?;
//! let ground = FlatGround::new(0.0);
//!
//! for _ in 0..60 {
//!     car.apply_input(&mut world, &DriverInput::accelerate())?;
//!     car.step(&mut world, 1.0 / 60.0, &ground)?;
//! }
//! println!("engine at {:.0} rpm", car.engine_rpm());
//! # Ok::<(), softstep_core::SimError>(())
//! ```
//!
//! [`World`]: softstep_core::World

#![doc(html_root_url = "https://docs.rs/softstep-vehicle/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc
)]

mod car;
mod config;
mod input;
mod load;
mod telemetry;

pub use car::{clamp_frame_delta, create_car, Car, Wheel, WheelPosition, MAX_FRAME_DELTA};
pub use config::CarConfig;
pub use input::{DriverInput, REVERSE_THRESHOLD};
pub use load::WheelLoad;
pub use telemetry::{engine_rpm, slip_ratio, WheelTelemetry, SLIP_SPEED_FLOOR};
