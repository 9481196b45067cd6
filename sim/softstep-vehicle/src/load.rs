//! Rolling resistance and downforce on grounded wheels.

use nalgebra::Vector3;
use softstep_core::{BodyHandle, ContactManifold, ExternalForces, RigidBody};

use crate::config::CarConfig;

/// External forces acting on the wheels of one car.
///
/// A wheel touching the ground is slowed by `rolling_resistance · m · v∥` and
/// pressed into the ground by `downforce · |v∥|²`, where `v∥` is its velocity
/// along the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelLoad {
    wheels: [BodyHandle; 4],
    rolling_resistance: f64,
    downforce: f64,
}

impl WheelLoad {
    /// Loads for `wheels` tuned by `config`.
    #[must_use]
    pub fn new(config: &CarConfig, wheels: [BodyHandle; 4]) -> Self {
        Self {
            wheels,
            rolling_resistance: config.rolling_resistance,
            downforce: config.downforce,
        }
    }
}

impl ExternalForces for WheelLoad {
    fn force(&self, body: &RigidBody, contact: Option<&ContactManifold>) -> Vector3<f64> {
        if !self.wheels.contains(&body.id) {
            return Vector3::zeros();
        }
        let Some(contact) = contact.filter(|c| c.is_touching()) else {
            return Vector3::zeros();
        };

        let n = contact.normal;
        let planar = body.velocity - n * body.velocity.dot(&n);
        -planar * (self.rolling_resistance * body.mass) - n * (self.downforce * planar.norm_squared())
    }
}
