//! Error types for simulation operations.

use thiserror::Error;

/// Errors that can occur while building or stepping a simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Invalid body handle referenced.
    #[error("invalid body handle: {0}")]
    InvalidBodyId(usize),

    /// Invalid joint handle referenced.
    #[error("invalid joint handle: {0}")]
    InvalidJointId(usize),

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Simulation diverged (`NaN` or `Inf` detected).
    #[error("simulation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A joint could not be created between the given bodies.
    #[error("invalid joint: {reason}")]
    InvalidJoint {
        /// Description of what's wrong.
        reason: String,
    },

    /// The contact manifold set is full.
    #[error("contact capacity exceeded: {capacity} manifolds in use")]
    ContactCapacityExceeded {
        /// Maximum number of manifolds the set can hold.
        capacity: usize,
    },

    /// Invalid mass properties.
    #[error("invalid mass properties: {reason}")]
    InvalidMassProperties {
        /// Description of what's wrong.
        reason: String,
    },
}

impl SimError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid joint error.
    #[must_use]
    pub fn invalid_joint(reason: impl Into<String>) -> Self {
        Self::InvalidJoint {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass properties error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMassProperties {
            reason: reason.into(),
        }
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::InvalidBodyId(42);
        assert!(err.to_string().contains("42"));

        let err = SimError::ContactCapacityExceeded { capacity: 32 };
        assert!(err.to_string().contains("32"));

        let err = SimError::diverged("NaN in velocity");
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_error_predicates() {
        let err = SimError::diverged("test");
        assert!(err.is_diverged());
        assert!(!err.is_config_error());

        let err = SimError::invalid_config("bad value");
        assert!(err.is_config_error());
        assert!(!err.is_diverged());
    }
}
