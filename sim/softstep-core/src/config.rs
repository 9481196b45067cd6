//! World configuration.

use softstep_contact::{ContactSettings, MAX_CONTACTS};
use softstep_types::{IntegrationParams, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Substeps per frame used by the default configuration.
pub const DEFAULT_SUB_STEPS: usize = 8;

/// Configuration of a [`World`](crate::World).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Substeps per frame; the substep length is `dt / sub_steps`.
    pub sub_steps: usize,
    /// Gravity and drag applied during velocity integration.
    pub integration: IntegrationParams,
    /// Contact resolver tuning.
    pub contacts: ContactSettings,
    /// Maximum number of simultaneous contacts (and collision shapes).
    pub max_contacts: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            sub_steps: DEFAULT_SUB_STEPS,
            integration: IntegrationParams::default(),
            contacts: ContactSettings::default(),
            max_contacts: MAX_CONTACTS,
        }
    }
}

impl WorldConfig {
    /// Default configuration without gravity.
    #[must_use]
    pub fn zero_gravity() -> Self {
        Self {
            integration: IntegrationParams::zero_gravity(),
            ..Default::default()
        }
    }

    /// Set the number of substeps per frame.
    #[must_use]
    pub fn with_sub_steps(mut self, sub_steps: usize) -> Self {
        self.sub_steps = sub_steps;
        self
    }

    /// Set the integration parameters.
    #[must_use]
    pub fn with_integration(mut self, integration: IntegrationParams) -> Self {
        self.integration = integration;
        self
    }

    /// Set the contact settings.
    #[must_use]
    pub fn with_contacts(mut self, contacts: ContactSettings) -> Self {
        self.contacts = contacts;
        self
    }

    /// Set the contact capacity.
    #[must_use]
    pub fn with_max_contacts(mut self, max_contacts: usize) -> Self {
        self.max_contacts = max_contacts;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> softstep_types::Result<()> {
        if self.sub_steps == 0 {
            return Err(SimError::invalid_config("sub_steps must be at least 1"));
        }
        if self.max_contacts == 0 {
            return Err(SimError::invalid_config("max_contacts must be at least 1"));
        }
        self.integration.validate()?;
        self.contacts.validate()?;
        Ok(())
    }
}
