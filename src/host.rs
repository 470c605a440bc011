//! Host descriptors carrying provisioning intent in and status out.

use std::collections::BTreeMap;

use crate::error::ProvisionError;

/// Status reported once a host is ready to accept tunnel clients.
pub const STATUS_ACTIVE: &str = "active";

/// Status reported while the backend is still converging.
pub const STATUS_PROVISIONING: &str = "provisioning";

/// Backend agnostic description of the exit node to provision.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BasicHost {
    /// Logical host name, reused as the backend resource name.
    pub name: String,
    /// Backend location (for example `westeurope`).
    pub region: String,
    /// Shared secret the tunnel server requires from clients.
    pub token: String,
    /// Backend specific parameters such as `subscriptionID`.
    pub additional: BTreeMap<String, String>,
}

impl BasicHost {
    /// Starts a builder for a [`BasicHost`].
    #[must_use]
    pub fn builder() -> BasicHostBuilder {
        BasicHostBuilder::new()
    }

    /// Returns a backend parameter, treating blank values as absent.
    #[must_use]
    pub fn additional(&self, key: &str) -> Option<&str> {
        self.additional
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Validates the host, returning a descriptive error when a required
    /// field is missing.
    ///
    /// Resource-name rules (charset, length) are left to the backend, which
    /// rejects bad names with an `InvalidInput` fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when `name`, `region`, or
    /// `token` is empty.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        if self.name.trim().is_empty() {
            return Err(ProvisionError::Validation("name".to_owned()));
        }
        if self.region.trim().is_empty() {
            return Err(ProvisionError::Validation("region".to_owned()));
        }
        if self.token.trim().is_empty() {
            return Err(ProvisionError::Validation("token".to_owned()));
        }
        Ok(())
    }
}

/// Builder for [`BasicHost`] that trims inputs and validates on build.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BasicHostBuilder {
    name: String,
    region: String,
    token: String,
    additional: BTreeMap<String, String>,
}

impl BasicHostBuilder {
    /// Creates an empty builder; fields must be populated before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host name.
    #[must_use]
    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = value.into();
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = value.into();
        self
    }

    /// Sets the shared tunnel token.
    #[must_use]
    pub fn token(mut self, value: impl Into<String>) -> Self {
        self.token = value.into();
        self
    }

    /// Adds one backend specific parameter.
    #[must_use]
    pub fn additional(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }

    /// Builds and validates the [`BasicHost`], trimming string inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] when a required field is empty.
    pub fn build(self) -> Result<BasicHost, ProvisionError> {
        let host = BasicHost {
            name: self.name.trim().to_owned(),
            region: self.region.trim().to_owned(),
            token: self.token.trim().to_owned(),
            additional: self
                .additional
                .into_iter()
                .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
                .collect(),
        };
        host.validate()?;
        Ok(host)
    }
}

/// Snapshot of a provisioned host as last observed on the backend.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProvisionedHost {
    /// Opaque identifier that `status` and `delete` accept.
    pub id: String,
    /// Public address, empty until the backend assigns one.
    pub ip: String,
    /// Coarse state: [`STATUS_ACTIVE`] or [`STATUS_PROVISIONING`].
    pub status: String,
}

impl ProvisionedHost {
    /// Whether the host has an address and reports [`STATUS_ACTIVE`].
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.ip.is_empty() && self.status == STATUS_ACTIVE
    }
}
