//! Provisioning of inlets tunnel exit nodes.
//!
//! The crate exposes a provisioner abstraction for short-lived compute
//! resources running an inlets server, and an Azure Container Instances
//! implementation of it (upsert resource group → submit container group →
//! wait for completion → read back the address).

pub mod azure;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod provision;
#[cfg(test)]
pub mod test_helpers;
pub mod test_support;

pub use azure::{AzureHost, AzureProvisioner, AzureSettings, ContainerGroupId, HttpArmClient};
pub use config::{ConfigError, ProvisionerConfig};
pub use context::CallContext;
pub use error::{ErrorKind, FatalCause, IdentityError, ProvisionError, Stage};
pub use host::{BasicHost, BasicHostBuilder, ProvisionedHost, STATUS_ACTIVE, STATUS_PROVISIONING};
pub use provision::{CloudProvisioner, ProviderKind, ProvisionFuture, Provisioner};
