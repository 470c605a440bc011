//! Provisioner abstraction for tunnel exit nodes.
//!
//! A [`Provisioner`] creates (or converges) one remote compute resource per
//! [`BasicHost`] and reports its status by opaque identifier. The set of
//! backends is closed: [`CloudProvisioner`] dispatches over [`ProviderKind`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use crate::azure::AzureProvisioner;
use crate::config::ProvisionerConfig;
use crate::context::CallContext;
use crate::error::ProvisionError;
use crate::host::{BasicHost, ProvisionedHost};

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Future returned by [`Provisioner`] operations.
pub type ProvisionFuture<'a, T> = BackendFuture<'a, T, ProvisionError>;

/// Uniform contract implemented once per cloud backend.
pub trait Provisioner: Send + Sync {
    /// Creates or converges the resources for `host`.
    ///
    /// Safe to call again with the same host: every backend write is an
    /// upsert. The returned snapshot may not carry an address yet.
    fn provision<'a>(
        &'a self,
        host: &'a BasicHost,
        ctx: &'a CallContext,
    ) -> ProvisionFuture<'a, ProvisionedHost>;

    /// Reports the state of a previously provisioned host.
    ///
    /// Fails with [`ProvisionError::NotReady`] until the resource has
    /// succeeded and holds a public address.
    fn status<'a>(&'a self, id: &'a str, ctx: &'a CallContext)
    -> ProvisionFuture<'a, ProvisionedHost>;

    /// Removes a previously provisioned host; absent hosts count as removed.
    fn delete<'a>(&'a self, id: &'a str, ctx: &'a CallContext) -> ProvisionFuture<'a, ()>;
}

/// Backends known to this crate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProviderKind {
    /// Azure Container Instances.
    Azure,
}

impl ProviderKind {
    /// Name used in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Azure => "azure",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProvisionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            other => Err(ProvisionError::Config(format!(
                "unknown provider '{other}' (supported: azure)"
            ))),
        }
    }
}

/// Closed-set dispatcher over the supported backends.
pub enum CloudProvisioner {
    /// Azure Container Instances backend.
    Azure(AzureProvisioner),
}

impl CloudProvisioner {
    /// Builds the configured backend and authorises it.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Config`] when the configuration is invalid,
    /// the provider is unknown, or credentials cannot be loaded or exchanged
    /// for a token.
    pub async fn from_config(config: &ProvisionerConfig) -> Result<Self, ProvisionError> {
        config
            .validate()
            .map_err(|err| ProvisionError::Config(err.to_string()))?;
        match config.provider.parse::<ProviderKind>()? {
            ProviderKind::Azure => Ok(Self::Azure(AzureProvisioner::connect(config).await?)),
        }
    }

    /// Backend behind this dispatcher.
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        match self {
            Self::Azure(_) => ProviderKind::Azure,
        }
    }
}

impl Provisioner for CloudProvisioner {
    fn provision<'a>(
        &'a self,
        host: &'a BasicHost,
        ctx: &'a CallContext,
    ) -> ProvisionFuture<'a, ProvisionedHost> {
        match self {
            Self::Azure(backend) => backend.provision(host, ctx),
        }
    }

    fn status<'a>(
        &'a self,
        id: &'a str,
        ctx: &'a CallContext,
    ) -> ProvisionFuture<'a, ProvisionedHost> {
        match self {
            Self::Azure(backend) => backend.status(id, ctx),
        }
    }

    fn delete<'a>(&'a self, id: &'a str, ctx: &'a CallContext) -> ProvisionFuture<'a, ()> {
        match self {
            Self::Azure(backend) => backend.delete(id, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("azure")]
    #[case("Azure")]
    #[case(" AZURE ")]
    fn parses_provider_names_case_insensitively(#[case] raw: &str) {
        assert_eq!(raw.parse::<ProviderKind>().ok(), Some(ProviderKind::Azure));
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        let err = "digitalocean"
            .parse::<ProviderKind>()
            .expect_err("provider is not supported");
        assert!(matches!(err, ProvisionError::Config(ref msg) if msg.contains("digitalocean")));
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn provider_kind_displays_config_name() {
        assert_eq!(ProviderKind::Azure.to_string(), "azure");
    }
}
