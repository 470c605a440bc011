//! Azure Container Instances backend.
//!
//! Each host becomes one resource group and one container group, both named
//! after the host. Provisioning upserts the resource group, submits the
//! container group, waits for ARM to finish the deployment and reads back
//! the result. The returned identifier is the container group's ARM id.

pub mod client;
pub mod credentials;
pub mod error;
pub mod identity;
mod lifecycle;
pub mod model;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{DEFAULT_IMAGE, ProvisionerConfig};
use crate::context::CallContext;
use crate::error::{ProvisionError, Stage};
use crate::host::{BasicHost, ProvisionedHost, STATUS_ACTIVE, STATUS_PROVISIONING};
use crate::provision::{ProvisionFuture, Provisioner};

pub use client::{ArmApi, ArmFuture, HttpArmClient, OperationPoll, PendingOperation};
pub use credentials::{AUTH_LOCATION_ENV, AuthFile, CredentialsError};
pub use error::{ArmError, ArmErrorKind};
pub use identity::ContainerGroupId;
pub use lifecycle::container_group_spec;

/// Key of [`BasicHost::additional`] naming the target subscription.
pub const SUBSCRIPTION_KEY: &str = "subscriptionID";
/// Tag marking resources created by this crate.
pub const MANAGED_BY_TAG: &str = "managed-by";
/// Tag carrying the host name a resource belongs to.
pub const HOST_TAG: &str = "inlets-host";

const MANAGED_BY_VALUE: &str = "inlets-provision";
const CONTAINER_GROUP_RESOURCE: &str = "container group";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Tunables of the Azure backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AzureSettings {
    /// Image of the tunnel server container.
    pub image: String,
    /// Delay between polls when ARM sends no `Retry-After`.
    pub poll_interval: Duration,
    /// Upper bound on one completion wait, on top of the caller's context.
    pub wait_timeout: Duration,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_owned(),
            poll_interval: POLL_INTERVAL,
            wait_timeout: WAIT_TIMEOUT,
        }
    }
}

impl AzureSettings {
    /// Settings taken from loaded configuration.
    #[must_use]
    pub fn from_config(config: &ProvisionerConfig) -> Self {
        Self {
            image: config.image.trim().to_owned(),
            poll_interval: config.poll_interval(),
            wait_timeout: config.wait_timeout(),
        }
    }
}

/// Host bound to the subscription it will be created in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AzureHost {
    host: BasicHost,
    subscription_id: String,
}

impl AzureHost {
    /// Resolves the subscription from the host, then from the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Validation`] naming `subscriptionID` when
    /// neither source provides one.
    pub fn resolve(host: &BasicHost, fallback: Option<&str>) -> Result<Self, ProvisionError> {
        let subscription_id = host
            .additional(SUBSCRIPTION_KEY)
            .or_else(|| fallback.map(str::trim).filter(|id| !id.is_empty()))
            .ok_or_else(|| ProvisionError::Validation(SUBSCRIPTION_KEY.to_owned()))?
            .to_owned();
        Ok(Self {
            host: host.clone(),
            subscription_id,
        })
    }

    /// Host name, used for both the resource group and the container group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.host.name
    }

    /// Azure region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.host.region
    }

    /// Tunnel token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.host.token
    }

    /// Subscription the resources are created in.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Identifier of this host's container group.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MalformedIdentifier`] when the name or the
    /// subscription cannot be encoded into an ARM id.
    pub fn container_group_id(&self) -> Result<ContainerGroupId, ProvisionError> {
        Ok(ContainerGroupId::new(
            self.subscription_id.as_str(),
            self.name(),
            self.name(),
        )?)
    }
}

/// Tags applied to every resource created for `name`.
#[must_use]
pub fn managed_tags(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MANAGED_BY_TAG.to_owned(), MANAGED_BY_VALUE.to_owned()),
        (HOST_TAG.to_owned(), name.to_owned()),
    ])
}

/// Provisioner backed by Azure Container Instances.
pub struct AzureProvisioner<C: ArmApi = HttpArmClient> {
    client: Arc<C>,
    settings: AzureSettings,
}

impl<C: ArmApi> Clone for AzureProvisioner<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            settings: self.settings.clone(),
        }
    }
}

impl AzureProvisioner<HttpArmClient> {
    /// Loads credentials, acquires a token and builds the provisioner.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::Config`] when the auth file cannot be
    /// located, read or parsed, or when Azure AD rejects it.
    pub async fn connect(config: &ProvisionerConfig) -> Result<Self, ProvisionError> {
        let path = AuthFile::locate(config.access_key_file.as_deref())
            .map_err(|err| ProvisionError::Config(err.to_string()))?;
        let auth = AuthFile::load(&path).map_err(|err| ProvisionError::Config(err.to_string()))?;
        debug!(auth_file = %path, tenant = %auth.tenant_id, "loaded Azure credentials");
        let client = HttpArmClient::connect(auth)
            .await
            .map_err(|err| ProvisionError::Config(err.to_string()))?;
        info!("authorised against Azure Resource Manager");
        Ok(Self::with_client(client, AzureSettings::from_config(config)))
    }
}

impl<C: ArmApi> AzureProvisioner<C> {
    /// Builds a provisioner over an existing ARM client.
    #[must_use]
    pub fn with_client(client: C, settings: AzureSettings) -> Self {
        Self {
            client: Arc::new(client),
            settings,
        }
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &AzureSettings {
        &self.settings
    }

    async fn provision_host(
        &self,
        host: &BasicHost,
        ctx: &CallContext,
    ) -> Result<ProvisionedHost, ProvisionError> {
        host.validate()?;
        let target = AzureHost::resolve(host, self.client.default_subscription())?;
        let id = target.container_group_id()?;
        info!(
            host = %target.name(),
            region = %target.region(),
            subscription = %target.subscription_id(),
            "provisioning exit node"
        );

        self.upsert_resource_group(&target, ctx).await?;
        let pending = self.submit_container_group(&target, &id, ctx).await?;
        self.await_creation(&id, pending, ctx).await?;
        let group = self
            .fetch_container_group(&id, Stage::ResultExtraction, ctx)
            .await?;

        let snapshot = snapshot(&id, &group);
        info!(
            host = %target.name(),
            id = %snapshot.id,
            ip = %snapshot.ip,
            status = %snapshot.status,
            "exit node provisioned"
        );
        Ok(snapshot)
    }

    async fn host_status(
        &self,
        raw_id: &str,
        ctx: &CallContext,
    ) -> Result<ProvisionedHost, ProvisionError> {
        let id: ContainerGroupId = raw_id.parse()?;
        let group = self
            .fetch_container_group(&id, Stage::StatusQuery, ctx)
            .await?;
        let snapshot = snapshot(&id, &group);
        if snapshot.is_ready() {
            debug!(id = %snapshot.id, ip = %snapshot.ip, "exit node ready");
            return Ok(snapshot);
        }
        debug!(
            id = %snapshot.id,
            state = %group.provisioning_state(),
            "exit node not ready"
        );
        Err(ProvisionError::NotReady {
            resource: CONTAINER_GROUP_RESOURCE.to_owned(),
            state: group.provisioning_state().to_owned(),
            ip: group.ip().to_owned(),
        })
    }

    async fn delete_host(&self, raw_id: &str, ctx: &CallContext) -> Result<(), ProvisionError> {
        let id: ContainerGroupId = raw_id.parse()?;
        info!(id = %id, "deleting exit node");
        match self.remove_container_group(&id, ctx).await {
            Err(ProvisionError::NotFound { .. }) => {
                debug!(id = %id, "container group already absent");
                Ok(())
            }
            other => other,
        }
    }
}

/// Snapshot of a container group; `active` once it succeeded with an address.
fn snapshot(id: &ContainerGroupId, group: &model::ContainerGroup) -> ProvisionedHost {
    let ready = model::is_succeeded(group.provisioning_state()) && !group.ip().is_empty();
    ProvisionedHost {
        id: id.to_string(),
        ip: group.ip().to_owned(),
        status: if ready {
            STATUS_ACTIVE
        } else {
            STATUS_PROVISIONING
        }
        .to_owned(),
    }
}

impl<C: ArmApi> Provisioner for AzureProvisioner<C> {
    fn provision<'a>(
        &'a self,
        host: &'a BasicHost,
        ctx: &'a CallContext,
    ) -> ProvisionFuture<'a, ProvisionedHost> {
        Box::pin(self.provision_host(host, ctx))
    }

    fn status<'a>(
        &'a self,
        id: &'a str,
        ctx: &'a CallContext,
    ) -> ProvisionFuture<'a, ProvisionedHost> {
        Box::pin(self.host_status(id, ctx))
    }

    fn delete<'a>(&'a self, id: &'a str, ctx: &'a CallContext) -> ProvisionFuture<'a, ()> {
        Box::pin(self.delete_host(id, ctx))
    }
}
