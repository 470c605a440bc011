//! Container group construction and submission.

use tracing::info;

use crate::context::CallContext;
use crate::error::{ProvisionError, Stage};

use super::super::client::{ArmApi, PendingOperation};
use super::super::identity::ContainerGroupId;
use super::super::model::{
    Container, ContainerGroup, ContainerGroupProperties, ContainerProperties, EnvironmentVariable,
    IpAddress, Port, ResourceRequirements, ResourceSpec,
};
use super::super::{AzureHost, AzureProvisioner, managed_tags};
use super::arm_call;

const CONTAINER_NAME: &str = "inlets";
const DATA_PORT: u16 = 80;
const CONTROL_PORT: u16 = 8000;
const TOKEN_VARIABLE: &str = "INLETSTOKEN";
const OS_TYPE: &str = "Linux";
const PUBLIC_ADDRESS: &str = "Public";
const RESOURCES: ResourceSpec = ResourceSpec {
    memory_in_gb: 0.5,
    cpu: 1.0,
};

/// Desired container group for `host`: one tunnel server container exposing
/// the data and control ports on a public address.
#[must_use]
pub fn container_group_spec(host: &AzureHost, image: &str) -> ContainerGroup {
    let command = vec![
        String::from("inlets"),
        String::from("server"),
        format!("--port={DATA_PORT}"),
        format!("--control-port={CONTROL_PORT}"),
        format!("--token={}", host.token()),
    ];
    let container = Container {
        name: CONTAINER_NAME.to_owned(),
        properties: ContainerProperties {
            image: image.to_owned(),
            command,
            ports: vec![Port::tcp(DATA_PORT), Port::tcp(CONTROL_PORT)],
            environment_variables: vec![EnvironmentVariable {
                name: TOKEN_VARIABLE.to_owned(),
                value: None,
                secure_value: Some(host.token().to_owned()),
            }],
            resources: ResourceRequirements {
                requests: RESOURCES,
                limits: Some(RESOURCES),
            },
        },
    };

    ContainerGroup {
        id: None,
        name: None,
        location: host.region().to_owned(),
        tags: managed_tags(host.name()),
        properties: ContainerGroupProperties {
            provisioning_state: None,
            containers: vec![container],
            ip_address: Some(IpAddress {
                kind: PUBLIC_ADDRESS.to_owned(),
                ports: vec![Port::tcp(DATA_PORT), Port::tcp(CONTROL_PORT)],
                ip: None,
            }),
            os_type: OS_TYPE.to_owned(),
        },
    }
}

impl<C: ArmApi> AzureProvisioner<C> {
    /// Submits the host's container group as a create-or-update.
    pub(in crate::azure) async fn submit_container_group(
        &self,
        host: &AzureHost,
        id: &ContainerGroupId,
        ctx: &CallContext,
    ) -> Result<PendingOperation, ProvisionError> {
        let spec = container_group_spec(host, &self.settings.image);
        let raw_id = id.to_string();
        let pending = arm_call(
            ctx,
            Stage::ComputeResource,
            &raw_id,
            self.client.put_container_group(id, &spec),
        )
        .await?;
        info!(
            id = %raw_id,
            image = %self.settings.image,
            asynchronous = pending.status_url.is_some(),
            "container group submitted"
        );
        Ok(pending)
    }

    /// Reads the container group, attributing failures to `stage`.
    pub(in crate::azure) async fn fetch_container_group(
        &self,
        id: &ContainerGroupId,
        stage: Stage,
        ctx: &CallContext,
    ) -> Result<ContainerGroup, ProvisionError> {
        arm_call(
            ctx,
            stage,
            &id.to_string(),
            self.client.get_container_group(id),
        )
        .await
    }
}
