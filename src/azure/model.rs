//! Azure Resource Manager payloads for resource and container groups.
//!
//! Only the fields the provisioner reads or writes are modelled; unknown
//! fields in responses (instance view, events, ...) are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::ErrorBody;

/// Provisioning state of a resource that finished successfully.
pub const STATE_SUCCEEDED: &str = "Succeeded";
/// Provisioning state of a resource whose deployment failed.
pub const STATE_FAILED: &str = "Failed";
/// Provisioning state of a cancelled deployment.
pub const STATE_CANCELED: &str = "Canceled";

/// Whether a provisioning or operation state will not change any more.
#[must_use]
pub fn is_terminal(state: &str) -> bool {
    [STATE_SUCCEEDED, STATE_FAILED, STATE_CANCELED]
        .iter()
        .any(|terminal| terminal.eq_ignore_ascii_case(state))
}

/// Whether a state reports success.
#[must_use]
pub fn is_succeeded(state: &str) -> bool {
    state.eq_ignore_ascii_case(STATE_SUCCEEDED)
}

/// Resource group as returned by, and submitted to, ARM.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    /// ARM resource id (read-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource group name (read-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Azure region.
    #[serde(default)]
    pub location: String,
    /// Server-side properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
    /// Resource tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Properties block of a resource group.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    /// Server-assigned provisioning state; must not be echoed back on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

impl ResourceGroup {
    /// Drops server-assigned state so the group can be resubmitted.
    pub fn clear_state(&mut self) {
        if let Some(properties) = self.properties.as_mut() {
            properties.provisioning_state = None;
        }
    }

    /// Provisioning state, when ARM reported one.
    #[must_use]
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|properties| properties.provisioning_state.as_deref())
    }
}

/// Container group as returned by, and submitted to, ARM.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroup {
    /// ARM resource id (read-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Container group name (read-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Azure region.
    #[serde(default)]
    pub location: String,
    /// Resource tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Container group properties.
    #[serde(default)]
    pub properties: ContainerGroupProperties,
}

impl ContainerGroup {
    /// Provisioning state, empty when ARM has not reported one yet.
    #[must_use]
    pub fn provisioning_state(&self) -> &str {
        self.properties.provisioning_state.as_deref().unwrap_or("")
    }

    /// Public address, empty until ARM assigns one.
    #[must_use]
    pub fn ip(&self) -> &str {
        self.properties
            .ip_address
            .as_ref()
            .and_then(|address| address.ip.as_deref())
            .unwrap_or("")
    }
}

/// Properties block of a container group.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerGroupProperties {
    /// Server-assigned provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Containers in the group.
    #[serde(default)]
    pub containers: Vec<Container>,
    /// Public address allocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<IpAddress>,
    /// Operating system of the containers.
    #[serde(default)]
    pub os_type: String,
}

/// Address allocation of a container group.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    /// `Public` or `Private`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Ports exposed on the address.
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Assigned address (read-only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Exposed port, used both on the group address and on containers.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Port {
    /// Port number.
    pub port: u16,
    /// `TCP` or `UDP`.
    #[serde(default)]
    pub protocol: String,
}

impl Port {
    /// TCP port.
    #[must_use]
    pub fn tcp(port: u16) -> Self {
        Self {
            port,
            protocol: String::from("TCP"),
        }
    }
}

/// Container definition.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Container {
    /// Container name.
    pub name: String,
    /// Container properties.
    #[serde(default)]
    pub properties: ContainerProperties,
}

/// Properties of one container.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    /// Image reference.
    #[serde(default)]
    pub image: String,
    /// Command line replacing the image entrypoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Ports the container listens on.
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,
    /// CPU and memory reservation.
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Environment variable; secure values are never returned by ARM.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    /// Variable name.
    pub name: String,
    /// Plain value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Secret value, hidden from reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_value: Option<String>,
}

/// Requests and limits for a container.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResourceRequirements {
    /// Guaranteed resources.
    #[serde(default)]
    pub requests: ResourceSpec,
    /// Upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceSpec>,
}

/// Memory and CPU amounts.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ResourceSpec {
    /// Memory in gigabytes.
    #[serde(rename = "memoryInGB")]
    pub memory_in_gb: f64,
    /// CPU cores.
    pub cpu: f64,
}

/// Body of an `Azure-AsyncOperation` status URL.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct OperationStatus {
    /// `InProgress`, `Succeeded`, `Failed` or `Canceled`.
    #[serde(default)]
    pub status: String,
    /// Failure details when the operation did not succeed.
    #[serde(default)]
    pub error: Option<ErrorBody>,
}
