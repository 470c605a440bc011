//! Opaque container group identifiers.
//!
//! The identifier is the ARM resource id itself, so it is readable by
//! operators and enough to find the container group again:
//!
//! ```text
//! /subscriptions/{subscription}/resourceGroups/{group}/providers/Microsoft.ContainerInstance/containerGroups/{name}
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::IdentityError;

const SUBSCRIPTIONS: &str = "subscriptions";
const RESOURCE_GROUPS: &str = "resourceGroups";
const PROVIDERS: &str = "providers";
const NAMESPACE: &str = "Microsoft.ContainerInstance";
const CONTAINER_GROUPS: &str = "containerGroups";
const SEGMENT_COUNT: usize = 9;

/// Addressing path of a container group: subscription, resource group, name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ContainerGroupId {
    subscription_id: String,
    resource_group: String,
    name: String,
}

impl ContainerGroupId {
    /// Builds an identifier from its three parts.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when a part is empty or contains `/`, since
    /// such a value could not be decoded back unchanged.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let id = Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        };
        for (label, value) in [
            ("subscription", &id.subscription_id),
            ("resource group", &id.resource_group),
            ("name", &id.name),
        ] {
            if value.is_empty() {
                return Err(IdentityError::new(id.to_string(), format!("empty {label}")));
            }
            if value.contains('/') {
                return Err(IdentityError::new(
                    id.to_string(),
                    format!("{label} contains '/'"),
                ));
            }
        }
        Ok(id)
    }

    /// Subscription the container group is billed to.
    #[must_use]
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Resource group holding the container group.
    #[must_use]
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Container group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits the identifier into `(subscription, resource group, name)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String, String) {
        (self.subscription_id, self.resource_group, self.name)
    }

    /// ARM path of the resource group holding this container group.
    #[must_use]
    pub fn resource_group_path(&self) -> String {
        format!(
            "/{SUBSCRIPTIONS}/{}/{RESOURCE_GROUPS}/{}",
            self.subscription_id, self.resource_group
        )
    }
}

impl fmt::Display for ContainerGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{PROVIDERS}/{NAMESPACE}/{CONTAINER_GROUPS}/{}",
            self.resource_group_path(),
            self.name
        )
    }
}

impl FromStr for ContainerGroupId {
    type Err = IdentityError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = id.split('/').collect();
        let [
            leading,
            subscriptions,
            subscription_id,
            resource_groups,
            resource_group,
            providers,
            namespace,
            container_groups,
            name,
        ] = segments.as_slice()
        else {
            return Err(IdentityError::new(
                id,
                format!(
                    "expected {SEGMENT_COUNT} '/'-separated segments, found {}",
                    segments.len()
                ),
            ));
        };

        if !leading.is_empty() {
            return Err(IdentityError::new(id, "identifier must start with '/'"));
        }
        for (found, expected) in [
            (subscriptions, SUBSCRIPTIONS),
            (resource_groups, RESOURCE_GROUPS),
            (providers, PROVIDERS),
            (namespace, NAMESPACE),
            (container_groups, CONTAINER_GROUPS),
        ] {
            if !found.eq_ignore_ascii_case(expected) {
                return Err(IdentityError::new(
                    id,
                    format!("expected segment '{expected}', found '{found}'"),
                ));
            }
        }

        Self::new(*subscription_id, *resource_group, *name)
            .map_err(|err| IdentityError::new(id, err.reason))
    }
}
