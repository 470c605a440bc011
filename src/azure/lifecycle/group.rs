//! Resource group upsert.

use tracing::{debug, info};

use crate::context::CallContext;
use crate::error::{FatalCause, ProvisionError, Stage};

use super::super::client::ArmApi;
use super::super::error::ArmError;
use super::super::model::{ResourceGroup, is_succeeded};
use super::super::{AzureHost, AzureProvisioner, managed_tags};
use super::arm_call;

const STAGE: Stage = Stage::GroupingResource;

impl<C: ArmApi> AzureProvisioner<C> {
    /// Creates the host's resource group, or updates it in place.
    ///
    /// An existing group is resubmitted with its provisioning state cleared
    /// and its location set to the host region. The reply is re-verified:
    /// a state other than absent or `Succeeded` fails the upsert.
    pub(in crate::azure) async fn upsert_resource_group(
        &self,
        host: &AzureHost,
        ctx: &CallContext,
    ) -> Result<ResourceGroup, ProvisionError> {
        let subscription = host.subscription_id();
        let name = host.name();

        let lookup = ctx
            .run(STAGE, async {
                Ok(self.client.get_resource_group(subscription, name).await)
            })
            .await?;
        let mut group = match lookup {
            Ok(mut existing) => {
                debug!(resource_group = %name, "updating existing resource group");
                existing.clear_state();
                existing
            }
            Err(err) if err.is_not_found() => {
                debug!(resource_group = %name, "creating resource group");
                ResourceGroup::default()
            }
            Err(err) => return Err(err.into_provision_error(STAGE, name)),
        };
        host.region().clone_into(&mut group.location);
        group.tags.extend(managed_tags(name));

        let saved = arm_call(
            ctx,
            STAGE,
            name,
            self.client.put_resource_group(subscription, name, &group),
        )
        .await?;

        match saved.provisioning_state() {
            Some(state) if !is_succeeded(state) => Err(ProvisionError::fatal(
                STAGE,
                FatalCause::OperationFailed,
                ArmError::operation_failed(state, None),
            )),
            _ => {
                info!(resource_group = %name, location = %saved.location, "resource group ready");
                Ok(saved)
            }
        }
    }
}
