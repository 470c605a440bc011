//! Completion waits for long-running ARM operations.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::context::CallContext;
use crate::error::{FatalCause, ProvisionError, Stage};

use super::super::client::{ArmApi, PendingOperation};
use super::super::error::{ArmError, ErrorBody};
use super::super::identity::ContainerGroupId;
use super::super::AzureProvisioner;
use super::super::model::{is_succeeded, is_terminal};
use super::arm_call;

impl<C: ArmApi> AzureProvisioner<C> {
    /// Parks until a submitted container group reaches a terminal state.
    ///
    /// Polls the operation URL when ARM returned one; otherwise trusts a
    /// terminal state in the reply body, and failing that polls the resource.
    /// The wait is bounded by `ctx` and by the configured wait timeout.
    pub(in crate::azure) async fn await_creation(
        &self,
        id: &ContainerGroupId,
        pending: PendingOperation,
        ctx: &CallContext,
    ) -> Result<(), ProvisionError> {
        let stage = Stage::WaitForCompletion;
        let bounded = ctx.bounded(self.settings.wait_timeout);
        let raw_id = id.to_string();

        if let Some(url) = pending.status_url.as_deref() {
            return self
                .wait_for_operation(&raw_id, url, pending.retry_after, stage, &bounded)
                .await;
        }

        let mut state = pending
            .resource
            .as_ref()
            .map(|group| group.provisioning_state().to_owned())
            .unwrap_or_default();
        let mut delay = pending.retry_after.unwrap_or(self.settings.poll_interval);
        while !is_terminal(&state) {
            debug!(id = %raw_id, state = %state, "waiting for container group");
            bounded.sleep(stage, delay).await?;
            let group = arm_call(&bounded, stage, &raw_id, self.client.get_container_group(id))
                .await?;
            group.provisioning_state().clone_into(&mut state);
            delay = self.settings.poll_interval;
        }
        settle(stage, &state, None)
    }

    /// Deletes the container group and waits for ARM to confirm.
    ///
    /// A missing group surfaces as [`ProvisionError::NotFound`].
    pub(in crate::azure) async fn remove_container_group(
        &self,
        id: &ContainerGroupId,
        ctx: &CallContext,
    ) -> Result<(), ProvisionError> {
        let stage = Stage::Teardown;
        let raw_id = id.to_string();
        let pending = arm_call(ctx, stage, &raw_id, self.client.delete_container_group(id)).await?;
        if let Some(url) = pending.status_url.as_deref() {
            let bounded = ctx.bounded(self.settings.wait_timeout);
            self.wait_for_operation(&raw_id, url, pending.retry_after, stage, &bounded)
                .await?;
        }
        info!(id = %raw_id, "container group deleted");
        Ok(())
    }

    async fn wait_for_operation(
        &self,
        raw_id: &str,
        url: &str,
        first_delay: Option<Duration>,
        stage: Stage,
        ctx: &CallContext,
    ) -> Result<(), ProvisionError> {
        let mut delay = first_delay.unwrap_or(self.settings.poll_interval);
        loop {
            ctx.sleep(stage, delay).await?;
            let poll = arm_call(ctx, stage, raw_id, self.client.poll_operation(url)).await?;
            let state = poll.status.status;
            if is_terminal(&state) {
                return settle(stage, &state, poll.status.error);
            }
            debug!(id = %raw_id, state = %state, "operation still running");
            delay = poll.retry_after.unwrap_or(self.settings.poll_interval);
        }
    }
}

fn settle(stage: Stage, state: &str, error: Option<ErrorBody>) -> Result<(), ProvisionError> {
    if is_succeeded(state) {
        return Ok(());
    }
    warn!(stage = %stage.as_str(), state = %state, "operation did not succeed");
    Err(ProvisionError::fatal(
        stage,
        FatalCause::OperationFailed,
        ArmError::operation_failed(state, error),
    ))
}
