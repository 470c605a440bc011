//! Resource lifecycle helpers for the Azure backend.

mod create;
mod group;
mod wait;

pub use create::container_group_spec;

use crate::context::CallContext;
use crate::error::{ProvisionError, Stage};

use super::client::ArmFuture;

/// Runs one ARM request under `ctx`, mapping its failure for `stage`.
///
/// The request future is lazy, so nothing is sent when `ctx` has already
/// ended.
async fn arm_call<T>(
    ctx: &CallContext,
    stage: Stage,
    id: &str,
    request: ArmFuture<'_, T>,
) -> Result<T, ProvisionError> {
    ctx.run(stage, async move {
        request
            .await
            .map_err(|err| err.into_provision_error(stage, id))
    })
    .await
}

#[cfg(test)]
mod tests;
