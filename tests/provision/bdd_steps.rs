//! BDD step definitions for provisioning, status and teardown.

use std::time::Duration;

use inlets_provision::azure::ArmError;
use inlets_provision::azure::model::ContainerGroup;
use inlets_provision::test_support::{ArmCall, ArmOp, FAKE_SUBSCRIPTION};
use inlets_provision::{
    BasicHost, CallContext, ContainerGroupId, ProvisionError, Provisioner, STATUS_ACTIVE,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{Failure, Outcome, ProvisionContext, parse_kind};
use crate::test_constants::{TEST_REGION, TEST_TOKEN};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn group_id(name: &str) -> Result<ContainerGroupId, StepError> {
    ContainerGroupId::new(FAKE_SUBSCRIPTION, name, name)
        .map_err(|err| StepError::Assertion(err.to_string()))
}

fn host(name: &str) -> Result<BasicHost, StepError> {
    BasicHost::builder()
        .name(name)
        .region(TEST_REGION)
        .token(TEST_TOKEN)
        .build()
        .map_err(|err| StepError::Assertion(err.to_string()))
}

fn call_context(provision_context: &ProvisionContext) -> CallContext {
    if provision_context.deadline_passed {
        CallContext::with_timeout(Duration::ZERO)
    } else {
        CallContext::with_timeout(Duration::from_secs(10))
    }
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

fn record<T>(result: Result<T, ProvisionError>, success: impl FnOnce(T) -> Outcome) -> Outcome {
    match result {
        Ok(value) => success(value),
        Err(err) => Outcome::Failure(Failure::from(&err)),
    }
}

#[given("an Azure subscription without resources")]
fn empty_subscription(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context
}

#[given("resource group updates are rejected")]
fn resource_group_rejected(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.arm.fail_next(
        ArmOp::PutResourceGroup,
        ArmError {
            status: Some(403),
            code: String::from("AuthorizationFailed"),
            message: String::from("caller cannot write resource groups"),
        },
    );
    provision_context
}

#[given("the caller's deadline has already passed")]
fn deadline_passed(provision_context: ProvisionContext) -> ProvisionContext {
    ProvisionContext {
        deadline_passed: true,
        ..provision_context
    }
}

#[given("a container group \"{name}\" in state \"{state}\" without an address")]
fn group_without_address(
    provision_context: ProvisionContext,
    name: String,
    state: String,
) -> Result<ProvisionContext, StepError> {
    let id = group_id(&name)?;
    provision_context
        .arm
        .seed_container_group(&id, ContainerGroup::default());
    provision_context.arm.push_container_state(&state, "");
    Ok(provision_context)
}

#[given("a container group \"{name}\" in state \"{state}\" at address \"{ip}\"")]
fn group_with_address(
    provision_context: ProvisionContext,
    name: String,
    state: String,
    ip: String,
) -> Result<ProvisionContext, StepError> {
    let id = group_id(&name)?;
    provision_context
        .arm
        .seed_container_group(&id, ContainerGroup::default());
    provision_context.arm.push_container_state(&state, &ip);
    Ok(provision_context)
}

#[when("I provision host \"{name}\"")]
fn provision_once(
    provision_context: ProvisionContext,
    name: String,
) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let host = host(&name)?;
    let provisioner = provision_context.provisioner();
    let ctx = call_context(&provision_context);
    let result = runtime.block_on(async move { provisioner.provision(&host, &ctx).await });
    Ok(provision_context.with_outcome(record(result, Outcome::Host)))
}

#[when("I provision host \"{name}\" twice")]
fn provision_twice(
    provision_context: ProvisionContext,
    name: String,
) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let host = host(&name)?;
    let provisioner = provision_context.provisioner();
    let ctx = call_context(&provision_context);
    let result = runtime.block_on(async move {
        provisioner.provision(&host, &ctx).await?;
        provisioner.provision(&host, &ctx).await
    });
    Ok(provision_context.with_outcome(record(result, Outcome::Host)))
}

#[when("I query the status of \"{name}\"")]
fn query_status(
    provision_context: ProvisionContext,
    name: String,
) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let id = group_id(&name)?.to_string();
    let provisioner = provision_context.provisioner();
    let ctx = call_context(&provision_context);
    let result = runtime.block_on(async move { provisioner.status(&id, &ctx).await });
    Ok(provision_context.with_outcome(record(result, Outcome::Host)))
}

#[when("I delete \"{name}\" twice")]
fn delete_twice(
    provision_context: ProvisionContext,
    name: String,
) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let id = group_id(&name)?.to_string();
    let provisioner = provision_context.provisioner();
    let ctx = call_context(&provision_context);
    let result = runtime.block_on(async move {
        provisioner.delete(&id, &ctx).await?;
        provisioner.delete(&id, &ctx).await
    });
    Ok(provision_context.with_outcome(record(result, |()| Outcome::Deleted)))
}

fn failure(provision_context: &ProvisionContext) -> Result<&Failure, StepError> {
    match &provision_context.outcome {
        Some(Outcome::Failure(failure)) => Ok(failure),
        other => Err(StepError::Assertion(format!(
            "expected a failure, got {other:?}"
        ))),
    }
}

#[then("exactly one resource group exists")]
fn one_resource_group(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match provision_context.arm.resource_group_count() {
        1 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "expected one resource group, found {count}"
        ))),
    }
}

#[then("no resource group update carried a provisioning state")]
fn updates_without_state(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let offending: Vec<_> = provision_context
        .arm
        .calls()
        .into_iter()
        .filter(|call| {
            matches!(
                call,
                ArmCall::PutResourceGroup { body, .. } if body.provisioning_state().is_some()
            )
        })
        .collect();
    if offending.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "resource group updates carried server state: {offending:?}"
        )))
    }
}

#[then("the host is reported as \"{status}\"")]
fn host_reported(provision_context: &ProvisionContext, status: String) -> Result<(), StepError> {
    match &provision_context.outcome {
        Some(Outcome::Host(host)) if host.status == status => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a host with status {status}, got {other:?}"
        ))),
    }
}

#[then("the host is reported as \"{status}\" at address \"{ip}\"")]
fn host_reported_at(
    provision_context: &ProvisionContext,
    status: String,
    ip: String,
) -> Result<(), StepError> {
    match &provision_context.outcome {
        Some(Outcome::Host(host)) if host.status == status && host.ip == ip => {
            if status == STATUS_ACTIVE && !host.is_ready() {
                return Err(StepError::Assertion(format!(
                    "active host should be ready: {host:?}"
                )));
            }
            Ok(())
        }
        other => Err(StepError::Assertion(format!(
            "expected a host with status {status} at {ip}, got {other:?}"
        ))),
    }
}

#[then("the call fails at stage \"{stage}\"")]
fn fails_at_stage(provision_context: &ProvisionContext, stage: String) -> Result<(), StepError> {
    let failure = failure(provision_context)?;
    match failure.stage {
        Some(actual) if actual.as_str() == stage => Ok(()),
        actual => Err(StepError::Assertion(format!(
            "expected stage {stage}, got {actual:?}: {}",
            failure.message
        ))),
    }
}

#[then("the call fails with kind \"{kind}\"")]
fn fails_with_kind(provision_context: &ProvisionContext, kind: String) -> Result<(), StepError> {
    let expected = parse_kind(&kind)
        .ok_or_else(|| StepError::Assertion(format!("unknown error kind {kind}")))?;
    let failure = failure(provision_context)?;
    if failure.kind == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {expected:?}, got {:?}: {}",
            failure.kind, failure.message
        )))
    }
}

#[then("no container group was submitted")]
fn no_container_group(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match provision_context.arm.count(ArmOp::PutContainerGroup) {
        0 => Ok(()),
        count => Err(StepError::Assertion(format!(
            "container group was submitted {count} times"
        ))),
    }
}

#[then("no request reached Azure")]
fn no_requests(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let calls = provision_context.arm.calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no requests, got {calls:?}"
        )))
    }
}

#[then("the host is deleted")]
fn host_deleted(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match &provision_context.outcome {
        Some(Outcome::Deleted) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected deletion, got {other:?}"
        ))),
    }
}

#[then("the container group \"{name}\" is gone")]
fn group_gone(provision_context: &ProvisionContext, name: String) -> Result<(), StepError> {
    let id = group_id(&name)?;
    match provision_context.arm.container_group(&id) {
        None => Ok(()),
        Some(group) => Err(StepError::Assertion(format!(
            "container group still exists: {group:?}"
        ))),
    }
}
