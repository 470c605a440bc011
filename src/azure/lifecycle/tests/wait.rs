//! Completion waits, deadlines and cancellation.

use std::time::Duration;

use tokio::time::Instant;

use super::*;
use crate::azure::ArmError;
use crate::azure::model::ContainerGroup;
use crate::context::CallContext;
use crate::error::ErrorKind;
use crate::host::{STATUS_ACTIVE, STATUS_PROVISIONING};
use crate::provision::Provisioner;
use crate::test_support::{ArmCall, ArmOp, FAKE_IP, FAKE_OPERATION_URL};

#[tokio::test]
async fn polls_operation_url_until_succeeded() {
    let fake = FakeArm::new();
    fake.respond_async(Some(Duration::from_millis(1)));
    fake.push_operation("InProgress", None, Some(Duration::from_millis(1)));
    fake.push_operation("Succeeded", None, None);
    let backend = provisioner(&fake);

    let snapshot = backend
        .provision(&host(), &CallContext::new())
        .await
        .expect("provision should succeed");

    assert_eq!(snapshot.status, STATUS_ACTIVE);
    assert_eq!(snapshot.ip, FAKE_IP);
    assert_eq!(fake.count(ArmOp::PollOperation), 2);
    assert!(fake.calls().contains(&ArmCall::PollOperation {
        url: FAKE_OPERATION_URL.to_owned()
    }));
}

#[tokio::test]
async fn failed_operation_is_fatal_with_reported_error() {
    let fake = FakeArm::new();
    fake.respond_async(None);
    fake.push_operation(
        "Failed",
        Some(("InaccessibleImage", "image registry.example/inlets:test not found")),
        None,
    );
    let backend = provisioner(&fake);

    let err = backend
        .provision(&host(), &CallContext::new())
        .await
        .expect_err("operation failed");

    let ProvisionError::Fatal {
        stage,
        cause,
        source,
    } = err
    else {
        panic!("expected fatal error");
    };
    assert_eq!(stage, Stage::WaitForCompletion);
    assert_eq!(cause, FatalCause::OperationFailed);
    assert!(source.to_string().contains("InaccessibleImage"));
    assert_eq!(fake.count(ArmOp::GetContainerGroup), 0);
}

#[tokio::test]
async fn canceled_operation_is_fatal() {
    let fake = FakeArm::new();
    fake.respond_async(None);
    fake.push_operation("Canceled", None, None);
    let backend = provisioner(&fake);

    let result = backend.provision(&host(), &CallContext::new()).await;

    assert_fatal(result, Stage::WaitForCompletion, FatalCause::OperationFailed);
}

#[tokio::test]
async fn polls_resource_when_reply_is_not_terminal() {
    let fake = FakeArm::new();
    fake.set_created_state("Creating", "");
    fake.push_container_state("Creating", "");
    fake.push_container_state("Succeeded", FAKE_IP);
    let backend = provisioner(&fake);

    let snapshot = backend
        .provision(&host(), &CallContext::new())
        .await
        .expect("provision should succeed");

    assert_eq!(snapshot.status, STATUS_ACTIVE);
    // Two waits plus the final read.
    assert_eq!(fake.count(ArmOp::GetContainerGroup), 3);
}

#[tokio::test]
async fn succeeded_reply_without_ip_is_returned_as_provisioning() {
    let fake = FakeArm::new();
    fake.set_created_state("Succeeded", "");
    let backend = provisioner(&fake);

    let snapshot = backend
        .provision(&host(), &CallContext::new())
        .await
        .expect("provision may return before an address is assigned");

    assert_eq!(snapshot.status, STATUS_PROVISIONING);
    assert!(snapshot.ip.is_empty());
    assert!(!snapshot.id.is_empty());
}

#[tokio::test]
async fn wait_timeout_bounds_resource_polling() {
    let fake = FakeArm::new();
    fake.set_created_state("Creating", "");
    let backend = AzureProvisioner::with_client(
        fake.clone(),
        AzureSettings {
            wait_timeout: Duration::from_millis(30),
            ..settings()
        },
    );

    let err = backend
        .provision(&host(), &CallContext::new())
        .await
        .expect_err("resource never settles");

    assert!(matches!(
        err,
        ProvisionError::DeadlineExceeded {
            stage: Stage::WaitForCompletion
        }
    ));
}

#[tokio::test]
async fn oversized_wait_timeout_falls_back_to_the_caller_context() {
    let fake = FakeArm::new();
    fake.set_created_state("Creating", "");
    fake.push_container_state("Succeeded", "20.1.2.3");
    let backend = AzureProvisioner::with_client(
        fake.clone(),
        AzureSettings {
            wait_timeout: Duration::from_secs(u64::MAX),
            ..settings()
        },
    );

    let snapshot = backend
        .provision(&host(), &CallContext::with_timeout(Duration::from_secs(5)))
        .await
        .expect("resource settles within the caller deadline");

    assert_eq!(snapshot.ip, "20.1.2.3");
    assert_eq!(snapshot.status, STATUS_ACTIVE);
}

#[tokio::test]
async fn expired_deadline_returns_before_any_request() {
    let fake = FakeArm::new();
    let backend = provisioner(&fake);
    let ctx = CallContext::with_deadline(Instant::now() - Duration::from_millis(1));

    let started = Instant::now();
    let err = backend
        .provision(&host(), &ctx)
        .await
        .expect_err("deadline already passed");

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(matches!(err, ProvisionError::DeadlineExceeded { .. }));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn cancellation_interrupts_in_flight_request() {
    let fake = FakeArm::new();
    fake.stall(ArmOp::PutContainerGroup);
    let backend = provisioner(&fake);
    let ctx = CallContext::new();
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let err = backend
        .provision(&host(), &ctx)
        .await
        .expect_err("call was cancelled");

    assert!(matches!(
        err,
        ProvisionError::Cancelled {
            stage: Stage::ComputeResource
        }
    ));
}

#[tokio::test]
async fn asynchronous_delete_waits_for_operation() {
    let fake = FakeArm::new();
    fake.seed_container_group(&group_id(), ContainerGroup::default());
    fake.respond_async(None);
    fake.push_operation("InProgress", None, None);
    fake.push_operation("Succeeded", None, None);
    let backend = provisioner(&fake);

    backend
        .delete(&group_id().to_string(), &CallContext::new())
        .await
        .expect("delete should succeed");

    assert_eq!(fake.count(ArmOp::PollOperation), 2);
}

#[tokio::test]
async fn failed_delete_operation_is_fatal_at_teardown() {
    let fake = FakeArm::new();
    fake.seed_container_group(&group_id(), ContainerGroup::default());
    fake.respond_async(None);
    fake.push_operation("Failed", None, None);
    let backend = provisioner(&fake);

    let result = backend
        .delete(&group_id().to_string(), &CallContext::new())
        .await;

    assert_fatal(result, Stage::Teardown, FatalCause::OperationFailed);
}

#[tokio::test]
async fn unreadable_operation_reply_is_fatal_at_wait_stage() {
    let fake = FakeArm::new();
    fake.respond_async(None);
    fake.fail_next(
        ArmOp::PollOperation,
        ArmError {
            status: Some(200),
            code: String::from("InvalidResponse"),
            message: String::from("expected value at line 1 column 1"),
        },
    );
    let backend = provisioner(&fake);

    let result = backend.provision(&host(), &CallContext::new()).await;

    assert_fatal(result, Stage::WaitForCompletion, FatalCause::Transport);
    assert_eq!(fake.count(ArmOp::GetContainerGroup), 0);
}
