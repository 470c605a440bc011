//! Unit tests for Azure lifecycle helpers.

use std::time::Duration;

use crate::azure::{AzureHost, AzureProvisioner, AzureSettings, ContainerGroupId};
use crate::error::{FatalCause, ProvisionError, Stage};
use crate::host::BasicHost;
use crate::test_support::{FAKE_SUBSCRIPTION, FakeArm};

mod wait;

const HOST_NAME: &str = "inlets-exit";
const REGION: &str = "westeurope";
const TOKEN: &str = "tunnel-s3cret";

fn settings() -> AzureSettings {
    AzureSettings {
        image: String::from("registry.example/inlets:test"),
        poll_interval: Duration::from_millis(1),
        wait_timeout: Duration::from_secs(5),
    }
}

fn provisioner(fake: &FakeArm) -> AzureProvisioner<FakeArm> {
    AzureProvisioner::with_client(fake.clone(), settings())
}

fn host() -> BasicHost {
    BasicHost::builder()
        .name(HOST_NAME)
        .region(REGION)
        .token(TOKEN)
        .build()
        .expect("host should be valid")
}

fn azure_host() -> AzureHost {
    AzureHost::resolve(&host(), Some(FAKE_SUBSCRIPTION)).expect("subscription resolves")
}

fn group_id() -> ContainerGroupId {
    ContainerGroupId::new(FAKE_SUBSCRIPTION, HOST_NAME, HOST_NAME).expect("valid id")
}

#[track_caller]
fn assert_fatal(result: Result<impl std::fmt::Debug, ProvisionError>, stage: Stage, cause: FatalCause) {
    match result {
        Err(ProvisionError::Fatal {
            stage: got_stage,
            cause: got_cause,
            ..
        }) => {
            assert_eq!(got_stage, stage);
            assert_eq!(got_cause, cause);
        }
        other => panic!("expected fatal error at {stage:?}, got {other:?}"),
    }
}
