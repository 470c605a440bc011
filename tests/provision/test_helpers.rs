//! Shared fixtures for provisioning BDD scenarios.

use std::time::Duration;

use inlets_provision::test_support::FakeArm;
use inlets_provision::{
    AzureProvisioner, AzureSettings, ErrorKind, ProvisionError, ProvisionedHost, Stage,
};
use rstest::fixture;

use crate::test_constants::TEST_IMAGE;

#[derive(Clone, Debug)]
pub struct ProvisionContext {
    pub arm: FakeArm,
    pub deadline_passed: bool,
    pub outcome: Option<Outcome>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub stage: Option<Stage>,
    pub message: String,
}

impl From<&ProvisionError> for Failure {
    fn from(err: &ProvisionError) -> Self {
        Self {
            kind: err.kind(),
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Outcome {
    Host(ProvisionedHost),
    Deleted,
    Failure(Failure),
}

impl ProvisionContext {
    pub fn provisioner(&self) -> AzureProvisioner<FakeArm> {
        AzureProvisioner::with_client(
            self.arm.clone(),
            AzureSettings {
                image: TEST_IMAGE.to_owned(),
                poll_interval: Duration::from_millis(1),
                wait_timeout: Duration::from_secs(5),
            },
        )
    }

    #[must_use]
    pub fn with_outcome(self, outcome: Outcome) -> Self {
        Self {
            outcome: Some(outcome),
            ..self
        }
    }
}

#[fixture]
pub fn provision_context() -> ProvisionContext {
    ProvisionContext {
        arm: FakeArm::new(),
        deadline_passed: false,
        outcome: None,
    }
}

pub fn parse_kind(label: &str) -> Option<ErrorKind> {
    match label {
        "not ready" => Some(ErrorKind::NotReady),
        "not found" => Some(ErrorKind::NotFound),
        "cancelled" => Some(ErrorKind::Cancelled),
        "fatal" => Some(ErrorKind::Fatal),
        _ => None,
    }
}
