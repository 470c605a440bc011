//! BDD scenarios for the Azure provisioning workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisionContext, provision_context};

#[scenario(
    path = "tests/features/provision.feature",
    name = "Provisioning the same host twice keeps one resource group"
)]
fn scenario_idempotent_provision(provision_context: ProvisionContext) {
    drop(provision_context);
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "A rejected resource group stops provisioning"
)]
fn scenario_grouping_failure(provision_context: ProvisionContext) {
    drop(provision_context);
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Status of a host that is still creating"
)]
fn scenario_status_not_ready(provision_context: ProvisionContext) {
    drop(provision_context);
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Status of a ready host"
)]
fn scenario_status_ready(provision_context: ProvisionContext) {
    drop(provision_context);
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "An expired deadline sends no requests"
)]
fn scenario_expired_deadline(provision_context: ProvisionContext) {
    drop(provision_context);
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Deleting a host twice succeeds both times"
)]
fn scenario_delete_twice(provision_context: ProvisionContext) {
    drop(provision_context);
}
