//! Behavioural scenarios for provisioning inlets exit nodes on Azure.

#[path = "common/test_constants.rs"]
mod test_constants;

mod provision;
