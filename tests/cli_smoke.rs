//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("inlets-provision");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_every_operation() {
    let mut cmd = cargo_bin_cmd!("inlets-provision");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn blank_region_fails_before_reaching_azure() {
    let mut cmd = cargo_bin_cmd!("inlets-provision");
    cmd.args(["provision", "--name", "exit-1", "--region", " ", "--token", "s3cret"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("region"));
}

#[test]
fn missing_auth_file_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let missing = tmp.path().join("absent.auth");
    let mut cmd = cargo_bin_cmd!("inlets-provision");
    cmd.env("AZURE_AUTH_LOCATION", &missing)
        .env_remove("INLETS_ACCESS_KEY_FILE")
        .env("INLETS_CONFIG_PATH", tmp.path().join("inlets-provision.toml"))
        .args(["status", "/subscriptions/s/resourceGroups/g"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}
