//! BDD scenarios for the provisioning workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProvisionContext, provision_context};

#[scenario(
    path = "tests/features/provision.feature",
    name = "Create an instance with only a public address"
)]
fn scenario_public_instance(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Enable the network helper before first boot for private networking"
)]
fn scenario_private_networking(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Keep the instance identifier when no public address is assigned"
)]
fn scenario_missing_public_address(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Reject a StackScript owned by someone else"
)]
fn scenario_stackscript_owner_mismatch(provision_context: ProvisionContext) {
    let _ = provision_context;
}

#[scenario(
    path = "tests/features/provision.feature",
    name = "Treat removal of a vanished instance as success"
)]
fn scenario_remove_vanished_instance(provision_context: ProvisionContext) {
    let _ = provision_context;
}
