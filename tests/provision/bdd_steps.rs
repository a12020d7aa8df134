//! BDD step definitions for the provisioning workflow.

use std::net::Ipv4Addr;

use linode_machine::LinodeStatus;
use linode_machine::error::Stage;
use linode_machine::test_support::{ApiCall, boot_config, linode, not_found, stackscript};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{CreateFailure, ProvisionContext};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("invalid step input: {0}")]
    Input(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn parse_addresses(raw: &str) -> Result<Vec<Ipv4Addr>, StepError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<Ipv4Addr>()
                .map_err(|err| StepError::Input(format!("{part}: {err}")))
        })
        .collect()
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Input(format!("runtime: {err}")))
}

#[given("a driver configured for a public instance")]
fn public_driver(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context
}

#[given("a driver configured with a private address")]
fn private_driver(mut provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.options.create_private_ip = true;
    provision_context
}

#[given("a driver configured with StackScript \"{reference}\"")]
fn stackscript_driver(mut provision_context: ProvisionContext, reference: String) -> ProvisionContext {
    provision_context.options.stackscript = Some(reference);
    provision_context
}

#[given("the API creates instance \"{id}\" with addresses \"{addresses}\"")]
fn api_creates(
    provision_context: ProvisionContext,
    id: u64,
    addresses: String,
) -> Result<ProvisionContext, StepError> {
    let ipv4 = parse_addresses(&addresses)?;
    let initial = if provision_context.options.create_private_ip {
        "offline"
    } else {
        "provisioning"
    };
    provision_context.api.set_created(linode(id, initial, &ipv4));
    Ok(provision_context)
}

#[given("the instance eventually reports \"{status}\"")]
fn instance_reports(
    provision_context: ProvisionContext,
    status: String,
) -> Result<ProvisionContext, StepError> {
    let mut current = provision_context
        .api
        .created()
        .ok_or_else(|| StepError::Input(String::from("no created instance scripted")))?;
    current.status = LinodeStatus::from(status.as_str());
    provision_context.api.push_instance(current);
    Ok(provision_context)
}

#[given("the instance has boot configuration \"{id}\"")]
fn boot_configuration(provision_context: ProvisionContext, id: u64) -> ProvisionContext {
    provision_context.api.set_configs(vec![boot_config(id)]);
    provision_context
}

#[given("the catalog holds StackScript \"{id}\" owned by \"{owner}\" labelled \"{label}\"")]
fn catalog_entry(
    provision_context: ProvisionContext,
    id: u64,
    owner: String,
    label: String,
) -> ProvisionContext {
    provision_context
        .api
        .add_stackscript(stackscript(id, &owner, &label));
    provision_context
}

#[given("deleting the instance reports not found")]
fn delete_not_found(provision_context: ProvisionContext) -> ProvisionContext {
    provision_context.api.fail(Stage::Delete, not_found());
    provision_context
}

#[when("I create the machine")]
fn create_machine(mut provision_context: ProvisionContext) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let mut driver = provision_context
        .take_driver()
        .map_err(StepError::Input)?;
    let outcome = runtime.block_on(async {
        driver
            .create()
            .await
            .map(Clone::clone)
            .map_err(|failure| CreateFailure {
                instance_id: failure.instance_id,
                message: failure.to_string(),
            })
    });
    provision_context.put_driver(driver);
    provision_context.created = Some(outcome);
    Ok(provision_context)
}

#[when("I remove the machine")]
fn remove_machine(mut provision_context: ProvisionContext) -> Result<ProvisionContext, StepError> {
    let runtime = runtime()?;
    let mut driver = provision_context
        .take_driver()
        .map_err(StepError::Input)?;
    let outcome = runtime
        .block_on(driver.remove())
        .map_err(|err| err.to_string());
    provision_context.put_driver(driver);
    provision_context.removed = Some(outcome);
    Ok(provision_context)
}

fn created_instance(
    provision_context: &ProvisionContext,
) -> Result<&linode_machine::Instance, StepError> {
    match &provision_context.created {
        Some(Ok(instance)) => Ok(instance),
        Some(Err(failure)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {}",
            failure.message
        ))),
        None => Err(StepError::Assertion(String::from("machine was not created"))),
    }
}

fn creation_failure(provision_context: &ProvisionContext) -> Result<&CreateFailure, StepError> {
    match &provision_context.created {
        Some(Err(failure)) => Ok(failure),
        Some(Ok(instance)) => Err(StepError::Assertion(format!(
            "expected failure, got instance {}",
            instance.id
        ))),
        None => Err(StepError::Assertion(String::from("machine was not created"))),
    }
}

fn expect_eq<T: PartialEq + std::fmt::Debug>(
    what: &str,
    actual: T,
    expected: T,
) -> Result<(), StepError> {
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "{what}: expected {expected:?}, got {actual:?}"
        )))
    }
}

#[then("creation succeeds")]
fn creation_succeeds(provision_context: &ProvisionContext) -> Result<(), StepError> {
    created_instance(provision_context).map(|_| ())
}

#[then("the public address is \"{address}\"")]
fn public_address(provision_context: &ProvisionContext, address: String) -> Result<(), StepError> {
    let instance = created_instance(provision_context)?;
    expect_eq("public address", instance.public_ip.to_string(), address)
}

#[then("the private address is \"{address}\"")]
fn private_address(provision_context: &ProvisionContext, address: String) -> Result<(), StepError> {
    let instance = created_instance(provision_context)?;
    expect_eq(
        "private address",
        instance.private_ip.map(|ip| ip.to_string()),
        Some(address),
    )
}

#[then("the service URL is \"{url}\"")]
fn service_url(provision_context: &ProvisionContext, url: String) -> Result<(), StepError> {
    let driver = provision_context
        .take_driver()
        .map_err(StepError::Input)?;
    let actual = driver.url().map_err(|err| StepError::Assertion(err.to_string()));
    provision_context.put_driver(driver);
    expect_eq("service URL", actual?, url)
}

#[then("the machine state is \"{state}\"")]
fn machine_state(provision_context: &ProvisionContext, state: String) -> Result<(), StepError> {
    let runtime = runtime()?;
    let driver = provision_context
        .take_driver()
        .map_err(StepError::Input)?;
    let actual = runtime.block_on(driver.state());
    provision_context.put_driver(driver);
    expect_eq("machine state", actual.to_string(), state)
}

#[then("the network helper is enabled before the instance boots")]
fn helper_before_boot(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let calls = provision_context.api.calls();
    let update_at = calls
        .iter()
        .position(|call| {
            matches!(call, ApiCall::UpdateInstanceConfig(_, _, update)
                if update.helpers.as_ref().is_some_and(|helpers| helpers.network))
        })
        .ok_or_else(|| StepError::Assertion(format!("no helper update in {calls:?}")))?;
    let boot_at = calls
        .iter()
        .position(|call| matches!(call, ApiCall::BootInstance(_, Some(_))))
        .ok_or_else(|| StepError::Assertion(format!("no explicit boot in {calls:?}")))?;
    if update_at < boot_at {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "boot preceded the helper update: {calls:?}"
        )))
    }
}

#[then("creation fails mentioning \"{text}\"")]
fn creation_fails(provision_context: &ProvisionContext, text: String) -> Result<(), StepError> {
    let failure = creation_failure(provision_context)?;
    if failure.message.contains(&text) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {text:?} in {:?}",
            failure.message
        )))
    }
}

#[then("the failed instance identifier is \"{id}\"")]
fn failed_instance_id(provision_context: &ProvisionContext, id: u64) -> Result<(), StepError> {
    let failure = creation_failure(provision_context)?;
    expect_eq(
        "failed instance id",
        failure.instance_id.map(|instance| instance.get()),
        Some(id),
    )
}

#[then("no instance was requested")]
fn no_instance_requested(provision_context: &ProvisionContext) -> Result<(), StepError> {
    let calls = provision_context.api.calls();
    if calls
        .iter()
        .any(|call| matches!(call, ApiCall::CreateInstance(_)))
    {
        return Err(StepError::Assertion(format!(
            "unexpected create call: {calls:?}"
        )));
    }
    Ok(())
}

#[then("removal succeeds")]
fn removal_succeeds(provision_context: &ProvisionContext) -> Result<(), StepError> {
    match &provision_context.removed {
        Some(Ok(())) => Ok(()),
        Some(Err(message)) => Err(StepError::Assertion(format!(
            "expected removal to succeed: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("machine was not removed"))),
    }
}
