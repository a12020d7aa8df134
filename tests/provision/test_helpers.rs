//! Shared fixtures for provisioning BDD scenarios.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use linode_machine::test_support::{ScriptedApi, StaticKey};
use linode_machine::{
    Configuration, DriverOptions, Instance, InstanceId, LinodeDriver, Provisioner,
};
use rstest::fixture;

pub type TestDriver = LinodeDriver<ScriptedApi, StaticKey>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateFailure {
    pub instance_id: Option<InstanceId>,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct ProvisionContext {
    pub api: ScriptedApi,
    pub options: DriverOptions,
    pub driver: Arc<Mutex<Option<TestDriver>>>,
    pub created: Option<Result<Instance, CreateFailure>>,
    pub removed: Option<Result<(), String>>,
}

impl ProvisionContext {
    /// Builds a driver from the current options unless one already exists.
    pub fn take_driver(&self) -> Result<TestDriver, String> {
        let existing = self
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = existing {
            return Ok(driver);
        }
        let config = Configuration::from_options(&self.options, "bdd-machine")
            .map_err(|err| err.to_string())?;
        Ok(
            LinodeDriver::with_api(config, StaticKey::default(), self.api.clone())
                .with_provisioner(
                    Provisioner::new()
                        .with_poll_interval(Duration::from_millis(10))
                        .with_boot_timeout(Duration::from_secs(2)),
                ),
        )
    }

    pub fn put_driver(&self, driver: TestDriver) {
        *self.driver.lock().unwrap_or_else(PoisonError::into_inner) = Some(driver);
    }
}

#[fixture]
pub fn provision_context() -> ProvisionContext {
    ProvisionContext {
        api: ScriptedApi::new(),
        options: DriverOptions {
            token: String::from("bdd-token"),
            root_pass: Some(String::from("bdd-root-password")),
            ..DriverOptions::default()
        },
        driver: Arc::new(Mutex::new(None)),
        created: None,
        removed: None,
    }
}
