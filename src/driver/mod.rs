//! Host-facing driver.
//!
//! [`LinodeDriver`] owns one validated [`Configuration`], a key source, and a
//! lazily connected API handle. It exposes the uniform lifecycle contract the
//! host orchestrator expects: create, start, stop, restart, kill, remove, and
//! state, plus the address and SSH accessors.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::address::{self, AddressClass};
use crate::config::Configuration;
use crate::error::{DriverError, ProvisionFailure, Stage};
use crate::instance::Instance;
use crate::keys::{KeySource, SshKeygen};
use crate::linode::{ApiError, ComputeApi, InstanceId, LinodeClient, LinodeStatus};
use crate::provision::Provisioner;
use crate::stackscript::{self, StackScriptRef};
use crate::state::MachineState;

/// Builds the API handle from the configuration on first use.
pub type Connector<A> = fn(&Configuration) -> Result<A, ApiError>;

fn connect_client(config: &Configuration) -> Result<LinodeClient, ApiError> {
    LinodeClient::new(config.token.clone(), config.user_agent_prefix.as_deref())
}

fn preset_only<A>(_config: &Configuration) -> Result<A, ApiError> {
    Err(ApiError::Transport {
        message: String::from("API handle was not supplied"),
    })
}

/// Lifecycle driver for a single Linode instance.
#[derive(Debug)]
pub struct LinodeDriver<A = LinodeClient, K = SshKeygen> {
    config: Configuration,
    keys: K,
    connector: Connector<A>,
    api: OnceLock<A>,
    provisioner: Provisioner,
    instance_id: Option<InstanceId>,
    instance: Option<Instance>,
}

impl<K: KeySource> LinodeDriver<LinodeClient, K> {
    /// Driver that talks to the public Linode API.
    #[must_use]
    pub fn new(config: Configuration, keys: K) -> Self {
        Self::with_connector(config, keys, connect_client)
    }
}

impl<A: ComputeApi, K: KeySource> LinodeDriver<A, K> {
    /// Driver whose API handle is built by `connector` on first use.
    #[must_use]
    pub fn with_connector(config: Configuration, keys: K, connector: Connector<A>) -> Self {
        Self {
            config,
            keys,
            connector,
            api: OnceLock::new(),
            provisioner: Provisioner::new(),
            instance_id: None,
            instance: None,
        }
    }

    /// Driver that uses an already constructed API handle.
    #[must_use]
    pub fn with_api(config: Configuration, keys: K, api: A) -> Self {
        Self {
            api: OnceLock::from(api),
            ..Self::with_connector(config, keys, preset_only::<A>)
        }
    }

    /// Replaces the provisioner, for example to shorten the boot wait.
    #[must_use]
    pub const fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Targets an existing instance by identifier without contacting the API.
    ///
    /// Lifecycle calls then work even when the instance has no usable
    /// address, which is the state a partially failed creation leaves behind.
    #[must_use]
    pub fn for_instance(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = Some(instance_id);
        self.instance = None;
        self
    }

    /// Current configuration, including values written back after creation.
    #[must_use]
    pub const fn config(&self) -> &Configuration {
        &self.config
    }

    /// Identifier of the managed instance. Also set after a creation that
    /// failed once the remote instance existed.
    #[must_use]
    pub const fn instance_id(&self) -> Option<InstanceId> {
        self.instance_id
    }

    /// Record of the created or attached instance.
    #[must_use]
    pub const fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    fn api(&self) -> Result<&A, DriverError> {
        if let Some(api) = self.api.get() {
            return Ok(api);
        }
        let connected = (self.connector)(&self.config)
            .map_err(|err| DriverError::provider(Stage::Connect, err))?;
        Ok(self.api.get_or_init(|| connected))
    }

    fn require_id(&self) -> Result<InstanceId, DriverError> {
        self.instance_id.ok_or(DriverError::NoInstance)
    }

    /// Resolves the configured StackScript and stores the resolved entry.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotFound`] when the StackScript does not exist
    /// and [`DriverError::Provider`] when the catalog cannot be queried.
    pub async fn pre_create_check(&mut self) -> Result<(), DriverError> {
        let Some(reference) = self.config.stackscript.clone() else {
            return Ok(());
        };
        if matches!(reference, StackScriptRef::Resolved(_)) {
            return Ok(());
        }
        let resolved = stackscript::resolve(self.api()?, &reference).await?;
        self.config.stackscript = Some(StackScriptRef::Resolved(resolved));
        Ok(())
    }

    /// Creates the instance and records it.
    ///
    /// Resolves the StackScript first when [`Self::pre_create_check`] has not
    /// run. Region and label are replaced with the values the API reports.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisionFailure`]; when its `instance_id` is set, the
    /// identifier is also kept on the driver so the instance can be removed.
    pub async fn create(&mut self) -> Result<&Instance, ProvisionFailure> {
        self.pre_create_check()
            .await
            .map_err(ProvisionFailure::before_create)?;

        let outcome = {
            let api = self.api().map_err(ProvisionFailure::before_create)?;
            self.provisioner.provision(api, &self.keys, &self.config).await
        };

        match outcome {
            Ok(instance) => {
                info!(
                    instance_id = %instance.id,
                    public_ip = %instance.public_ip,
                    "instance is running"
                );
                self.config.region.clone_from(&instance.region);
                self.config.label.clone_from(&instance.label);
                self.instance_id = Some(instance.id);
                Ok(self.instance.insert(instance))
            }
            Err(failure) => {
                if let Some(partial) = failure.instance_id {
                    warn!(instance_id = %partial, error = %failure, "instance left behind after failed creation");
                }
                if failure.instance_id.is_some() {
                    self.instance_id = failure.instance_id;
                    self.instance = None;
                }
                Err(failure)
            }
        }
    }

    /// Records an existing instance so lifecycle calls can target it.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotFound`] when the instance does not exist,
    /// [`DriverError::Address`] when it has no public address, and
    /// [`DriverError::Provider`] for other API failures.
    pub async fn attach(&mut self, instance_id: InstanceId) -> Result<&Instance, DriverError> {
        let current = self
            .api()?
            .get_instance(instance_id)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    DriverError::NotFound {
                        resource: format!("instance {instance_id}"),
                    }
                } else {
                    DriverError::provider(Stage::GetInstance, err)
                }
            })?;
        let assigned =
            address::assign(&current.ipv4, false).map_err(|missing| DriverError::Address {
                instance_id,
                missing,
            })?;
        let private_ip = current
            .ipv4
            .iter()
            .copied()
            .find(|candidate| address::classify(*candidate) == AddressClass::Private);

        debug!(%instance_id, status = %current.status, "attached to instance");
        self.instance_id = Some(instance_id);
        Ok(self.instance.insert(Instance {
            id: instance_id,
            label: current.label,
            region: current.region,
            status: current.status,
            public_ip: assigned.public,
            private_ip,
            config_id: None,
        }))
    }

    /// Boots the instance with its default boot configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoInstance`] without an instance and
    /// [`DriverError::Provider`] when the API rejects the call.
    pub async fn start(&self) -> Result<(), DriverError> {
        let instance_id = self.require_id()?;
        debug!(%instance_id, "booting instance");
        self.api()?
            .boot_instance(instance_id, None)
            .await
            .map_err(|err| DriverError::provider(Stage::Boot, err))
    }

    /// Requests a graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoInstance`] without an instance and
    /// [`DriverError::Provider`] when the API rejects the call.
    pub async fn stop(&self) -> Result<(), DriverError> {
        let instance_id = self.require_id()?;
        debug!(%instance_id, "shutting down instance");
        self.api()?
            .shutdown_instance(instance_id)
            .await
            .map_err(|err| DriverError::provider(Stage::Shutdown, err))
    }

    /// Issues the same graceful shutdown as [`Self::stop`]; the API offers
    /// no forceful power-off.
    ///
    /// # Errors
    ///
    /// As for [`Self::stop`].
    pub async fn kill(&self) -> Result<(), DriverError> {
        self.stop().await
    }

    /// Reboots the instance in one remote call.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoInstance`] without an instance and
    /// [`DriverError::Provider`] when the API rejects the call.
    pub async fn restart(&self) -> Result<(), DriverError> {
        let instance_id = self.require_id()?;
        debug!(%instance_id, "rebooting instance");
        self.api()?
            .reboot_instance(instance_id, None)
            .await
            .map_err(|err| DriverError::provider(Stage::Reboot, err))
    }

    /// Deletes the instance and forgets it. An instance that is already gone
    /// counts as removed.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoInstance`] without an instance and
    /// [`DriverError::Provider`] for any failure other than not found.
    pub async fn remove(&mut self) -> Result<(), DriverError> {
        let instance_id = self.require_id()?;
        match self.api()?.delete_instance(instance_id).await {
            Ok(()) => info!(%instance_id, "removed instance"),
            Err(err) if err.is_not_found() => {
                debug!(%instance_id, "instance already removed");
            }
            Err(err) => return Err(DriverError::provider(Stage::Delete, err)),
        }
        self.instance_id = None;
        self.instance = None;
        Ok(())
    }

    /// Fetches the current provider status.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoInstance`] without an instance and
    /// [`DriverError::Provider`] when the fetch fails.
    pub async fn fetch_status(&self) -> Result<LinodeStatus, DriverError> {
        let instance_id = self.require_id()?;
        self.api()?
            .get_instance(instance_id)
            .await
            .map(|current| current.status)
            .map_err(|err| DriverError::provider(Stage::GetInstance, err))
    }

    /// Canonical lifecycle state, always fetched from the API.
    /// Any failure to fetch yields [`MachineState::Error`].
    pub async fn state(&self) -> MachineState {
        let fetched = self.fetch_status().await;
        if let Err(err) = &fetched {
            warn!(error = %err, "failed to fetch instance status");
        }
        MachineState::from_fetch(&fetched)
    }

    /// Public IPv4 address.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoAddress`] when no instance is recorded.
    pub fn ip(&self) -> Result<Ipv4Addr, DriverError> {
        self.instance
            .as_ref()
            .map(|instance| instance.public_ip)
            .ok_or(DriverError::NoAddress)
    }

    /// Private IPv4 address, when one was assigned.
    #[must_use]
    pub fn private_ip(&self) -> Option<Ipv4Addr> {
        self.instance.as_ref().and_then(|instance| instance.private_ip)
    }

    /// Host name used for SSH, which is the public address.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoAddress`] when no instance is recorded.
    pub fn ssh_hostname(&self) -> Result<String, DriverError> {
        self.ip().map(|ip| ip.to_string())
    }

    /// Service URL in the form `tcp://<address>:<port>`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NoAddress`] when no instance is recorded.
    pub fn url(&self) -> Result<String, DriverError> {
        self.ip()
            .map(|ip| format!("tcp://{ip}:{}", self.config.docker_port))
    }

    /// SSH port.
    #[must_use]
    pub const fn ssh_port(&self) -> u16 {
        self.config.ssh_port
    }

    /// SSH login user.
    #[must_use]
    pub fn ssh_username(&self) -> &str {
        &self.config.ssh_user
    }
}
