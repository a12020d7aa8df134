//! Instance creation.
//!
//! [`Provisioner::provision`] runs the creation sequence once, without
//! retrying any step:
//!
//! 1. fetch the public key to install;
//! 2. build and submit the create request;
//! 3. pick the public address, and the private one when requested;
//! 4. for private networking, enable the network helper on the first boot
//!    configuration and only then boot with it;
//! 5. poll until the instance reports running.
//!
//! Failures after step 2 carry the remote identifier so the caller can clean
//! up by hand. Nothing is rolled back automatically.

mod network;
mod request;
mod wait;

use std::time::Duration;

use tracing::{debug, info};

use crate::address;
use crate::config::{Configuration, DEFAULT_SSH_PORT};
use crate::error::{DriverError, ProvisionFailure, Stage};
use crate::instance::Instance;
use crate::keys::KeySource;
use crate::linode::ComputeApi;

pub use network::enable_network_helper;
pub use request::build_request;
pub use wait::wait_for_running;

/// How long to wait for a new instance to report running.
pub const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(180);
/// Delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Floor applied to the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Creation sequence with its timing parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Provisioner {
    poll_interval: Duration,
    boot_timeout: Duration,
}

impl Default for Provisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Provisioner {
    /// Uses the default poll interval and boot timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            boot_timeout: DEFAULT_BOOT_TIMEOUT,
        }
    }

    /// Overrides the poll interval, raised to [`MIN_POLL_INTERVAL`] if lower.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = if interval.as_nanos() < MIN_POLL_INTERVAL.as_nanos() {
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        self
    }

    /// Overrides the boot timeout.
    #[must_use]
    pub const fn with_boot_timeout(mut self, boot_timeout: Duration) -> Self {
        self.boot_timeout = boot_timeout;
        self
    }

    /// Delay between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Deadline for the instance to report running.
    #[must_use]
    pub const fn boot_timeout(&self) -> Duration {
        self.boot_timeout
    }

    /// Creates an instance for `config` and waits until it runs.
    ///
    /// Not idempotent: each successful call leaves one more remote instance.
    ///
    /// # Errors
    ///
    /// Returns a [`ProvisionFailure`] whose `instance_id` is set whenever the
    /// remote instance was created before the failure.
    pub async fn provision<A, K>(
        &self,
        api: &A,
        keys: &K,
        config: &Configuration,
    ) -> Result<Instance, ProvisionFailure>
    where
        A: ComputeApi + ?Sized,
        K: KeySource + ?Sized,
    {
        let public_key = keys
            .public_key()
            .map_err(|err| ProvisionFailure::before_create(err.into()))?;
        let request = build_request(config, public_key);

        info!(
            label = %request.label,
            region = %request.region,
            instance_type = %request.instance_type,
            image = %request.image,
            "creating instance"
        );
        if config.ssh_port != DEFAULT_SSH_PORT {
            info!(ssh_port = config.ssh_port, "using custom SSH port");
        }

        let created = api.create_instance(&request).await.map_err(|err| {
            ProvisionFailure::before_create(DriverError::provider(Stage::CreateInstance, err))
        })?;
        let instance_id = created.id;
        debug!(
            %instance_id,
            label = %created.label,
            region = %created.region,
            status = %created.status,
            addresses = created.ipv4.len(),
            "created instance"
        );

        let assigned = address::assign(&created.ipv4, config.create_private_ip).map_err(
            |missing| {
                ProvisionFailure::after_create(
                    instance_id,
                    DriverError::Address {
                        instance_id,
                        missing,
                    },
                )
            },
        )?;

        let config_id = if config.create_private_ip {
            let helper_config =
                enable_network_helper(api, instance_id, config.kernel.as_deref())
                    .await
                    .map_err(|err| ProvisionFailure::after_create(instance_id, err))?;
            api.boot_instance(instance_id, Some(helper_config))
                .await
                .map_err(|err| {
                    ProvisionFailure::after_create(
                        instance_id,
                        DriverError::provider(Stage::Boot, err),
                    )
                })?;
            Some(helper_config)
        } else {
            if config.kernel.is_some() {
                debug!(%instance_id, "kernel override ignored: boot configuration left untouched");
            }
            None
        };

        info!(%instance_id, timeout_secs = self.boot_timeout.as_secs(), "waiting for instance to run");
        let running = wait_for_running(api, instance_id, self.poll_interval, self.boot_timeout)
            .await
            .map_err(|err| ProvisionFailure::after_create(instance_id, err))?;

        Ok(Instance {
            id: instance_id,
            label: running.label,
            region: running.region,
            status: running.status,
            public_ip: assigned.public,
            private_ip: assigned.private,
            config_id,
        })
    }
}
