//! Driver-level error type.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::address::AddressClass;
use crate::config::ConfigError;
use crate::keys::KeyError;
use crate::linode::{ApiError, InstanceId};

/// Remote operation during which a provider error surfaced.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Building the API client.
    Connect,
    /// Resolving a StackScript by identifier.
    GetStackScript,
    /// Resolving a StackScript by owner and label.
    ListStackScripts,
    /// Submitting the create request.
    CreateInstance,
    /// Fetching the instance.
    GetInstance,
    /// Listing boot configurations.
    ListConfigs,
    /// Persisting a boot configuration change.
    UpdateConfig,
    /// Booting the instance.
    Boot,
    /// Shutting the instance down.
    Shutdown,
    /// Rebooting the instance.
    Reboot,
    /// Deleting the instance.
    Delete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect to API",
            Self::GetStackScript => "fetch StackScript",
            Self::ListStackScripts => "list StackScripts",
            Self::CreateInstance => "create instance",
            Self::GetInstance => "get instance",
            Self::ListConfigs => "list instance configs",
            Self::UpdateConfig => "update instance config",
            Self::Boot => "boot instance",
            Self::Shutdown => "shut down instance",
            Self::Reboot => "reboot instance",
            Self::Delete => "delete instance",
        })
    }
}

/// Errors surfaced by the driver.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum DriverError {
    /// Invalid or missing configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A StackScript or instance does not exist remotely.
    #[error("{resource} not found")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },
    /// The remote API rejected or failed a call.
    #[error("{stage} failed: {source}")]
    Provider {
        /// Operation that failed.
        stage: Stage,
        /// Error reported by the API client, unmodified.
        #[source]
        source: ApiError,
    },
    /// A created instance lacks a required address.
    #[error("instance {instance_id} has no {missing} IPv4 address")]
    Address {
        /// Remote identifier of the instance.
        instance_id: InstanceId,
        /// Address class that was not found.
        missing: AddressClass,
    },
    /// A boot configuration was required but none exists.
    #[error("no boot configuration found for instance {instance_id}")]
    Configuration {
        /// Remote identifier of the instance.
        instance_id: InstanceId,
    },
    /// The instance did not report running before the deadline.
    #[error("instance {instance_id} was not running after {}s", timeout.as_secs())]
    Timeout {
        /// Remote identifier of the instance.
        instance_id: InstanceId,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// Local SSH key material could not be produced.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// No address is known for the instance.
    #[error("IP address is not set")]
    NoAddress,
    /// The operation needs an instance but none was created or attached.
    #[error("no instance has been created or attached")]
    NoInstance,
}

impl DriverError {
    /// Wraps an API error with the stage it occurred in.
    #[must_use]
    pub const fn provider(stage: Stage, source: ApiError) -> Self {
        Self::Provider { stage, source }
    }
}

/// Failed creation, carrying the remote identifier when one was assigned.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("{error}")]
pub struct ProvisionFailure {
    /// Identifier of the partially created instance, for manual cleanup.
    pub instance_id: Option<InstanceId>,
    /// Underlying failure.
    #[source]
    pub error: DriverError,
}

impl ProvisionFailure {
    /// Failure that happened before the remote instance existed.
    #[must_use]
    pub const fn before_create(error: DriverError) -> Self {
        Self {
            instance_id: None,
            error,
        }
    }

    /// Failure that left a remote instance behind.
    #[must_use]
    pub const fn after_create(instance_id: InstanceId, error: DriverError) -> Self {
        Self {
            instance_id: Some(instance_id),
            error,
        }
    }
}
