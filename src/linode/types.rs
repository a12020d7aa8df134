//! Wire types for the Linode API v4.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a Linode instance.
    InstanceId
);
id_newtype!(
    /// Identifier of an instance boot configuration.
    ConfigId
);

/// Status vocabulary reported by the API for an instance.
///
/// Values outside the known set are kept verbatim in [`LinodeStatus::Other`]
/// so they never collapse into a known bucket.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum LinodeStatus {
    /// `running`
    Running,
    /// `offline`
    Offline,
    /// `booting`
    Booting,
    /// `rebooting`
    Rebooting,
    /// `shutting_down`
    ShuttingDown,
    /// `provisioning`
    Provisioning,
    /// `deleting`
    Deleting,
    /// `migrating`
    Migrating,
    /// `rebuilding`
    Rebuilding,
    /// `cloning`
    Cloning,
    /// `restoring`
    Restoring,
    /// Any status string this crate does not recognise.
    Other(String),
}

impl LinodeStatus {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Offline => "offline",
            Self::Booting => "booting",
            Self::Rebooting => "rebooting",
            Self::ShuttingDown => "shutting_down",
            Self::Provisioning => "provisioning",
            Self::Deleting => "deleting",
            Self::Migrating => "migrating",
            Self::Rebuilding => "rebuilding",
            Self::Cloning => "cloning",
            Self::Restoring => "restoring",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for LinodeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => Self::Running,
            "offline" => Self::Offline,
            "booting" => Self::Booting,
            "rebooting" => Self::Rebooting,
            "shutting_down" => Self::ShuttingDown,
            "provisioning" => Self::Provisioning,
            "deleting" => Self::Deleting,
            "migrating" => Self::Migrating,
            "rebuilding" => Self::Rebuilding,
            "cloning" => Self::Cloning,
            "restoring" => Self::Restoring,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for LinodeStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<LinodeStatus> for String {
    fn from(value: LinodeStatus) -> Self {
        match value {
            LinodeStatus::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for LinodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instance as returned by `GET /linode/instances/{id}`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Linode {
    /// Remote identifier.
    pub id: InstanceId,
    /// Label, possibly corrected by the API.
    pub label: String,
    /// Canonical region identifier.
    pub region: String,
    /// Current status.
    pub status: LinodeStatus,
    /// Every IPv4 address attached to the instance, public and private.
    #[serde(default)]
    pub ipv4: Vec<Ipv4Addr>,
}

/// Body for `POST /linode/instances`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreateInstanceRequest {
    /// Target region.
    pub region: String,
    /// Instance type (plan).
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Requested label.
    pub label: String,
    /// Root password for the deployed image.
    pub root_pass: String,
    /// Public keys installed for root.
    pub authorized_keys: Vec<String>,
    /// Linode users whose profile keys are installed for root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_users: Option<Vec<String>>,
    /// Image to deploy.
    pub image: String,
    /// Swap disk size in MB.
    pub swap_size: u32,
    /// Tags applied to the instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// StackScript to run on first boot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stackscript_id: Option<u64>,
    /// User-defined fields passed to the StackScript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stackscript_data: Option<BTreeMap<String, String>>,
    /// Whether to allocate a private IPv4 address.
    pub private_ip: bool,
    /// Whether the instance boots once deployed.
    pub booted: bool,
}

/// Helper toggles on a boot configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "mirrors the API's helper flags one to one"
)]
pub struct ConfigHelpers {
    /// Disables the `updatedb` cron job.
    #[serde(default)]
    pub updatedb_disabled: bool,
    /// Enables distribution-specific helpers.
    #[serde(default)]
    pub distro: bool,
    /// Creates a `modules.dep` file for the kernel.
    #[serde(default)]
    pub modules_dep: bool,
    /// Configures networking inside the guest at boot.
    #[serde(default)]
    pub network: bool,
    /// Automounts `devtmpfs`.
    #[serde(default)]
    pub devtmpfs_automount: bool,
}

/// Boot configuration profile attached to an instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct InstanceConfig {
    /// Configuration identifier.
    pub id: ConfigId,
    /// Configuration label.
    #[serde(default)]
    pub label: String,
    /// Kernel booted by this configuration.
    #[serde(default)]
    pub kernel: String,
    /// Helper toggles.
    #[serde(default)]
    pub helpers: ConfigHelpers,
}

/// Body for `PUT /linode/instances/{id}/configs/{config_id}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct InstanceConfigUpdate {
    /// Replacement helper toggles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helpers: Option<ConfigHelpers>,
    /// Replacement kernel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
}

impl InstanceConfig {
    /// Starts an update that preserves the current helper toggles.
    #[must_use]
    pub fn update_options(&self) -> InstanceConfigUpdate {
        InstanceConfigUpdate {
            helpers: Some(self.helpers.clone()),
            kernel: None,
        }
    }
}

/// StackScript catalog entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Stackscript {
    /// Catalog identifier.
    pub id: u64,
    /// Owning account name.
    pub username: String,
    /// Script label.
    pub label: String,
}

/// `X-Filter` body for the StackScript listing.
///
/// The API does not document `username` as filterable; it is sent anyway and
/// callers re-check ownership on the results.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StackScriptFilter {
    /// Owner to match.
    pub username: String,
    /// Label to match.
    pub label: String,
}

/// Paginated list envelope.
#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// One-based page number.
    #[serde(default)]
    pub page: u32,
    /// Total number of pages.
    #[serde(default)]
    pub pages: u32,
}
