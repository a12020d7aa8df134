//! Configuration loading via `ortho-config` and validation into a
//! [`Configuration`].
//!
//! [`DriverOptions`] is the flat option surface handed over by the host
//! orchestrator (or merged from defaults, `linode-machine.toml`, and
//! `LINODE_*` environment variables). [`Configuration::from_options`]
//! validates and normalises it without touching the network or the disk.

use std::collections::BTreeMap;
use std::ffi::OsString;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ortho_config::OrthoConfig;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::label;
use crate::stackscript::StackScriptRef;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east";
/// Instance type used when none is configured.
pub const DEFAULT_INSTANCE_TYPE: &str = "g6-standard-4";
/// Image used when none is configured.
pub const DEFAULT_IMAGE: &str = "linode/ubuntu18.04";
/// SSH port used when none is configured.
pub const DEFAULT_SSH_PORT: u16 = 22;
/// Swap size in MB used when none is configured.
pub const DEFAULT_SWAP_SIZE: u32 = 512;
/// Docker daemon port used when none is configured.
pub const DEFAULT_DOCKER_PORT: u16 = 2376;
/// Login user for ordinary images.
pub const DEFAULT_SSH_USER: &str = "root";

const CONTAINER_LINUX_MARKER: &str = "linode/containerlinux";
const CONTAINER_LINUX_SSH_USER: &str = "core";
const ROOT_PASSWORD_BYTES: usize = 50;

/// Driver options derived from environment variables, configuration files,
/// and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LINODE",
    discovery(
        app_name = "linode-machine",
        env_var = "LINODE_MACHINE_CONFIG_PATH",
        config_file_name = "linode-machine.toml",
        dotfile_name = ".linode-machine.toml",
        project_file_name = "linode-machine.toml"
    )
)]
pub struct DriverOptions {
    /// Linode API token. Required.
    #[ortho_config(default = String::new())]
    pub token: String,
    /// Root password; generated when absent.
    pub root_pass: Option<String>,
    /// Comma separated Linode users whose profile SSH keys get root access.
    pub authorized_users: Option<String>,
    /// Instance label; defaults to the machine name.
    pub label: Option<String>,
    /// Region (location) of the instance.
    #[ortho_config(default = DEFAULT_REGION.to_owned())]
    pub region: String,
    /// Instance type, which determines CPU, memory, and disk.
    #[ortho_config(default = DEFAULT_INSTANCE_TYPE.to_owned())]
    pub instance_type: String,
    /// SSH port of the instance.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub ssh_port: u16,
    /// Login user override.
    pub ssh_user: Option<String>,
    /// Image which determines the OS distribution.
    #[ortho_config(default = DEFAULT_IMAGE.to_owned())]
    pub image: String,
    /// Kernel written into the boot configuration when it is edited.
    pub kernel: Option<String>,
    /// Port of the service reachable on the instance.
    #[ortho_config(default = DEFAULT_DOCKER_PORT)]
    pub docker_port: u16,
    /// Swap size in MB.
    #[ortho_config(default = DEFAULT_SWAP_SIZE)]
    pub swap_size: u32,
    /// StackScript as `<owner>/<label>` or a numeric identifier.
    pub stackscript: Option<String>,
    /// JSON object of StackScript user-defined fields.
    pub stackscript_data: Option<String>,
    /// Whether to allocate a private IPv4 address.
    #[ortho_config(default = false)]
    pub create_private_ip: bool,
    /// `product/version` prepended to the User-Agent.
    pub ua_prefix: Option<String>,
    /// Comma separated tags applied to the instance.
    pub tags: Option<String>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            token: String::new(),
            root_pass: None,
            authorized_users: None,
            label: None,
            region: DEFAULT_REGION.to_owned(),
            instance_type: DEFAULT_INSTANCE_TYPE.to_owned(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_user: None,
            image: DEFAULT_IMAGE.to_owned(),
            kernel: None,
            docker_port: DEFAULT_DOCKER_PORT,
            swap_size: DEFAULT_SWAP_SIZE,
            stackscript: None,
            stackscript_data: None,
            create_private_ip: false,
            ua_prefix: None,
            tags: None,
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl DriverOptions {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to linode-machine.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads options without attempting to parse CLI arguments. Values still
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("linode-machine")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks that required fields are present. Error messages name the
    /// environment variable and configuration key that supply the value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.token,
            &FieldMetadata::new("Linode API token", "LINODE_TOKEN", "token"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region", "LINODE_REGION", "region"),
        )?;
        Self::require_field(
            &self.instance_type,
            &FieldMetadata::new("instance type", "LINODE_INSTANCE_TYPE", "instance_type"),
        )?;
        Self::require_field(
            &self.image,
            &FieldMetadata::new("image", "LINODE_IMAGE", "image"),
        )?;
        Ok(())
    }
}

/// Validated, normalised driver configuration.
///
/// Only `region`, `label`, and a resolved `stackscript` are written after
/// validation, by the driver, once the API has answered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    /// Linode API token.
    pub token: String,
    /// Region; replaced by the canonical region after creation.
    pub region: String,
    /// Instance type.
    pub instance_type: String,
    /// Image.
    pub image: String,
    /// Kernel written into the boot configuration when it is edited.
    pub kernel: Option<String>,
    /// Root password, provided or generated.
    pub root_password: String,
    /// Swap size in MB.
    pub swap_size: u32,
    /// SSH port.
    pub ssh_port: u16,
    /// SSH login user.
    pub ssh_user: String,
    /// StackScript reference, if any.
    pub stackscript: Option<StackScriptRef>,
    /// StackScript user-defined fields.
    pub stackscript_data: BTreeMap<String, String>,
    /// Comma separated authorised users.
    pub authorized_users: String,
    /// Comma separated tags.
    pub tags: String,
    /// Whether to allocate a private IPv4 address.
    pub create_private_ip: bool,
    /// Externally reachable service port.
    pub docker_port: u16,
    /// User-Agent prefix.
    pub user_agent_prefix: Option<String>,
    /// Canonical instance label.
    pub label: String,
}

impl Configuration {
    /// Validates `options` and builds a configuration for the machine called
    /// `host_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the token is empty, the StackScript
    /// reference or parameters are malformed, the label has no usable
    /// characters, or a root password cannot be generated.
    pub fn from_options(options: &DriverOptions, host_name: &str) -> Result<Self, ConfigError> {
        options.validate()?;

        let stackscript = non_empty(options.stackscript.as_deref())
            .map(StackScriptRef::parse)
            .transpose()?;
        // Parameters mean nothing without a script to receive them.
        let raw_data = non_empty(options.stackscript_data.as_deref());
        let stackscript_data = match (&stackscript, raw_data) {
            (Some(_), Some(raw)) => parse_stackscript_data(raw)?,
            _ => BTreeMap::new(),
        };

        let raw_label = non_empty(options.label.as_deref()).unwrap_or(host_name);
        let label = label::canonicalize(raw_label);
        if label.is_empty() {
            return Err(ConfigError::EmptyLabel(raw_label.to_owned()));
        }

        let root_password = match non_empty(options.root_pass.as_deref()) {
            Some(password) => password.to_owned(),
            None => {
                debug!("generating a secure disposable root password");
                generate_root_password()?
            }
        };

        Ok(Self {
            token: options.token.trim().to_owned(),
            region: options.region.trim().to_owned(),
            instance_type: options.instance_type.trim().to_owned(),
            image: options.image.trim().to_owned(),
            kernel: non_empty(options.kernel.as_deref()).map(str::to_owned),
            root_password,
            swap_size: options.swap_size,
            ssh_port: options.ssh_port,
            ssh_user: ssh_user_for(options.ssh_user.as_deref(), &options.image),
            stackscript,
            stackscript_data,
            authorized_users: options.authorized_users.clone().unwrap_or_default(),
            tags: options.tags.clone().unwrap_or_default(),
            create_private_ip: options.create_private_ip,
            docker_port: options.docker_port,
            user_agent_prefix: non_empty(options.ua_prefix.as_deref()).map(str::to_owned),
            label,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|trimmed| !trimmed.is_empty())
}

fn parse_stackscript_data(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    serde_json::from_str(raw).map_err(|err| ConfigError::InvalidStackScriptData(err.to_string()))
}

/// Chooses the SSH login user for `image` unless `explicit` overrides it.
#[must_use]
pub fn ssh_user_for(explicit: Option<&str>, image: &str) -> String {
    if let Some(user) = non_empty(explicit) {
        return user.to_owned();
    }
    if image.contains(CONTAINER_LINUX_MARKER) {
        CONTAINER_LINUX_SSH_USER.to_owned()
    } else {
        DEFAULT_SSH_USER.to_owned()
    }
}

/// Generates a root password from 50 bytes of OS randomness, base64 encoded.
///
/// # Errors
///
/// Returns [`ConfigError::PasswordGeneration`] when the OS RNG fails.
pub fn generate_root_password() -> Result<String, ConfigError> {
    let mut raw = [0_u8; ROOT_PASSWORD_BYTES];
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|err| ConfigError::PasswordGeneration(err.to_string()))?;
    Ok(STANDARD.encode(raw))
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// The StackScript option is neither numeric nor `<owner>/<label>`.
    #[error("malformed StackScript identifier '{0}': use <owner>/<label> or a numeric id")]
    MalformedStackScript(String),
    /// StackScript parameters are not a flat JSON object of strings.
    #[error("invalid StackScript parameters: {0}")]
    InvalidStackScriptData(String),
    /// The label has no characters left after canonicalisation.
    #[error("label '{0}' has no usable characters")]
    EmptyLabel(String),
    /// The OS random number generator failed.
    #[error("failed to generate root password: {0}")]
    PasswordGeneration(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests;
