//! Linode API v4 collaborator.
//!
//! [`ComputeApi`] is the seam the provisioner and lifecycle controller talk
//! to. [`LinodeClient`] implements it over HTTPS with `reqwest`; tests swap in
//! [`crate::test_support::ScriptedApi`].

mod client;
mod error;
mod types;

use std::future::Future;
use std::pin::Pin;

pub use client::{API_BASE, LinodeClient, user_agent};
pub use error::ApiError;
pub use types::{
    ConfigHelpers, ConfigId, CreateInstanceRequest, InstanceConfig, InstanceConfigUpdate,
    InstanceId, Linode, LinodeStatus, Page, StackScriptFilter, Stackscript,
};

/// Future returned by API operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote compute operations consumed by the driver.
pub trait ComputeApi: Send + Sync {
    /// Creates an instance.
    fn create_instance<'a>(&'a self, request: &'a CreateInstanceRequest)
    -> ApiFuture<'a, Linode>;

    /// Fetches an instance.
    fn get_instance(&self, id: InstanceId) -> ApiFuture<'_, Linode>;

    /// Deletes an instance.
    fn delete_instance(&self, id: InstanceId) -> ApiFuture<'_, ()>;

    /// Boots an instance, using its default configuration when `config` is
    /// `None`.
    fn boot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()>;

    /// Requests a graceful shutdown.
    fn shutdown_instance(&self, id: InstanceId) -> ApiFuture<'_, ()>;

    /// Reboots an instance in a single remote operation.
    fn reboot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()>;

    /// Lists the boot configurations of an instance.
    fn list_instance_configs(&self, id: InstanceId) -> ApiFuture<'_, Vec<InstanceConfig>>;

    /// Persists changes to a boot configuration.
    fn update_instance_config<'a>(
        &'a self,
        id: InstanceId,
        config: ConfigId,
        update: &'a InstanceConfigUpdate,
    ) -> ApiFuture<'a, InstanceConfig>;

    /// Lists catalog StackScripts matching the filter.
    fn list_stackscripts<'a>(
        &'a self,
        filter: &'a StackScriptFilter,
    ) -> ApiFuture<'a, Vec<Stackscript>>;

    /// Fetches a StackScript by identifier.
    fn get_stackscript(&self, id: u64) -> ApiFuture<'_, Stackscript>;
}
