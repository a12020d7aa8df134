//! Network helper enablement for instances with a private address.

use tracing::debug;

use crate::error::{DriverError, Stage};
use crate::linode::{ComputeApi, ConfigId, InstanceId};

/// Turns on the network helper (and applies `kernel`, when set) on the first
/// boot configuration of `instance_id`, returning that configuration's id.
///
/// # Errors
///
/// Returns [`DriverError::Configuration`] when the instance has no boot
/// configuration and [`DriverError::Provider`] when listing or updating fails.
pub async fn enable_network_helper<A>(
    api: &A,
    instance_id: InstanceId,
    kernel: Option<&str>,
) -> Result<ConfigId, DriverError>
where
    A: ComputeApi + ?Sized,
{
    let configs = api
        .list_instance_configs(instance_id)
        .await
        .map_err(|err| DriverError::provider(Stage::ListConfigs, err))?;
    let first = configs
        .into_iter()
        .next()
        .ok_or(DriverError::Configuration { instance_id })?;

    let mut update = first.update_options();
    if let Some(helpers) = update.helpers.as_mut() {
        helpers.network = true;
    }
    update.kernel = kernel.map(str::to_owned);

    debug!(%instance_id, config_id = %first.id, "enabling network helper");
    api.update_instance_config(instance_id, first.id, &update)
        .await
        .map_err(|err| DriverError::provider(Stage::UpdateConfig, err))?;
    Ok(first.id)
}
