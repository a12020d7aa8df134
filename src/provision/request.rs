//! Create-request construction.

use crate::config::Configuration;
use crate::linode::CreateInstanceRequest;

/// Splits a comma separated option, dropping blank entries. Returns `None`
/// when nothing is left so the field is omitted from the request.
pub(crate) fn split_list(raw: &str) -> Option<Vec<String>> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Builds the create request for `config`, installing `public_key` for root.
///
/// Instances that request a private address are created powered off so the
/// network helper can be enabled before their first boot.
#[must_use]
pub fn build_request(config: &Configuration, public_key: String) -> CreateInstanceRequest {
    let stackscript_id = config.stackscript.as_ref().and_then(|script| script.id());
    let stackscript_data = (stackscript_id.is_some() && !config.stackscript_data.is_empty())
        .then(|| config.stackscript_data.clone());

    CreateInstanceRequest {
        region: config.region.clone(),
        instance_type: config.instance_type.clone(),
        label: config.label.clone(),
        root_pass: config.root_password.clone(),
        authorized_keys: vec![public_key],
        authorized_users: split_list(&config.authorized_users),
        image: config.image.clone(),
        swap_size: config.swap_size,
        tags: split_list(&config.tags),
        stackscript_id,
        stackscript_data,
        private_ip: config.create_private_ip,
        booted: !config.create_private_ip,
    }
}
