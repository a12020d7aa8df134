//! In-memory record of a provisioned instance.

use std::net::Ipv4Addr;

use crate::linode::{ConfigId, InstanceId, LinodeStatus};

/// Instance created or attached by the driver.
///
/// `status` is the value observed when the record was built; state queries
/// always re-fetch it from the API.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    /// Remote identifier.
    pub id: InstanceId,
    /// Label as stored by the API.
    pub label: String,
    /// Canonical region.
    pub region: String,
    /// Last observed provider status.
    pub status: LinodeStatus,
    /// Public IPv4 address.
    pub public_ip: Ipv4Addr,
    /// Private IPv4 address, when one was requested.
    pub private_ip: Option<Ipv4Addr>,
    /// Boot configuration used to start the instance, when one was chosen
    /// explicitly.
    pub config_id: Option<ConfigId>,
}
