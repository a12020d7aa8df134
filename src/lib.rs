//! Core library for the `linode-machine` driver.
//!
//! The crate provisions a single Linode instance on behalf of a host
//! orchestrator and manages its lifecycle: options are validated into a
//! [`Configuration`], an optional StackScript is resolved against the
//! catalog, the instance is created with its addresses assigned (enabling the
//! network helper before first boot when a private address is requested),
//! and provider statuses are mapped onto a small canonical state set.

pub mod address;
pub mod config;
pub mod driver;
pub mod error;
pub mod instance;
pub mod keys;
pub mod label;
pub mod linode;
pub mod provision;
pub mod stackscript;
pub mod state;
pub mod test_support;

pub use config::{ConfigError, Configuration, DriverOptions};
pub use driver::LinodeDriver;
pub use error::{DriverError, ProvisionFailure, Stage};
pub use instance::Instance;
pub use keys::{KeyError, KeySource, SshKeygen};
pub use linode::{ApiError, ComputeApi, InstanceId, LinodeClient, LinodeStatus};
pub use provision::Provisioner;
pub use stackscript::{StackScript, StackScriptRef};
pub use state::MachineState;
