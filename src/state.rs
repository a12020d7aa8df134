//! Canonical lifecycle states and the mapping from Linode statuses.

use std::fmt;

use crate::linode::LinodeStatus;

/// Lifecycle state exposed to the host orchestrator.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MachineState {
    /// Instance is up.
    Running,
    /// Instance is on its way up.
    Starting,
    /// Instance is on its way down.
    Stopping,
    /// Instance is down.
    Stopped,
    /// The provider reported a status with no canonical equivalent.
    Unknown,
    /// The status could not be fetched.
    Error,
}

impl MachineState {
    /// Maps a fetch outcome to a state, turning any failure into
    /// [`MachineState::Error`].
    #[must_use]
    pub fn from_fetch<E>(result: &Result<LinodeStatus, E>) -> Self {
        result.as_ref().map_or(Self::Error, map_status)
    }

    /// Returns the name used in CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Starting => "Starting",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Unknown => "Unknown",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a provider status to its canonical lifecycle state.
#[must_use]
pub const fn map_status(status: &LinodeStatus) -> MachineState {
    match status {
        LinodeStatus::Running => MachineState::Running,
        LinodeStatus::Offline | LinodeStatus::Rebuilding | LinodeStatus::Migrating => {
            MachineState::Stopped
        }
        LinodeStatus::ShuttingDown | LinodeStatus::Deleting => MachineState::Stopping,
        LinodeStatus::Provisioning
        | LinodeStatus::Rebooting
        | LinodeStatus::Booting
        | LinodeStatus::Cloning
        | LinodeStatus::Restoring => MachineState::Starting,
        LinodeStatus::Other(_) => MachineState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{MachineState, map_status};
    use crate::linode::{ApiError, LinodeStatus};

    #[rstest]
    #[case(LinodeStatus::Running, MachineState::Running)]
    #[case(LinodeStatus::Offline, MachineState::Stopped)]
    #[case(LinodeStatus::Rebuilding, MachineState::Stopped)]
    #[case(LinodeStatus::Migrating, MachineState::Stopped)]
    #[case(LinodeStatus::ShuttingDown, MachineState::Stopping)]
    #[case(LinodeStatus::Deleting, MachineState::Stopping)]
    #[case(LinodeStatus::Provisioning, MachineState::Starting)]
    #[case(LinodeStatus::Rebooting, MachineState::Starting)]
    #[case(LinodeStatus::Booting, MachineState::Starting)]
    #[case(LinodeStatus::Cloning, MachineState::Starting)]
    #[case(LinodeStatus::Restoring, MachineState::Starting)]
    #[case(LinodeStatus::from("stopped"), MachineState::Unknown)]
    #[case(LinodeStatus::from("resizing"), MachineState::Unknown)]
    #[case(LinodeStatus::from(""), MachineState::Unknown)]
    fn maps_every_status(#[case] status: LinodeStatus, #[case] expected: MachineState) {
        assert_eq!(map_status(&status), expected);
    }

    #[test]
    fn fetch_failure_is_error_not_unknown() {
        let failed: Result<LinodeStatus, ApiError> = Err(ApiError::Transport {
            message: String::from("timed out"),
        });
        assert_eq!(MachineState::from_fetch(&failed), MachineState::Error);
        assert_ne!(MachineState::from_fetch(&failed), MachineState::Unknown);
    }

    #[test]
    fn fetch_success_uses_status_table() {
        let fetched: Result<LinodeStatus, ApiError> = Ok(LinodeStatus::Booting);
        assert_eq!(MachineState::from_fetch(&fetched), MachineState::Starting);
    }
}
