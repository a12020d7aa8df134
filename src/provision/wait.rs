//! Bounded wait for an instance to report running.

use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::error::{DriverError, Stage};
use crate::linode::{ComputeApi, InstanceId, Linode, LinodeStatus};

/// Polls `instance_id` every `poll_interval` until it reports running.
///
/// The whole wait, in-flight requests included, is bounded by `deadline`.
/// Dropping the returned future cancels it without leaving work behind.
///
/// # Errors
///
/// Returns [`DriverError::Timeout`] when the deadline elapses and
/// [`DriverError::Provider`] when a status fetch fails.
pub async fn wait_for_running<A>(
    api: &A,
    instance_id: InstanceId,
    poll_interval: Duration,
    deadline: Duration,
) -> Result<Linode, DriverError>
where
    A: ComputeApi + ?Sized,
{
    let poll = async {
        loop {
            match api.get_instance(instance_id).await {
                Ok(current) if current.status == LinodeStatus::Running => return Ok(current),
                Ok(_) => sleep(poll_interval).await,
                Err(err) => return Err(DriverError::provider(Stage::GetInstance, err)),
            }
        }
    };

    timeout(deadline, poll)
        .await
        .map_err(|_| DriverError::Timeout {
            instance_id,
            timeout: deadline,
        })?
}
