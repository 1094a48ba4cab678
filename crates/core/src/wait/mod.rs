//! Bounded poll loops over slowly-changing remote state.
//!
//! - `wait_for_status` polls the instance a fixed number of times at a fixed
//!   interval and fails on the first query error.
//! - `wait_for_images` polls job history until a deadline and absorbs per-check
//!   errors.
//!
//! Both loops stop early when their `CancellationToken` fires.

mod images;
mod policy;
mod status;

pub use images::wait_for_images;
pub use policy::*;
pub use status::wait_for_status;

use thiserror::Error;

use crate::compute::InstanceStatus;
use crate::remote::RemoteError;

/// Terminal failures of the status wait.
#[derive(Debug, Clone, Error)]
pub enum WaitError {
    #[error("instance did not reach {target} within {checks} checks")]
    Timeout {
        target: InstanceStatus,
        last_status: Option<InstanceStatus>,
        checks: u32,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("wait cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = WaitError::Timeout {
            target: InstanceStatus::Running,
            last_status: Some(InstanceStatus::Staging),
            checks: 60,
        };
        assert_eq!(err.to_string(), "instance did not reach RUNNING within 60 checks");
    }
}
