use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compute::{ComputeApi, InstanceRef, InstanceStatus, InstanceSummary, WaitTarget};
use crate::metrics::{POLL_CHECKS, POLL_OUTCOMES};

use super::{WaitError, WaitPolicy};

const LOOP_LABEL: &str = "vm_status";

/// Poll the instance until it reports `target`.
///
/// Issues at most `policy.max_checks()` status queries, sleeping the fixed
/// interval between them. Returns as soon as the target is seen; a failed
/// query aborts the wait.
pub async fn wait_for_status(
    compute: &dyn ComputeApi,
    instance: &InstanceRef,
    target: WaitTarget,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<InstanceSummary, WaitError> {
    let expected = target.status();
    let mut last_status: Option<InstanceStatus> = None;

    for check in 1..=policy.max_checks() {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(instance, check - 1)),
            result = compute.status(instance) => result,
        };
        POLL_CHECKS.with_label_values(&[LOOP_LABEL]).inc();

        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                warn!(instance = %instance, check, error = %e, "Status query failed");
                POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "error"]).inc();
                return Err(WaitError::Remote(e));
            }
        };

        debug!(instance = %instance, check, status = %summary.status, "Checked status");

        if summary.status == expected {
            info!(instance = %instance, checks = check, status = %expected, "Instance reached target status");
            POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "reached"]).inc();
            return Ok(summary);
        }
        last_status = Some(summary.status);

        if check < policy.max_checks() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(instance, check)),
                _ = tokio::time::sleep(policy.interval()) => {}
            }
        }
    }

    warn!(
        instance = %instance,
        target = %expected,
        last_status = ?last_status,
        checks = policy.max_checks(),
        "Timed out waiting for instance status"
    );
    POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "timeout"]).inc();
    Err(WaitError::Timeout {
        target: expected,
        last_status,
        checks: policy.max_checks(),
    })
}

fn cancelled(instance: &InstanceRef, checks: u32) -> WaitError {
    info!(instance = %instance, checks, "Status wait cancelled");
    POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "cancelled"]).inc();
    WaitError::Cancelled
}
