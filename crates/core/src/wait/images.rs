use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::comfy::{GenerationApi, ImageResult};
use crate::metrics::{POLL_CHECKS, POLL_OUTCOMES};

use super::ResultPolicy;

const LOOP_LABEL: &str = "comfy_result";

/// Poll a job's history until it lists output images or the deadline passes.
///
/// Always checks at least once. Per-check errors are kept as the last error
/// and never abort the loop; running out of time is reported in the result,
/// not as an error.
pub async fn wait_for_images(
    generation: &dyn GenerationApi,
    prompt_id: &str,
    policy: ResultPolicy,
    cancel: &CancellationToken,
) -> ImageResult {
    let deadline = Instant::now() + policy.timeout();
    let mut last_error: Option<String> = None;
    let mut checks: u32 = 0;

    loop {
        checks += 1;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(prompt_id, checks - 1),
            result = generation.history(prompt_id) => result,
        };
        POLL_CHECKS.with_label_values(&[LOOP_LABEL]).inc();

        match result {
            Ok(history) => {
                // First node set with images wins
                let files = history
                    .get(prompt_id)
                    .map(|entry| entry.image_filenames())
                    .unwrap_or_default();
                if !files.is_empty() {
                    info!(prompt_id, checks, files = files.len(), "Job produced images");
                    POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "reached"]).inc();
                    return ImageResult::done(files);
                }
                debug!(prompt_id, checks, "Job not finished");
            }
            Err(e) => {
                debug!(prompt_id, checks, error = %e, "History check failed");
                last_error = Some(e.to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }

        let pause = policy.poll_interval().min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(prompt_id, checks),
            _ = tokio::time::sleep(pause) => {}
        }
    }

    info!(prompt_id, checks, last_error = ?last_error, "Timed out waiting for images");
    POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "timeout"]).inc();
    ImageResult::pending(last_error)
}

fn cancelled(prompt_id: &str, checks: u32) -> ImageResult {
    info!(prompt_id, checks, "Image wait cancelled");
    POLL_OUTCOMES.with_label_values(&[LOOP_LABEL, "cancelled"]).inc();
    ImageResult::pending(Some("cancelled".to_string()))
}
