//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Outbound calls to the compute API, the metadata server and the generation service
//! - Poll loops (checks issued, terminal outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vmctl_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vmctl_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Automatic retries of idempotent requests.
pub static EXTERNAL_SERVICE_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vmctl_external_service_retries_total",
            "Retries after 429 or 5xx responses",
        ),
        &["service", "operation"],
    )
    .unwrap()
});

// =============================================================================
// Poll Loop Metrics
// =============================================================================

/// Status checks issued by poll loops.
pub static POLL_CHECKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vmctl_poll_checks_total", "Checks issued by poll loops"),
        &["loop"], // "vm_status", "comfy_result"
    )
    .unwrap()
});

/// Terminal outcomes of poll loops.
pub static POLL_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("vmctl_poll_outcomes_total", "Poll loop outcomes"),
        &["loop", "outcome"], // outcome: "reached", "timeout", "cancelled", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
        Box::new(EXTERNAL_SERVICE_RETRIES.clone()),
        // Poll loops
        Box::new(POLL_CHECKS.clone()),
        Box::new(POLL_OUTCOMES.clone()),
    ]
}
