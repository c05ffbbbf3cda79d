//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `flyway_migration_reconciliations_total` - Total number of reconciliations
//! - `flyway_migration_reconciliation_errors_total` - Reconciliation errors by reason
//! - `flyway_migration_reconciliation_duration_seconds` - Duration of reconciliations
//! - `flyway_migration_observed_states_total` - Observed states by state
//! - `flyway_migration_actions_total` - Actions chosen by action
//! - `flyway_migration_requeues_total` - Requeues by reason
//! - `flyway_migration_jobs_created_total` - Migration Jobs created
//! - `flyway_migration_jobs_deleted_total` - Migration Jobs deleted

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flyway_migration_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flyway_migration_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "flyway_migration_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static OBSERVED_STATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flyway_migration_observed_states_total",
            "Observed migration states",
        ),
        &["state"],
    )
    .expect("Failed to create OBSERVED_STATES_TOTAL metric - this should never happen")
});

static ACTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "flyway_migration_actions_total",
            "Actions chosen by the reconciler",
        ),
        &["action"],
    )
    .expect("Failed to create ACTIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("flyway_migration_requeues_total", "Requeues by reason"),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static JOBS_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flyway_migration_jobs_created_total",
        "Total number of migration Jobs created",
    )
    .expect("Failed to create JOBS_CREATED_TOTAL metric - this should never happen")
});

static JOBS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "flyway_migration_jobs_deleted_total",
        "Total number of migration Jobs deleted for replacement",
    )
    .expect("Failed to create JOBS_DELETED_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBSERVED_STATES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ACTIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(JOBS_DELETED_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(reason: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_observed_state(state: &str) {
    OBSERVED_STATES_TOTAL.with_label_values(&[state]).inc();
}

pub fn increment_actions(action: &str) {
    ACTIONS_TOTAL.with_label_values(&[action]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

pub fn increment_jobs_created() {
    JOBS_CREATED_TOTAL.inc();
}

pub fn increment_jobs_deleted() {
    JOBS_DELETED_TOTAL.inc();
}
