//! # Controller Metrics
//!
//! Metrics for reconciliations, child propagation and event admission.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec};
use std::sync::LazyLock;

// Reconciliation metrics
static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "provider_credential_reconciliations_total",
            "Total number of reconciliations by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provider_credential_reconciliation_errors_total",
        "Total number of failed reconciliations",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "provider_credential_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

// Propagation metrics
static CHILDREN_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "provider_credential_children_total",
            "Linked copies visited during propagation, by result",
        ),
        &["result"],
    )
    .expect("Failed to create CHILDREN_TOTAL metric - this should never happen")
});

// Admission metrics
static ADMISSION_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "provider_credential_admission_total",
            "Change events seen by the admission filter, by decision",
        ),
        &["decision"],
    )
    .expect("Failed to create ADMISSION_TOTAL metric - this should never happen")
});

/// Register controller metrics with the registry
pub(crate) fn register_controller_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CHILDREN_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ADMISSION_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations(outcome: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_children(result: &str, count: usize) {
    CHILDREN_TOTAL
        .with_label_values(&[result])
        .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

pub fn increment_admission(decision: &str) {
    ADMISSION_TOTAL.with_label_values(&[decision]).inc();
}
