//! # Reconcile
//!
//! Entry point for a single upstream credential secret:
//!
//! 1. Load the secret (`NotFound` if it is gone)
//! 2. Decode the stored fingerprint
//! 3. Extract the canonical payload and fingerprint it
//! 4. Unchanged: stop. First seen: record the fingerprint. Changed: propagate
//!    to linked copies, then record the fingerprint.
//!
//! The fingerprint is written last, so a reconcile that fails before that
//! point is retried in full on the next event.

use crate::controller::reconciler::propagate::propagate;
use crate::controller::reconciler::status::{persist_fingerprint, stored_fingerprint};
use crate::controller::reconciler::types::{ReconcileError, ReconcileOutcome, Reconciler};
use crate::credential::{extract_for_tag, fingerprint, Payload};
use crate::observability;
use crate::store::ObjectKey;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

/// Reconcile one upstream credential secret
///
/// Records duration and outcome metrics around [`reconcile_internal`].
pub async fn reconcile(
    reconciler: &Reconciler,
    key: &ObjectKey,
) -> Result<ReconcileOutcome, ReconcileError> {
    let start = Instant::now();
    let span = info_span!(
        "reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        provider = tracing::field::Empty,
    );

    let result = reconcile_internal(reconciler, key)
        .instrument(span)
        .await;

    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    match &result {
        Ok(outcome) => observability::metrics::increment_reconciliations(outcome.as_str()),
        Err(e) if e.is_not_found() => {}
        Err(_) => observability::metrics::increment_reconciliation_errors(),
    }

    result
}

async fn reconcile_internal(
    reconciler: &Reconciler,
    key: &ObjectKey,
) -> Result<ReconcileOutcome, ReconcileError> {
    let config = &reconciler.config;

    let secret = reconciler
        .store
        .get(key)
        .await
        .map_err(|source| ReconcileError::StoreReadFailure {
            target: key.to_string(),
            source,
        })?
        .ok_or_else(|| ReconcileError::NotFound(key.clone()))?;

    let stored = stored_fingerprint(&secret, &config.fingerprint_annotation, key)?;

    let tag = secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(&config.provider_type_label))
        .map(String::as_str);
    let empty = Payload::new();
    let payload = secret.data.as_ref().unwrap_or(&empty);

    let (provider, canonical) = extract_for_tag(tag, payload, &config.legacy_fingerprint_key)?;
    tracing::Span::current().record("provider", provider.as_str());

    let current = fingerprint(&canonical);
    debug!(
        stored = ?stored.as_ref().map(ToString::to_string),
        current = %current,
        keys = canonical.len(),
        "Computed credential fingerprint"
    );

    let outcome = match stored {
        None => {
            info!("No stored fingerprint, recording the first one");
            ReconcileOutcome::FirstSeen {
                fingerprint: current,
            }
        }
        Some(previous) if previous == current => {
            debug!("Credential unchanged");
            return Ok(ReconcileOutcome::Unchanged {
                fingerprint: current,
            });
        }
        Some(previous) => {
            info!(
                previous = %previous,
                current = %current,
                "Credential changed, propagating to copies"
            );
            let report = propagate(reconciler, key, &previous, &canonical).await?;
            info!(
                updated = report.updated.len(),
                skipped = report.skipped.len(),
                failed = report.failed.len(),
                "Propagation finished"
            );
            ReconcileOutcome::Changed {
                previous,
                current,
                report,
            }
        }
    };

    persist_fingerprint(reconciler, key, &current).await?;
    Ok(outcome)
}
