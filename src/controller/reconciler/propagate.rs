//! # Propagation
//!
//! Fans a changed credential out to the copies linked to it. A copy is only
//! overwritten when its current payload still hashes to the last trusted
//! fingerprint of the upstream secret.

use crate::controller::reconciler::types::{PropagationReport, ReconcileError, Reconciler};
use crate::credential::{fingerprint_data, matches, CanonicalPayload, Fingerprint, Payload};
use crate::observability;
use crate::store::ObjectKey;
use tracing::{debug, error, info, warn};

/// Push `canonical` to every copy of `upstream` whose payload matches `trusted`
///
/// # Errors
///
/// Only a failed listing is returned. Write failures are recorded in the report.
pub async fn propagate(
    reconciler: &Reconciler,
    upstream: &ObjectKey,
    trusted: &Fingerprint,
    canonical: &CanonicalPayload,
) -> Result<PropagationReport, ReconcileError> {
    let selector = reconciler
        .config
        .link_selector(&upstream.namespace, &upstream.name);

    let children = reconciler
        .store
        .list(&selector)
        .await
        .map_err(|source| ReconcileError::StoreReadFailure {
            target: format!("copies of {upstream}"),
            source,
        })?;

    if children.is_empty() {
        info!("No copies linked to {}", upstream);
    } else {
        info!("Found {} copies linked to {}", children.len(), upstream);
    }

    let empty = Payload::new();
    let mut report = PropagationReport::default();

    for child in children {
        let Some(child_key) = ObjectKey::from_secret(&child) else {
            warn!("Skipping linked copy without a namespace or name");
            continue;
        };
        if child_key == *upstream {
            debug!("Upstream secret carries its own link labels, ignoring it as a copy");
            continue;
        }

        let data = child.data.as_ref().unwrap_or(&empty);
        if !matches(trusted, data) {
            warn!(
                child.namespace = %child_key.namespace,
                child.name = %child_key.name,
                child.fingerprint = %fingerprint_data(data),
                trusted = %trusted,
                "Copy does not match the last trusted fingerprint, leaving it untouched"
            );
            report.skipped.push(child_key);
            continue;
        }

        let mut updated = child;
        updated.data = Some(canonical.as_data().clone());
        updated.string_data = None;

        match reconciler.store.replace(&updated).await {
            Ok(()) => {
                info!(
                    child.namespace = %child_key.namespace,
                    child.name = %child_key.name,
                    "Updated copy"
                );
                report.updated.push(child_key);
            }
            Err(source) => {
                error!(
                    child.namespace = %child_key.namespace,
                    child.name = %child_key.name,
                    error = %source,
                    "Failed to update copy"
                );
                report.failed.push(ReconcileError::StoreWriteFailure {
                    key: child_key,
                    source,
                });
            }
        }
    }

    observability::metrics::increment_children("updated", report.updated.len());
    observability::metrics::increment_children("skipped", report.skipped.len());
    observability::metrics::increment_children("failed", report.failed.len());

    Ok(report)
}
