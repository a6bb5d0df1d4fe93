//! # Fingerprint Annotation
//!
//! Reads and persists the fingerprint annotation on the upstream secret.

use crate::controller::reconciler::types::{ReconcileError, Reconciler};
use crate::credential::Fingerprint;
use crate::store::ObjectKey;
use k8s_openapi::api::core::v1::Secret;
use tracing::{debug, info};

/// Decode the stored fingerprint
///
/// An absent or empty annotation means the secret was never fingerprinted.
pub fn stored_fingerprint(
    secret: &Secret,
    annotation: &str,
    key: &ObjectKey,
) -> Result<Option<Fingerprint>, ReconcileError> {
    let Some(text) = secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotation))
        .filter(|text| !text.trim().is_empty())
    else {
        debug!("No {} annotation on {}", annotation, key);
        return Ok(None);
    };

    Fingerprint::from_base64(text)
        .map(Some)
        .map_err(|source| ReconcileError::CorruptFingerprint {
            key: key.clone(),
            source,
        })
}

/// Record `current` as the trusted fingerprint of the upstream secret
///
/// Only the annotation is patched; the payload is never rewritten here.
pub async fn persist_fingerprint(
    reconciler: &Reconciler,
    key: &ObjectKey,
    current: &Fingerprint,
) -> Result<(), ReconcileError> {
    reconciler
        .store
        .patch_annotation(key, &reconciler.config.fingerprint_annotation, &current.to_base64())
        .await
        .map_err(|source| ReconcileError::UpstreamPersistFailure {
            key: key.clone(),
            source,
        })?;

    info!(fingerprint = %current, "Recorded credential fingerprint");
    Ok(())
}
