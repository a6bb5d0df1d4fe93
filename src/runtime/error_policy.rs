//! # Error Policy
//!
//! Classification and handling of watch stream errors and failed reconciles.
//! Failed reconciles are requeued with per-secret Fibonacci backoff.

use crate::constants;
use crate::controller::reconciler::ReconcileError;
use crate::runtime::watch_loop::ControllerContext;
use crate::store::ObjectKey;
use k8s_openapi::api::core::v1::Secret;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Kind of watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401: RBAC revoked or token expired
    Unauthorized,
    /// 410: resource version too old, the watcher relists
    Expired,
    /// 429: API server storage reinitializing
    TooManyRequests,
    NotFound,
    Other,
}

/// Classify a watch error from its rendered message
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else if error_string.contains("ObjectNotFound")
        || (error_string.contains("404") && error_string.contains("not found"))
    {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Log a watch stream error and pause where the API server needs time
///
/// The watcher itself backs off and relists; this only adds diagnostics and a
/// fixed delay for failures that will not clear immediately.
pub async fn handle_watch_stream_error(error_string: &str) -> WatchErrorKind {
    let kind = classify_watch_error(error_string);
    let restart_delay = std::time::Duration::from_secs(constants::DEFAULT_WATCH_RESTART_DELAY_SECS);

    match kind {
        WatchErrorKind::Unauthorized => {
            error!("Secret watch authentication failed (401 Unauthorized): {}", error_string);
            error!("Check that the controller ServiceAccount can still list and watch secrets:");
            error!(
                "   kubectl auth can-i watch secrets --all-namespaces \
                 --as=system:serviceaccount:<namespace>:provider-credential-controller"
            );
            warn!(
                "Waiting {}s before resuming the watch",
                restart_delay.as_secs()
            );
            tokio::time::sleep(restart_delay).await;
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), the watch will relist");
        }
        WatchErrorKind::TooManyRequests => {
            warn!("API server storage reinitializing (429), backing off");
        }
        WatchErrorKind::NotFound => {
            warn!("Resource not found (likely deleted), continuing watch");
        }
        WatchErrorKind::Other => {
            error!("Secret watch stream error: {}", error_string);
            tokio::time::sleep(restart_delay).await;
        }
    }

    kind
}

/// Log a failed reconcile
///
/// `NotFound` means the secret was deleted between the event and the read
/// and is not an error.
pub fn handle_reconcile_error(key: &ObjectKey, error: &ReconcileError) {
    if error.is_not_found() {
        info!("Credential secret {} no longer exists, nothing to do", key);
        return;
    }

    error!(
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        reason = error.as_str(),
        "Reconcile failed: {}",
        error
    );
}

/// Controller error policy: log the failure and requeue the secret with backoff
///
/// The backoff grows with consecutive failures of the same secret and resets
/// after its next successful reconcile.
pub fn handle_reconciliation_error(
    secret: Arc<Secret>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = ObjectKey::new(
        secret.metadata.namespace.as_deref().unwrap_or_default(),
        secret.metadata.name.as_deref().unwrap_or_default(),
    );
    handle_reconcile_error(&key, error);
    if error.is_not_found() {
        return Action::await_change();
    }

    let (delay, attempt) = ctx.retries.record_failure(&key);
    let next_retry = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "Retrying {} in {}s at {} (attempt {})",
        key,
        delay.as_secs(),
        next_retry.to_rfc3339(),
        attempt
    );
    Action::requeue(delay)
}
