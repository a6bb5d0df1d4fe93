//! # Watch Loop
//!
//! Runs the credential secret controller: a `kube_runtime::Controller` over
//! secrets carrying the credentials label, one reconcile at a time. Failed
//! reconciles are requeued with per-secret Fibonacci backoff until they
//! succeed.

use crate::controller::admission::{admit, AdmissionDecision, ChangeKind};
use crate::controller::backoff::RetryTracker;
use crate::controller::reconciler::{reconcile, ReconcileError, ReconcileOutcome, Reconciler};
use crate::observability;
use crate::runtime::error_policy::{
    handle_reconcile_error, handle_reconciliation_error, handle_watch_stream_error,
};
use crate::store::ObjectKey;
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::controller::{self, Action, Controller};
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state handed to every reconcile
#[derive(Debug)]
pub struct ControllerContext {
    pub reconciler: Arc<Reconciler>,
    pub retries: RetryTracker,
}

impl ControllerContext {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            retries: RetryTracker::default(),
        }
    }
}

/// Kind of change a controller trigger represents
///
/// The controller only triggers on applied objects, so anything not being
/// deleted is reported as an update.
pub fn change_of(secret: &Secret) -> ChangeKind {
    if secret.metadata.deletion_timestamp.is_some() {
        ChangeKind::Deleted
    } else {
        ChangeKind::Updated
    }
}

/// Admit and reconcile a single change
///
/// Returns `None` when the change was not admitted.
pub async fn dispatch(
    reconciler: &Reconciler,
    kind: ChangeKind,
    secret: &Secret,
) -> Option<Result<ReconcileOutcome, ReconcileError>> {
    let key = ObjectKey::from_secret(secret)?;

    let decision = admit(kind, secret, &reconciler.config);
    observability::metrics::increment_admission(decision.as_str());
    if let AdmissionDecision::Reject(reason) = decision {
        debug!("Ignoring {:?} of {}: {}", kind, key, reason.as_str());
        return None;
    }

    let result = reconcile(reconciler, &key).await;
    if let Ok(outcome) = &result {
        debug!("Reconciled {}: {}", key, outcome.as_str());
    }
    Some(result)
}

/// Controller reconcile function
///
/// Errors other than `NotFound` are returned so the error policy requeues
/// the secret.
pub async fn reconcile_secret(
    secret: Arc<Secret>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    let Some(key) = ObjectKey::from_secret(&secret) else {
        return Ok(Action::await_change());
    };

    match dispatch(&ctx.reconciler, change_of(&secret), &secret).await {
        None | Some(Ok(_)) => {
            ctx.retries.reset(&key);
            Ok(Action::await_change())
        }
        Some(Err(e)) if e.is_not_found() => {
            handle_reconcile_error(&key, &e);
            ctx.retries.reset(&key);
            Ok(Action::await_change())
        }
        Some(Err(e)) => Err(e),
    }
}

/// Run the secret controller until its stream ends
pub async fn run_controller(secrets: Api<Secret>, ctx: Arc<ControllerContext>) -> Result<()> {
    let credentials_label = ctx.reconciler.config.credentials_label.clone();
    info!("Watching secrets labelled {}", credentials_label);

    Controller::new(secrets, watcher::Config::default().labels(&credentials_label))
        .with_config(controller::Config::default().concurrency(1))
        .run(reconcile_secret, handle_reconciliation_error, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!("Reconcile finished for {}", object),
                Err(controller::Error::ReconcilerFailed(e, object)) => {
                    debug!("Reconcile of {} failed and was requeued: {}", object, e);
                }
                Err(controller::Error::QueueError(e)) => {
                    handle_watch_stream_error(&e.to_string()).await;
                }
                Err(e) => warn!("Controller error: {}", e),
            }
        })
        .await;

    warn!("Secret controller stream ended");
    Ok(())
}
