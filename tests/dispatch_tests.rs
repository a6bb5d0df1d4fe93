//! # Watch Dispatch Tests
//!
//! Admission in front of the reconciler: rejected events never touch the store.
//! Failed reconciles are requeued and retried until the copies catch up.

mod common;

use common::{copy_of, reconciler, upstream, MemoryStore, Write};
use kube_runtime::controller::Action;
use provider_credential_controller::constants::DEFAULT_RETRY_MIN_SECS;
use provider_credential_controller::controller::admission::ChangeKind;
use provider_credential_controller::controller::reconciler::{ReconcileError, ReconcileOutcome};
use provider_credential_controller::runtime::error_policy::handle_reconciliation_error;
use provider_credential_controller::runtime::watch_loop::{
    dispatch, reconcile_secret, ControllerContext,
};
use provider_credential_controller::store::ObjectKey;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_admitted_update_is_reconciled() {
    let store = MemoryStore::new();
    let secret = upstream("creds", "gcp", "gcp", &[("osServiceAccount.json", "{}")]);
    store.insert(secret.clone());
    let ctx = reconciler(&store);

    let result = dispatch(&ctx, ChangeKind::Updated, &secret).await;

    assert!(matches!(result, Some(Ok(ReconcileOutcome::FirstSeen { .. }))));
    assert!(matches!(
        store.writes().as_slice(),
        [Write::PatchAnnotation(key, _, _)] if *key == ObjectKey::new("creds", "gcp")
    ));
}

#[tokio::test]
async fn test_delete_is_never_reconciled() {
    let store = MemoryStore::new();
    let secret = upstream("creds", "gcp", "gcp", &[("osServiceAccount.json", "{}")]);
    store.insert(secret.clone());
    let ctx = reconciler(&store);

    assert!(dispatch(&ctx, ChangeKind::Deleted, &secret).await.is_none());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_unrecognized_type_is_never_reconciled() {
    let store = MemoryStore::new();
    let secret = upstream("creds", "bm", "baremetal", &[("username", "u")]);
    store.insert(secret.clone());
    let ctx = reconciler(&store);

    assert!(dispatch(&ctx, ChangeKind::Created, &secret).await.is_none());
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_event_for_deleted_secret_is_not_found() {
    let store = MemoryStore::new();
    let secret = upstream("creds", "gone", "aws", &[]);
    let ctx = reconciler(&store);

    let result = dispatch(&ctx, ChangeKind::Updated, &secret).await;

    assert!(matches!(result, Some(Err(ref e)) if e.is_not_found()));
}

#[tokio::test]
async fn test_failed_reconcile_is_requeued_until_it_succeeds() {
    let store = MemoryStore::new();
    let key = ObjectKey::new("creds", "aws");
    let child = ObjectKey::new("team-a", "aws");
    let original = [("aws_access_key_id", "A"), ("aws_secret_access_key", "B")];
    store.insert(upstream("creds", "aws", "aws", &original));
    store.insert(copy_of(&key, "team-a", "aws", &original));
    let ctx = Arc::new(ControllerContext::new(Arc::new(reconciler(&store))));
    let current = || Arc::new(store.object(&key).unwrap());

    let action = reconcile_secret(current(), Arc::clone(&ctx)).await.unwrap();
    assert_eq!(action, Action::await_change());

    store.update_data(
        &key,
        &[("aws_access_key_id", "A2"), ("aws_secret_access_key", "B")],
    );
    store.fail_lists();

    let err = reconcile_secret(current(), Arc::clone(&ctx))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::StoreReadFailure { .. }));
    assert_eq!(store.data(&child)["aws_access_key_id"], "A");

    let action = handle_reconciliation_error(current(), &err, Arc::clone(&ctx));
    assert_eq!(
        action,
        Action::requeue(Duration::from_secs(DEFAULT_RETRY_MIN_SECS))
    );

    store.clear_faults();
    let action = reconcile_secret(current(), Arc::clone(&ctx)).await.unwrap();
    assert_eq!(action, Action::await_change());
    assert_eq!(store.data(&child)["aws_access_key_id"], "A2");
}

#[tokio::test]
async fn test_missing_secret_is_not_requeued() {
    let store = MemoryStore::new();
    let ctx = Arc::new(ControllerContext::new(Arc::new(reconciler(&store))));
    let gone = Arc::new(upstream("creds", "gone", "aws", &[]));

    let action = reconcile_secret(gone, ctx).await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(store.writes().is_empty());
}
