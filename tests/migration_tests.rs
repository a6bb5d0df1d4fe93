//! # Legacy Migration Tests
//!
//! `migrate_all` against an in-memory store.

mod common;

use common::{MemoryStore, Write};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use provider_credential_controller::config::ControllerConfig;
use provider_credential_controller::constants::{
    LEGACY_CLOUD_CONNECTION_LABEL, LEGACY_METADATA_KEY, LEGACY_PROVIDER_LABEL,
};
use provider_credential_controller::controller::migrate::migrate_all;
use provider_credential_controller::store::ObjectKey;
use std::collections::BTreeMap;

fn legacy(name: &str, provider: &str, metadata: Option<&str>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            namespace: Some("creds".to_string()),
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (LEGACY_CLOUD_CONNECTION_LABEL.to_string(), String::new()),
                (LEGACY_PROVIDER_LABEL.to_string(), provider.to_string()),
            ])),
            ..Default::default()
        },
        data: metadata.map(|m| {
            BTreeMap::from([(
                LEGACY_METADATA_KEY.to_string(),
                ByteString(m.as_bytes().to_vec()),
            )])
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_migrate_all_converts_and_continues_past_failures() {
    let store = MemoryStore::new();
    store.insert(legacy(
        "aws",
        "aws",
        Some("awsAccessKeyID: A\nawsSecretAccessKeyID: B\n"),
    ));
    store.insert(legacy("broken", "aws", None));
    store.insert(legacy(
        "openstack",
        "ost",
        Some("openstackCloud: c\nopenstackCloudsYaml: y\n"),
    ));
    let config = ControllerConfig::default();

    let summary = migrate_all(&store, &config, false).await.unwrap();

    assert_eq!(summary.migrated.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, ObjectKey::new("creds", "broken"));

    let aws = store.data(&ObjectKey::new("creds", "aws"));
    assert_eq!(aws["aws_access_key_id"], "A");
    assert!(!aws.contains_key(LEGACY_METADATA_KEY));

    let openstack = ObjectKey::new("creds", "openstack");
    assert_eq!(store.data(&openstack)["cloud"], "c");
    assert_eq!(store.data(&openstack)["clouds.yaml"], "y");
    let labels = store.object(&openstack).unwrap().metadata.labels.unwrap();
    assert_eq!(labels[&config.provider_type_label], "ost");
    assert!(!labels.contains_key(LEGACY_CLOUD_CONNECTION_LABEL));
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = MemoryStore::new();
    store.insert(legacy("aws", "aws", Some("awsAccessKeyID: A\n")));
    let config = ControllerConfig::default();

    let summary = migrate_all(&store, &config, true).await.unwrap();

    assert_eq!(summary.migrated.len(), 1);
    assert_eq!(
        summary.migrated[0].1,
        vec!["aws_access_key_id".to_string()]
    );
    assert!(store.writes().is_empty());
    assert!(store
        .data(&ObjectKey::new("creds", "aws"))
        .contains_key(LEGACY_METADATA_KEY));
}

#[tokio::test]
async fn test_migrated_secrets_are_not_listed_again() {
    let store = MemoryStore::new();
    store.insert(legacy("aws", "aws", Some("awsAccessKeyID: A\n")));
    let config = ControllerConfig::default();

    migrate_all(&store, &config, false).await.unwrap();
    assert_eq!(
        store.writes(),
        vec![Write::Replace(ObjectKey::new("creds", "aws"))]
    );

    let second = migrate_all(&store, &config, false).await.unwrap();
    assert!(second.migrated.is_empty());
    assert!(second.failed.is_empty());
}
