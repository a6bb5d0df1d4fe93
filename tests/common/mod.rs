//! # Test Support
//!
//! In-memory [`CredentialStore`] with write recording and failure injection.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use provider_credential_controller::config::ControllerConfig;
use provider_credential_controller::controller::reconciler::Reconciler;
use provider_credential_controller::store::{
    selector_matches, CredentialStore, ObjectKey, StoreError,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// A store write, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Replace(ObjectKey),
    PatchAnnotation(ObjectKey, String, String),
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<ObjectKey, Secret>,
    writes: Vec<Write>,
    fail_replace: BTreeSet<ObjectKey>,
    fail_patch: bool,
    fail_list: bool,
    fail_get: bool,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, secret: Secret) {
        let key = ObjectKey::from_secret(&secret).unwrap();
        self.inner.lock().unwrap().objects.insert(key, secret);
    }

    pub fn object(&self, key: &ObjectKey) -> Option<Secret> {
        self.inner.lock().unwrap().objects.get(key).cloned()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.inner.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.inner.lock().unwrap().writes.clear();
    }

    pub fn fail_replace_of(&self, key: ObjectKey) {
        self.inner.lock().unwrap().fail_replace.insert(key);
    }

    pub fn fail_patches(&self) {
        self.inner.lock().unwrap().fail_patch = true;
    }

    pub fn fail_lists(&self) {
        self.inner.lock().unwrap().fail_list = true;
    }

    pub fn fail_gets(&self) {
        self.inner.lock().unwrap().fail_get = true;
    }

    pub fn clear_faults(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_replace.clear();
        inner.fail_patch = false;
        inner.fail_list = false;
        inner.fail_get = false;
    }

    /// Payload of an object as UTF-8 strings
    pub fn data(&self, key: &ObjectKey) -> BTreeMap<String, String> {
        self.object(key)
            .and_then(|s| s.data)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8(v.0).unwrap()))
            .collect()
    }

    pub fn annotation(&self, key: &ObjectKey, annotation: &str) -> Option<String> {
        self.object(key)?
            .metadata
            .annotations?
            .get(annotation)
            .cloned()
    }

    pub fn update_data(&self, key: &ObjectKey, pairs: &[(&str, &str)]) {
        let mut inner = self.inner.lock().unwrap();
        let secret = inner.objects.get_mut(key).unwrap();
        secret.data = Some(payload(pairs));
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_get {
            return Err(StoreError::Backend("injected get failure".to_string()));
        }
        Ok(inner.objects.get(key).cloned())
    }

    async fn list(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Secret>, StoreError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_list {
            return Err(StoreError::Backend("injected list failure".to_string()));
        }
        Ok(inner
            .objects
            .values()
            .filter(|s| selector_matches(selector, s.metadata.labels.as_ref()))
            .cloned()
            .collect())
    }

    async fn replace(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = ObjectKey::from_secret(secret).unwrap();
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_replace.contains(&key) {
            return Err(StoreError::Conflict(key));
        }
        inner.writes.push(Write::Replace(key.clone()));
        inner.objects.insert(key, secret.clone());
        Ok(())
    }

    async fn patch_annotation(
        &self,
        key: &ObjectKey,
        annotation: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_patch {
            return Err(StoreError::Backend("injected patch failure".to_string()));
        }
        let secret = inner
            .objects
            .get_mut(key)
            .ok_or_else(|| StoreError::Backend(format!("{key} not found")))?;
        secret
            .metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(annotation.to_string(), value.to_string());
        inner.writes.push(Write::PatchAnnotation(
            key.clone(),
            annotation.to_string(),
            value.to_string(),
        ));
        Ok(())
    }
}

pub fn payload(pairs: &[(&str, &str)]) -> BTreeMap<String, ByteString> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
        .collect()
}

/// Upstream credential secret tagged with `provider`
pub fn upstream(namespace: &str, name: &str, provider: &str, pairs: &[(&str, &str)]) -> Secret {
    let config = ControllerConfig::default();
    Secret {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([
                (config.provider_type_label, provider.to_string()),
                (config.credentials_label, String::new()),
            ])),
            ..Default::default()
        },
        data: Some(payload(pairs)),
        ..Default::default()
    }
}

/// Copy of `source` living in `namespace/name`
pub fn copy_of(source: &ObjectKey, namespace: &str, name: &str, pairs: &[(&str, &str)]) -> Secret {
    let config = ControllerConfig::default();
    Secret {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            labels: Some(config.link_selector(&source.namespace, &source.name)),
            ..Default::default()
        },
        data: Some(payload(pairs)),
        ..Default::default()
    }
}

pub fn reconciler(store: &MemoryStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()), ControllerConfig::default())
}
