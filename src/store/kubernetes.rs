//! # Kubernetes Store
//!
//! [`CredentialStore`] over `core/v1` Secrets.

use super::{selector_string, CredentialStore, ObjectKey, StoreError};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Secret store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeCredentialStore {
    client: Client,
}

impl std::fmt::Debug for KubeCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCredentialStore").finish_non_exhaustive()
    }
}

impl KubeCredentialStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl CredentialStore for KubeCredentialStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError> {
        Ok(self.api(&key.namespace).get_opt(&key.name).await?)
    }

    async fn list(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Secret>, StoreError> {
        let labels = selector_string(selector);
        debug!("Listing secrets with selector: {}", labels);
        // Read straight from the API server, not a cache, so freshly created copies are seen
        let api: Api<Secret> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default().labels(&labels)).await?;
        Ok(list.items)
    }

    async fn replace(&self, secret: &Secret) -> Result<(), StoreError> {
        let key = ObjectKey::from_secret(secret)
            .ok_or_else(|| StoreError::Backend("secret has no namespace or name".to_string()))?;
        match self
            .api(&key.namespace)
            .replace(&key.name, &PostParams::default(), secret)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Err(StoreError::Conflict(key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn patch_annotation(
        &self,
        key: &ObjectKey,
        annotation: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let patch = json!({
            "metadata": {
                "annotations": {
                    annotation: value
                }
            }
        });
        self.api(&key.namespace)
            .patch(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(())
    }
}
