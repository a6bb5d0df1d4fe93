//! # Object Store
//!
//! The seam between the propagation engine and wherever credential secrets
//! live. The controller uses [`KubeCredentialStore`]; tests use an in-memory
//! implementation.

mod kubernetes;

pub use kubernetes::KubeCredentialStore;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Object store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Optimistic concurrency conflict (object changed since it was read)
    #[error("conflict writing {0}: object was modified")]
    Conflict(ObjectKey),

    /// Any other backend failure
    #[error("{0}")]
    Backend(String),
}

/// (namespace, name) identity of a credential object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a secret, if it has both a namespace and a name
    pub fn from_secret(secret: &Secret) -> Option<Self> {
        Some(Self::new(
            secret.metadata.namespace.as_deref()?,
            secret.metadata.name.as_deref()?,
        ))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Credential object storage
///
/// Implementations must honour `metadata.resourceVersion` on [`replace`] so a
/// copy modified after it was listed is not overwritten.
///
/// [`replace`]: CredentialStore::replace
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch one object; `Ok(None)` when it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<Secret>, StoreError>;

    /// List objects across all namespaces whose labels equal every entry of `selector`
    async fn list(&self, selector: &BTreeMap<String, String>) -> Result<Vec<Secret>, StoreError>;

    /// Replace a whole object
    async fn replace(&self, secret: &Secret) -> Result<(), StoreError>;

    /// Merge a single annotation into the object's metadata, leaving everything else alone
    async fn patch_annotation(
        &self,
        key: &ObjectKey,
        annotation: &str,
        value: &str,
    ) -> Result<(), StoreError>;
}

/// Render an exact-match selector as `k1=v1,k2=v2`
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether `labels` satisfy an exact-match selector
pub fn selector_matches(
    selector: &BTreeMap<String, String>,
    labels: Option<&BTreeMap<String, String>>,
) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
}
