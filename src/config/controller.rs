//! # Controller Settings
//!
//! Schema keys (labels and annotations) and watch scope.

use super::env_var_or_default;
use std::collections::BTreeMap;

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Label holding the provider type on upstream secrets
    pub provider_type_label: String,
    /// Link label: namespace of the upstream secret
    pub copied_from_namespace_label: String,
    /// Link label: name of the upstream secret
    pub copied_from_name_label: String,
    /// Marker label selecting credential secrets for the watch
    pub credentials_label: String,
    /// Annotation storing the trusted fingerprint
    pub fingerprint_annotation: String,
    /// Legacy in-payload hash key, stripped before fingerprinting pass-through payloads
    pub legacy_fingerprint_key: String,
    /// Restrict the watch to one namespace (`None` watches all namespaces)
    pub watch_namespace: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            provider_type_label: DEFAULT_PROVIDER_TYPE_LABEL.to_string(),
            copied_from_namespace_label: DEFAULT_COPIED_FROM_NAMESPACE_LABEL.to_string(),
            copied_from_name_label: DEFAULT_COPIED_FROM_NAME_LABEL.to_string(),
            credentials_label: DEFAULT_CREDENTIALS_LABEL.to_string(),
            fingerprint_annotation: DEFAULT_FINGERPRINT_ANNOTATION.to_string(),
            legacy_fingerprint_key: DEFAULT_LEGACY_FINGERPRINT_KEY.to_string(),
            watch_namespace: None,
        }
    }
}

impl ControllerConfig {
    /// Read the schema keys and watch scope from the process environment
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider_type_label: env_var_or_default(
                "PROVIDER_TYPE_LABEL",
                defaults.provider_type_label,
            ),
            copied_from_namespace_label: env_var_or_default(
                "COPIED_FROM_NAMESPACE_LABEL",
                defaults.copied_from_namespace_label,
            ),
            copied_from_name_label: env_var_or_default(
                "COPIED_FROM_NAME_LABEL",
                defaults.copied_from_name_label,
            ),
            credentials_label: env_var_or_default("CREDENTIALS_LABEL", defaults.credentials_label),
            fingerprint_annotation: env_var_or_default(
                "FINGERPRINT_ANNOTATION",
                defaults.fingerprint_annotation,
            ),
            legacy_fingerprint_key: env_var_or_default(
                "LEGACY_FINGERPRINT_KEY",
                defaults.legacy_fingerprint_key,
            ),
            watch_namespace: std::env::var("WATCH_NAMESPACE")
                .ok()
                .filter(|ns| !ns.trim().is_empty()),
        }
    }

    /// Exact-match labels selecting every copy linked to `namespace/name`
    pub fn link_selector(&self, namespace: &str, name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                self.copied_from_namespace_label.clone(),
                namespace.to_string(),
            ),
            (self.copied_from_name_label.clone(), name.to_string()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keys() {
        let config = ControllerConfig::default();
        assert_eq!(
            config.provider_type_label,
            "cluster.open-cluster-management.io/type"
        );
        assert_eq!(config.fingerprint_annotation, "credentialHash");
        assert!(config.watch_namespace.is_none());
    }

    #[test]
    fn test_link_selector() {
        let config = ControllerConfig::default();
        let selector = config.link_selector("creds", "aws-prod");
        assert_eq!(selector.len(), 2);
        assert_eq!(
            selector.get("cluster.open-cluster-management.io/copiedFromNamespace"),
            Some(&"creds".to_string())
        );
        assert_eq!(
            selector.get("cluster.open-cluster-management.io/copiedFromSecretName"),
            Some(&"aws-prod".to_string())
        );
    }
}
