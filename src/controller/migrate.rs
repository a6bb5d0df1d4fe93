//! # Legacy Migration
//!
//! Converts credential secrets written in the old cloud-connection format to
//! the current one. The old format keeps every credential field inside a YAML
//! mapping under the `metadata` data key and uses different label keys.

use crate::config::ControllerConfig;
use crate::constants::{LEGACY_CLOUD_CONNECTION_LABEL, LEGACY_METADATA_KEY, LEGACY_PROVIDER_LABEL};
use crate::credential::legacy::{
    assemble_service_principal, parse_metadata, render_value, AZURE_SERVICE_PRINCIPAL_FIELDS,
};
use crate::credential::extract::AZURE_SERVICE_PRINCIPAL_KEY;
use crate::credential::{Payload, ProviderType};
use crate::store::{CredentialStore, ObjectKey, StoreError};
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use serde_yaml::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

/// Old metadata key to current payload key
const KEY_RENAMES: [(&str, &str); 7] = [
    ("awsAccessKeyID", "aws_access_key_id"),
    ("awsSecretAccessKeyID", "aws_secret_access_key"),
    ("sshPrivatekey", "ssh-privatekey"),
    ("sshPublickey", "ssh-publickey"),
    ("gcServiceAccountKey", "osServiceAccount.json"),
    ("openstackCloudsYaml", "clouds.yaml"),
    ("openstackCloud", "cloud"),
];

const SSH_KNOWN_HOSTS_KEY: &str = "sshKnownHosts";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MigrationError {
    #[error("no credential information under data key 'metadata'")]
    MissingMetadata,

    #[error("'metadata' is not a YAML mapping: {0}")]
    InvalidMetadata(String),

    #[error("azure credential is missing '{0}'")]
    MissingAzureField(&'static str),
}

/// Result of a migration run
#[derive(Debug, Default)]
pub struct MigrationSummary {
    /// Migrated secrets with the data keys they ended up with
    pub migrated: Vec<(ObjectKey, Vec<String>)>,
    pub failed: Vec<(ObjectKey, String)>,
}

fn renamed(key: &str) -> &str {
    KEY_RENAMES
        .iter()
        .find(|(old, _)| *old == key)
        .map_or(key, |(_, new)| *new)
}

fn render_known_hosts(value: &Value) -> String {
    match value {
        Value::Sequence(hosts) => hosts
            .iter()
            .map(|host| format!("{}\n", render_value(host)))
            .collect(),
        other => render_value(other),
    }
}

/// Convert one legacy secret to the current format
///
/// Pure: the input is left untouched and the converted secret is returned.
///
/// # Errors
///
/// Fails when `metadata` is missing or malformed, or an azure secret lacks a
/// service principal field.
pub fn migrate_secret(
    secret: &Secret,
    config: &ControllerConfig,
) -> Result<Secret, MigrationError> {
    let old_labels = secret.metadata.labels.clone().unwrap_or_default();

    let mut labels: BTreeMap<String, String> = old_labels
        .iter()
        .filter(|(key, _)| {
            key.as_str() != LEGACY_CLOUD_CONNECTION_LABEL && key.as_str() != LEGACY_PROVIDER_LABEL
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let provider_tag = old_labels.get(LEGACY_PROVIDER_LABEL);
    if let Some(tag) = provider_tag {
        labels.insert(config.provider_type_label.clone(), tag.clone());
    }
    labels.insert(config.credentials_label.clone(), String::new());

    let mut data: Payload = secret.data.clone().unwrap_or_default();
    let mut metadata = parse_metadata(&data)
        .map_err(|e| MigrationError::InvalidMetadata(e.to_string()))?
        .ok_or(MigrationError::MissingMetadata)?;

    if provider_tag.and_then(|tag| ProviderType::from_label(tag)) == Some(ProviderType::Azure) {
        let principal =
            assemble_service_principal(|field| metadata.get(field).map(render_value))
                .map_err(MigrationError::MissingAzureField)?;
        for field in AZURE_SERVICE_PRINCIPAL_FIELDS {
            metadata.remove(field);
        }
        data.insert(
            AZURE_SERVICE_PRINCIPAL_KEY.to_string(),
            ByteString(principal.into_bytes()),
        );
    }

    for (key, value) in &metadata {
        let text = if key == SSH_KNOWN_HOSTS_KEY {
            render_known_hosts(value)
        } else {
            render_value(value)
        };
        data.insert(renamed(key).to_string(), ByteString(text.into_bytes()));
    }
    data.remove(LEGACY_METADATA_KEY);

    let mut migrated = secret.clone();
    migrated.metadata.labels = Some(labels);
    migrated.data = Some(data);
    migrated.string_data = None;
    Ok(migrated)
}

/// Migrate every legacy secret in the store
///
/// Per-secret failures are logged and recorded; only a failed listing aborts.
/// With `dry_run` nothing is written.
pub async fn migrate_all(
    store: &dyn CredentialStore,
    config: &ControllerConfig,
    dry_run: bool,
) -> Result<MigrationSummary, StoreError> {
    let selector = BTreeMap::from([(LEGACY_CLOUD_CONNECTION_LABEL.to_string(), String::new())]);
    let secrets = store.list(&selector).await?;
    info!("Found {} legacy credential secrets", secrets.len());

    let mut summary = MigrationSummary::default();
    for secret in secrets {
        let Some(key) = ObjectKey::from_secret(&secret) else {
            continue;
        };

        let migrated = match migrate_secret(&secret, config) {
            Ok(migrated) => migrated,
            Err(e) => {
                error!("Failed to migrate {}: {}", key, e);
                summary.failed.push((key, e.to_string()));
                continue;
            }
        };

        let data_keys: Vec<String> = migrated
            .data
            .as_ref()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default();

        if dry_run {
            info!("Would migrate {}", key);
            summary.migrated.push((key, data_keys));
            continue;
        }

        match store.replace(&migrated).await {
            Ok(()) => {
                info!("Migrated {}", key);
                summary.migrated.push((key, data_keys));
            }
            Err(e) => {
                error!("Failed to write migrated {}: {}", key, e);
                summary.failed.push((key, e.to_string()));
            }
        }
    }

    Ok(summary)
}
