//! # Canonical Extraction
//!
//! Maps a provider type and a raw payload to the canonical payload: exactly
//! the fields that matter for that provider, keyed in ascending order.

use super::legacy::{assemble_service_principal, parse_metadata, render_value};
use super::provider::{ExtractionRule, ProviderType};
use super::Payload;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use thiserror::Error;

/// Canonical output key for Azure
pub const AZURE_SERVICE_PRINCIPAL_KEY: &str = "osServicePrincipal.json";

/// Canonical output key for oVirt
pub const OVIRT_CONFIG_KEY: &str = "ovirt-config.yaml";

/// Source keys for the oVirt config, in template order
pub const OVIRT_SOURCE_KEYS: [&str; 4] = [
    "ovirt_url",
    "ovirt_username",
    "ovirt_password",
    "ovirt_ca_bundle",
];

/// Extraction failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("provider type '{0}' is not supported")]
    UnsupportedProviderType(String),

    #[error("{provider} credential is missing required key '{key}'")]
    MissingCredentialData {
        provider: ProviderType,
        key: String,
    },

    #[error("failed to extract {provider} credential: {message}")]
    ExtractionFailure {
        provider: ProviderType,
        message: String,
    },
}

/// Provider-specific subset of a credential payload
///
/// Backed by a `BTreeMap`, so iteration and serialization are always in
/// ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPayload(Payload);

impl CanonicalPayload {
    /// Value for `key`
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(|v| v.0.as_slice())
    }

    /// Field names in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as a secret payload
    pub fn as_data(&self) -> &Payload {
        &self.0
    }

    /// Convert into a secret payload
    pub fn into_data(self) -> Payload {
        self.0
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for CanonicalPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), ByteString(v.into())))
                .collect(),
        )
    }
}

/// Extract the canonical payload for a provider
///
/// `legacy_hash_key` is the in-payload hash key stripped from pass-through
/// payloads. The input is never modified.
///
/// # Errors
///
/// `MissingCredentialData` when a required source key is absent,
/// `ExtractionFailure` when a source value cannot be interpreted.
pub fn extract_canonical(
    provider: ProviderType,
    payload: &Payload,
    legacy_hash_key: &str,
) -> Result<CanonicalPayload, ExtractError> {
    match provider.rule() {
        ExtractionRule::PassThrough => pass_through(provider, payload, legacy_hash_key),
        ExtractionRule::Fields(keys) => select_fields(provider, payload, keys),
        ExtractionRule::AzureServicePrincipal => azure_service_principal(provider, payload),
        ExtractionRule::OvirtConfig => ovirt_config(provider, payload),
    }
}

/// Extract using the raw provider type label value
///
/// # Errors
///
/// `UnsupportedProviderType` for a missing or unrecognized tag, otherwise as
/// [`extract_canonical`].
pub fn extract_for_tag(
    tag: Option<&str>,
    payload: &Payload,
    legacy_hash_key: &str,
) -> Result<(ProviderType, CanonicalPayload), ExtractError> {
    let provider: ProviderType = tag.unwrap_or_default().parse()?;
    let canonical = extract_canonical(provider, payload, legacy_hash_key)?;
    Ok((provider, canonical))
}

fn pass_through(
    provider: ProviderType,
    payload: &Payload,
    legacy_hash_key: &str,
) -> Result<CanonicalPayload, ExtractError> {
    let data: Payload = payload
        .iter()
        .filter(|(key, _)| key.as_str() != legacy_hash_key)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if data.is_empty() {
        return Err(ExtractError::MissingCredentialData {
            provider,
            key: "*".to_string(),
        });
    }
    Ok(CanonicalPayload(data))
}

fn select_fields(
    provider: ProviderType,
    payload: &Payload,
    keys: &[&str],
) -> Result<CanonicalPayload, ExtractError> {
    let mut data = BTreeMap::new();
    for key in keys {
        let value = required(provider, payload, key)?;
        data.insert((*key).to_string(), value.clone());
    }
    Ok(CanonicalPayload(data))
}

fn azure_service_principal(
    provider: ProviderType,
    payload: &Payload,
) -> Result<CanonicalPayload, ExtractError> {
    if let Some(document) = payload.get(AZURE_SERVICE_PRINCIPAL_KEY) {
        return Ok(CanonicalPayload(BTreeMap::from([(
            AZURE_SERVICE_PRINCIPAL_KEY.to_string(),
            document.clone(),
        )])));
    }

    // Legacy format: discrete fields in the metadata blob or at the top level
    let metadata = parse_metadata(payload).map_err(|e| ExtractError::ExtractionFailure {
        provider,
        message: format!("metadata is not a YAML mapping: {e}"),
    })?;
    let document = assemble_service_principal(|field| {
        metadata
            .as_ref()
            .and_then(|m| m.get(field))
            .map(render_value)
            .or_else(|| {
                payload
                    .get(field)
                    .map(|v| String::from_utf8_lossy(&v.0).into_owned())
            })
    })
    .map_err(|field| ExtractError::MissingCredentialData {
        provider,
        key: field.to_string(),
    })?;

    Ok(CanonicalPayload(BTreeMap::from([(
        AZURE_SERVICE_PRINCIPAL_KEY.to_string(),
        ByteString(document.into_bytes()),
    )])))
}

fn ovirt_config(
    provider: ProviderType,
    payload: &Payload,
) -> Result<CanonicalPayload, ExtractError> {
    let mut values = Vec::with_capacity(OVIRT_SOURCE_KEYS.len());
    for key in OVIRT_SOURCE_KEYS {
        let raw = required(provider, payload, key)?;
        let text = std::str::from_utf8(&raw.0).map_err(|e| ExtractError::ExtractionFailure {
            provider,
            message: format!("'{key}' is not valid UTF-8: {e}"),
        })?;
        values.push(text);
    }

    let config = render_ovirt_config(values[0], values[1], values[2], values[3]);
    Ok(CanonicalPayload(BTreeMap::from([(
        OVIRT_CONFIG_KEY.to_string(),
        ByteString(config.into_bytes()),
    )])))
}

/// Render the oVirt config document
///
/// The CA bundle sits in a YAML literal block, so every continuation line is
/// indented by two spaces.
pub fn render_ovirt_config(
    url: &str,
    username: &str,
    password: &str,
    ca_bundle: &str,
) -> String {
    format!(
        concat!(
            "ovirt_url: {url}\n",
            "ovirt_username: {username}\n",
            "ovirt_password: {password}\n",
            "ovirt_ca_bundle: |+\n  {ca}",
        ),
        url = url,
        username = username,
        password = password,
        ca = indent(2, ca_bundle),
    )
}

fn indent(width: usize, text: &str) -> String {
    text.replace('\n', &format!("\n{}", " ".repeat(width)))
}

fn required<'a>(
    provider: ProviderType,
    payload: &'a Payload,
    key: &str,
) -> Result<&'a ByteString, ExtractError> {
    payload
        .get(key)
        .ok_or_else(|| ExtractError::MissingCredentialData {
            provider,
            key: key.to_string(),
        })
}
