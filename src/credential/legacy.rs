//! # Legacy Format Helpers
//!
//! Older credential secrets stored their material as a YAML mapping under the
//! `metadata` data key. These helpers read that blob and build the Azure
//! service principal document from its discrete fields.

use super::Payload;
use crate::constants::LEGACY_METADATA_KEY;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Fields that make up `osServicePrincipal.json`, in document order
pub const AZURE_SERVICE_PRINCIPAL_FIELDS: [&str; 4] =
    ["clientId", "clientSecret", "tenantId", "subscriptionId"];

/// Parsed legacy metadata blob
pub type LegacyMetadata = BTreeMap<String, Value>;

/// Parse the `metadata` blob, if the payload has a non-empty one
///
/// # Errors
///
/// Returns the YAML error when the blob is not a mapping.
pub fn parse_metadata(payload: &Payload) -> Result<Option<LegacyMetadata>, serde_yaml::Error> {
    match payload.get(LEGACY_METADATA_KEY) {
        Some(blob) if !blob.0.is_empty() => serde_yaml::from_slice(&blob.0).map(Some),
        _ => Ok(None),
    }
}

/// Render a metadata value as the plain text stored in the payload
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => render_value(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => serde_yaml::to_string(value)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Build `osServicePrincipal.json` from its four fields
///
/// `lookup` resolves a field name to its value. Returns the name of the first
/// missing field on failure.
pub fn assemble_service_principal<F>(lookup: F) -> Result<String, &'static str>
where
    F: Fn(&str) -> Option<String>,
{
    let mut parts = Vec::with_capacity(AZURE_SERVICE_PRINCIPAL_FIELDS.len());
    for field in AZURE_SERVICE_PRINCIPAL_FIELDS {
        let value = lookup(field).ok_or(field)?;
        parts.push(format!(
            "\"{field}\": {}",
            serde_json::Value::String(value)
        ));
    }
    Ok(format!("{{{}}}", parts.join(", ")))
}
