//! # Reconciler Types
//!
//! Context, outcome and error types shared by the reconcile path.

use crate::config::ControllerConfig;
use crate::credential::{ExtractError, Fingerprint, FingerprintDecodeError, ProviderType};
use crate::store::{CredentialStore, ObjectKey, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Reconciler context: the object store plus the schema keys to use
pub struct Reconciler {
    pub store: Arc<dyn CredentialStore>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn CredentialStore>, config: ControllerConfig) -> Self {
        Self { store, config }
    }
}

/// Reconcile failures
///
/// `StoreWriteFailure` is never returned from a reconcile: it is recorded per
/// copy in [`PropagationReport::failed`].
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("credential secret {0} not found")]
    NotFound(ObjectKey),

    #[error("provider type '{0}' is not supported")]
    UnsupportedProviderType(String),

    #[error("{provider} credential is missing required key '{key}'")]
    MissingCredentialData { provider: ProviderType, key: String },

    #[error("credential secret {key}: stored fingerprint is corrupt: {source}")]
    CorruptFingerprint {
        key: ObjectKey,
        source: FingerprintDecodeError,
    },

    #[error("failed to extract {provider} credential: {message}")]
    ExtractionFailure {
        provider: ProviderType,
        message: String,
    },

    #[error("failed to read {target}: {source}")]
    StoreReadFailure { target: String, source: StoreError },

    #[error("failed to update copy {key}: {source}")]
    StoreWriteFailure { key: ObjectKey, source: StoreError },

    #[error("failed to persist fingerprint on {key}: {source}")]
    UpstreamPersistFailure { key: ObjectKey, source: StoreError },
}

impl From<ExtractError> for ReconcileError {
    fn from(error: ExtractError) -> Self {
        match error {
            ExtractError::UnsupportedProviderType(tag) => Self::UnsupportedProviderType(tag),
            ExtractError::MissingCredentialData { provider, key } => {
                Self::MissingCredentialData { provider, key }
            }
            ExtractError::ExtractionFailure { provider, message } => {
                Self::ExtractionFailure { provider, message }
            }
        }
    }
}

impl ReconcileError {
    /// The upstream object no longer exists; callers treat this as a no-op
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Short reason string for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::UnsupportedProviderType(_) => "unsupported_provider_type",
            Self::MissingCredentialData { .. } => "missing_credential_data",
            Self::CorruptFingerprint { .. } => "corrupt_fingerprint",
            Self::ExtractionFailure { .. } => "extraction_failure",
            Self::StoreReadFailure { .. } => "store_read_failure",
            Self::StoreWriteFailure { .. } => "store_write_failure",
            Self::UpstreamPersistFailure { .. } => "upstream_persist_failure",
        }
    }
}

/// What happened to the linked copies during a propagation pass
#[derive(Debug, Default)]
pub struct PropagationReport {
    /// Copies that matched the trusted fingerprint and received the new payload
    pub updated: Vec<ObjectKey>,
    /// Copies that did not match the trusted fingerprint and were left untouched
    pub skipped: Vec<ObjectKey>,
    /// Copies that matched but could not be written (`StoreWriteFailure`)
    pub failed: Vec<ReconcileError>,
}

impl PropagationReport {
    pub fn visited(&self) -> usize {
        self.updated.len() + self.skipped.len() + self.failed.len()
    }
}

/// Branch taken by a successful reconcile
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Stored fingerprint equals the current one; nothing written
    Unchanged { fingerprint: Fingerprint },
    /// No stored fingerprint; the current one was recorded, copies untouched
    FirstSeen { fingerprint: Fingerprint },
    /// Content changed; copies were visited and the new fingerprint recorded
    Changed {
        previous: Fingerprint,
        current: Fingerprint,
        report: PropagationReport,
    },
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged { .. } => "unchanged",
            Self::FirstSeen { .. } => "first_seen",
            Self::Changed { .. } => "changed",
        }
    }

    /// Fingerprint stored on the upstream object after this reconcile
    pub fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::Unchanged { fingerprint } | Self::FirstSeen { fingerprint } => fingerprint,
            Self::Changed { current, .. } => current,
        }
    }

    pub fn report(&self) -> Option<&PropagationReport> {
        match self {
            Self::Changed { report, .. } => Some(report),
            _ => None,
        }
    }
}
