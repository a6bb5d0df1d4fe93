//! # Change Admission
//!
//! Decides whether a change event on a credential secret is worth a reconcile.

use crate::config::ControllerConfig;
use crate::credential::ProviderType;
use k8s_openapi::api::core::v1::Secret;

/// Kind of change observed on a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Why an event was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Deleted,
    MissingProviderType,
    UnrecognizedProviderType,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Deleted => "deleted",
            RejectReason::MissingProviderType => "missing_provider_type",
            RejectReason::UnrecognizedProviderType => "unrecognized_provider_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit(ProviderType),
    Reject(RejectReason),
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admit(_))
    }

    /// Metric label for this decision
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionDecision::Admit(_) => "admitted",
            AdmissionDecision::Reject(reason) => reason.as_str(),
        }
    }
}

/// Admit creates and updates of secrets with a recognized provider type label
pub fn admit(kind: ChangeKind, secret: &Secret, config: &ControllerConfig) -> AdmissionDecision {
    if kind == ChangeKind::Deleted {
        return AdmissionDecision::Reject(RejectReason::Deleted);
    }

    let Some(tag) = secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(&config.provider_type_label))
    else {
        return AdmissionDecision::Reject(RejectReason::MissingProviderType);
    };

    match ProviderType::from_label(tag) {
        Some(provider) => AdmissionDecision::Admit(provider),
        None => AdmissionDecision::Reject(RejectReason::UnrecognizedProviderType),
    }
}
