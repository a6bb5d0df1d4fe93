//! # Provider Types
//!
//! The provider type tag carried on upstream secrets and the registry mapping
//! each type to its extraction rule.

use super::extract::ExtractError;
use std::fmt;
use std::str::FromStr;

/// Provider type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderType {
    Ansible,
    Aws,
    Azure,
    Gcp,
    Vmware,
    Openstack,
    Ovirt,
}

/// How the canonical payload is derived for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// Whole payload, minus the legacy hash key
    PassThrough,
    /// Exactly these keys, all required, copied verbatim
    Fields(&'static [&'static str]),
    /// `osServicePrincipal.json`, assembled from discrete fields for legacy secrets
    AzureServicePrincipal,
    /// `ovirt-config.yaml` rendered from four source keys
    OvirtConfig,
}

impl ProviderType {
    /// Every recognized provider type
    pub const ALL: [ProviderType; 7] = [
        ProviderType::Ansible,
        ProviderType::Aws,
        ProviderType::Azure,
        ProviderType::Gcp,
        ProviderType::Vmware,
        ProviderType::Openstack,
        ProviderType::Ovirt,
    ];

    /// Canonical tag name
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::Ansible => "ansible",
            ProviderType::Aws => "aws",
            ProviderType::Azure => "azure",
            ProviderType::Gcp => "gcp",
            ProviderType::Vmware => "vmware",
            ProviderType::Openstack => "openstack",
            ProviderType::Ovirt => "ovirt",
        }
    }

    /// Short codes written by existing credential producers
    fn aliases(self) -> &'static [&'static str] {
        match self {
            ProviderType::Ansible => &["ans"],
            ProviderType::Azure => &["azr"],
            ProviderType::Vmware => &["vmw"],
            ProviderType::Openstack => &["ost"],
            ProviderType::Ovirt => &["redhatvirtualization"],
            ProviderType::Aws | ProviderType::Gcp => &[],
        }
    }

    /// Extraction rule for this provider
    pub fn rule(self) -> ExtractionRule {
        match self {
            ProviderType::Ansible => ExtractionRule::PassThrough,
            ProviderType::Aws => {
                ExtractionRule::Fields(&["aws_access_key_id", "aws_secret_access_key"])
            }
            ProviderType::Azure => ExtractionRule::AzureServicePrincipal,
            ProviderType::Gcp => ExtractionRule::Fields(&["osServiceAccount.json"]),
            ProviderType::Vmware => ExtractionRule::Fields(&["username", "password"]),
            ProviderType::Openstack => ExtractionRule::Fields(&["cloud", "clouds.yaml"]),
            ProviderType::Ovirt => ExtractionRule::OvirtConfig,
        }
    }

    /// Parse a label value, returning `None` for unrecognized tags
    ///
    /// Matching is exact: no case folding, no whitespace trimming.
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == value || p.aliases().contains(&value))
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| ExtractError::UnsupportedProviderType(s.to_string()))
    }
}
