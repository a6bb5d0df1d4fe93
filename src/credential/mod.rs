//! # Credential Model
//!
//! Provider types, canonical payload extraction and content fingerprints.
//!
//! Everything in this module is pure: no I/O, no shared state. The reconciler
//! composes these pieces with an object store.
//!
//! ## Sub-modules
//!
//! - `provider` - Provider type tag and the extraction rule registry
//! - `extract` - Canonical payload extraction
//! - `fingerprint` - SHA-256 content fingerprints and the tamper check
//! - `legacy` - Helpers for the old single-blob `metadata` format

pub mod extract;
pub mod fingerprint;
pub mod legacy;
pub mod provider;

pub use extract::{extract_canonical, extract_for_tag, CanonicalPayload, ExtractError};
pub use fingerprint::{fingerprint, fingerprint_data, matches, Fingerprint, FingerprintDecodeError};
pub use provider::{ExtractionRule, ProviderType};

use k8s_openapi::ByteString;
use std::collections::BTreeMap;

/// Raw payload of a credential object (`Secret.data`)
pub type Payload = BTreeMap<String, ByteString>;
