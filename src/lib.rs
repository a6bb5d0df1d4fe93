//! # Provider Credential Controller
//!
//! Keeps copies of provider credential secrets in step with the secret they
//! were copied from.
//!
//! ## Overview
//!
//! 1. **Extraction** - reduce a credential secret to the fields that matter for its
//!    provider type
//! 2. **Fingerprinting** - SHA-256 over the canonical payload, stored as an annotation
//!    on the source
//! 3. **Propagation** - on change, push the new payload to every copy that still
//!    matches the old fingerprint
//! 4. **Tamper check** - copies edited by hand no longer match and are left alone
//!
//! Copies name their source with two labels; the controller never creates
//! copies or links, it only follows them.

pub mod config;
pub mod constants;
pub mod controller;
pub mod credential;
pub mod observability;
pub mod runtime;
pub mod store;
