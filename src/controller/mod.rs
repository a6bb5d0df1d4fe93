//! # Controller
//!
//! Admission, reconciliation, migration and the HTTP surface.

pub mod admission;
pub mod backoff;
pub mod migrate;
pub mod reconciler;
pub mod server;
