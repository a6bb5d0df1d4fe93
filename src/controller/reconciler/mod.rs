//! # Reconciler
//!
//! Propagation engine for provider credential secrets.

mod propagate;
mod reconcile;
mod status;
mod types;

pub use propagate::propagate;
pub use reconcile::reconcile;
pub use status::{persist_fingerprint, stored_fingerprint};
pub use types::{PropagationReport, ReconcileError, ReconcileOutcome, Reconciler};
