//! # Constants
//!
//! Default values for label keys, annotation keys and runtime settings.
//! Every value here can be overridden through [`crate::config`].

/// Label carrying the provider type of an upstream credential secret
pub const DEFAULT_PROVIDER_TYPE_LABEL: &str = "cluster.open-cluster-management.io/type";

/// Label on a copy naming the namespace of the secret it was copied from
pub const DEFAULT_COPIED_FROM_NAMESPACE_LABEL: &str =
    "cluster.open-cluster-management.io/copiedFromNamespace";

/// Label on a copy naming the secret it was copied from
pub const DEFAULT_COPIED_FROM_NAME_LABEL: &str =
    "cluster.open-cluster-management.io/copiedFromSecretName";

/// Marker label (empty value) scoping the watch to credential secrets
pub const DEFAULT_CREDENTIALS_LABEL: &str = "cluster.open-cluster-management.io/credentials";

/// Annotation holding the base64 fingerprint of the canonical payload
pub const DEFAULT_FINGERPRINT_ANNOTATION: &str = "credentialHash";

/// Data key used by older controllers to keep the hash inside the payload
pub const DEFAULT_LEGACY_FINGERPRINT_KEY: &str = "credential-hash";

/// Label marking a legacy (pre-migration) cloud connection secret
pub const LEGACY_CLOUD_CONNECTION_LABEL: &str =
    "cluster.open-cluster-management.io/cloudconnection";

/// Provider label used by legacy cloud connection secrets
pub const LEGACY_PROVIDER_LABEL: &str = "cluster.open-cluster-management.io/provider";

/// Data key holding the YAML metadata blob in legacy secrets
pub const LEGACY_METADATA_KEY: &str = "metadata";

/// Field manager name used for patches
pub const FIELD_MANAGER: &str = "provider-credential-controller";

/// Default HTTP port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Server startup timeout (seconds)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Server readiness poll interval (milliseconds)
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Delay before restarting the watch after an unrecoverable stream error
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "provider_credential_controller=info";

/// Shortest delay before retrying a failed reconcile (seconds)
pub const DEFAULT_RETRY_MIN_SECS: u64 = 5;

/// Longest delay before retrying a failed reconcile (seconds)
pub const DEFAULT_RETRY_MAX_SECS: u64 = 300;
