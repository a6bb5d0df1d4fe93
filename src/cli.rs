//! # PCCTL CLI
//!
//! Command-line interface for inspecting and driving the Provider Credential
//! Controller's view of credential secrets.
//!
//! ## Usage
//!
//! ```bash
//! # Show the computed and stored fingerprint of a credential secret
//! pcctl fingerprint --namespace creds --name aws-prod
//!
//! # List the copies linked to a credential secret
//! pcctl children --namespace creds --name aws-prod
//!
//! # Run one reconcile in-process
//! pcctl reconcile --namespace creds --name aws-prod
//!
//! # Convert old cloud-connection secrets to the current format
//! pcctl migrate --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::Client;
use provider_credential_controller::config::ControllerConfig;
use provider_credential_controller::controller::migrate::migrate_all;
use provider_credential_controller::controller::reconciler::{
    reconcile, stored_fingerprint, ReconcileOutcome, Reconciler,
};
use provider_credential_controller::credential::{
    extract_for_tag, fingerprint, fingerprint_data, Payload,
};
use provider_credential_controller::runtime::initialization::{
    init_tracing, install_crypto_provider,
};
use provider_credential_controller::store::{CredentialStore, KubeCredentialStore, ObjectKey};
use serde::Serialize;
use std::sync::Arc;

/// Provider Credential Controller CLI
#[derive(Parser)]
#[command(name = "pcctl")]
#[command(about = "Provider Credential Controller CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the computed and stored fingerprint of a credential secret
    Fingerprint {
        /// Name of the credential secret
        #[arg(long)]
        name: String,

        /// Namespace of the credential secret
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
    /// List the copies linked to a credential secret
    Children {
        /// Name of the credential secret
        #[arg(long)]
        name: String,

        /// Namespace of the credential secret
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
    /// Reconcile a credential secret once, in-process
    Reconcile {
        /// Name of the credential secret
        #[arg(long)]
        name: String,

        /// Namespace of the credential secret
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
    /// Convert legacy cloud-connection secrets to the current format
    Migrate {
        /// Print what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FingerprintReport {
    namespace: String,
    name: String,
    provider: String,
    current: String,
    stored: Option<String>,
    in_sync: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChildReport {
    namespace: String,
    name: String,
    fingerprint: String,
    matches_stored: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_crypto_provider();
    init_tracing("pcctl=info,provider_credential_controller=info");

    let cli = Cli::parse();
    let config = ControllerConfig::from_env();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;
    let store = Arc::new(KubeCredentialStore::new(client));

    match cli.command {
        Commands::Fingerprint { name, namespace } => {
            let key = ObjectKey::new(namespace, name);
            fingerprint_command(store.as_ref(), &config, key, cli.output).await
        }
        Commands::Children { name, namespace } => {
            let key = ObjectKey::new(namespace, name);
            children_command(store.as_ref(), &config, key, cli.output).await
        }
        Commands::Reconcile { name, namespace } => {
            let reconciler = Reconciler::new(store, config);
            reconcile_command(&reconciler, ObjectKey::new(namespace, name)).await
        }
        Commands::Migrate { dry_run } => migrate_command(store.as_ref(), &config, dry_run).await,
    }
}

async fn fetch(
    store: &dyn CredentialStore,
    key: &ObjectKey,
) -> Result<k8s_openapi::api::core::v1::Secret> {
    store
        .get(key)
        .await
        .with_context(|| format!("Failed to get secret '{key}'"))?
        .with_context(|| format!("Secret '{key}' not found"))
}

async fn fingerprint_command(
    store: &dyn CredentialStore,
    config: &ControllerConfig,
    key: ObjectKey,
    output: OutputFormat,
) -> Result<()> {
    let secret = fetch(store, &key).await?;

    let tag = secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(&config.provider_type_label))
        .map(String::as_str);
    let empty = Payload::new();
    let payload = secret.data.as_ref().unwrap_or(&empty);
    let (provider, canonical) = extract_for_tag(tag, payload, &config.legacy_fingerprint_key)
        .with_context(|| format!("Failed to extract credential from '{key}'"))?;
    let current = fingerprint(&canonical);
    let stored = stored_fingerprint(&secret, &config.fingerprint_annotation, &key)?;

    let report = FingerprintReport {
        namespace: key.namespace.clone(),
        name: key.name.clone(),
        provider: provider.to_string(),
        current: current.to_base64(),
        stored: stored.map(|fp| fp.to_base64()),
        in_sync: stored == Some(current),
    };

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Credential secret '{}':\n", key);
    println!("  Provider: {}", report.provider);
    println!("  Canonical keys: {}", canonical.keys().collect::<Vec<_>>().join(", "));
    println!("  Current fingerprint: {}", report.current);
    println!(
        "  Stored fingerprint: {}",
        report.stored.as_deref().unwrap_or("<none>")
    );
    println!("  In sync: {}", report.in_sync);
    Ok(())
}

async fn children_command(
    store: &dyn CredentialStore,
    config: &ControllerConfig,
    key: ObjectKey,
    output: OutputFormat,
) -> Result<()> {
    let secret = fetch(store, &key).await?;
    let stored = stored_fingerprint(&secret, &config.fingerprint_annotation, &key)?;

    let children = store
        .list(&config.link_selector(&key.namespace, &key.name))
        .await
        .with_context(|| format!("Failed to list copies of '{key}'"))?;

    let empty = Payload::new();
    let reports: Vec<ChildReport> = children
        .iter()
        .filter_map(|child| {
            let child_key = ObjectKey::from_secret(child)?;
            if child_key == key {
                return None;
            }
            let fp = fingerprint_data(child.data.as_ref().unwrap_or(&empty));
            Some(ChildReport {
                namespace: child_key.namespace,
                name: child_key.name,
                fingerprint: fp.to_base64(),
                matches_stored: stored.map(|trusted| trusted == fp),
            })
        })
        .collect();

    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No copies linked to '{}'.", key);
        return Ok(());
    }

    println!("\n{:<30} {:<20} {:<46} {:<8}", "NAME", "NAMESPACE", "FINGERPRINT", "MATCHES");
    println!("{}", "-".repeat(106));
    for report in reports {
        let matches = match report.matches_stored {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        println!(
            "{:<30} {:<20} {:<46} {:<8}",
            report.name, report.namespace, report.fingerprint, matches
        );
    }
    Ok(())
}

async fn reconcile_command(reconciler: &Reconciler, key: ObjectKey) -> Result<()> {
    println!("Reconciling credential secret '{}'...", key);

    let outcome = reconcile(reconciler, &key)
        .await
        .with_context(|| format!("Failed to reconcile '{key}'"))?;

    match &outcome {
        ReconcileOutcome::Unchanged { fingerprint } => {
            println!("Unchanged (fingerprint {})", fingerprint);
        }
        ReconcileOutcome::FirstSeen { fingerprint } => {
            println!("Recorded first fingerprint {}", fingerprint);
        }
        ReconcileOutcome::Changed {
            previous,
            current,
            report,
        } => {
            println!("Changed: {} -> {}", previous, current);
            for child in &report.updated {
                println!("  updated  {}", child);
            }
            for child in &report.skipped {
                println!("  skipped  {} (does not match the previous fingerprint)", child);
            }
            for failure in &report.failed {
                println!("  failed   {}", failure);
            }
        }
    }
    println!("Finished at {}", chrono::Utc::now().to_rfc3339());
    Ok(())
}

async fn migrate_command(
    store: &dyn CredentialStore,
    config: &ControllerConfig,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        println!("Dry run: no secrets will be modified");
    }

    let summary = migrate_all(store, config, dry_run)
        .await
        .context("Failed to list legacy credential secrets")?;

    let verb = if dry_run { "Would migrate" } else { "Migrated" };
    for (key, data_keys) in &summary.migrated {
        println!("{verb} {key} (data keys: {})", data_keys.join(", "));
    }
    for (key, reason) in &summary.failed {
        println!("Failed {key}: {reason}");
    }
    println!(
        "\n{} migrated, {} failed",
        summary.migrated.len(),
        summary.failed.len()
    );
    Ok(())
}
