//! # Bootstrap
//!
//! Process-level wiring: tracing subscriber, metrics recorder, and an
//! in-memory catalogue built from [`CatalogueConfig`]. Embedders with their
//! own stores call [`FederatedCatalogue::new`] directly instead.

use std::sync::Arc;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use fedcat_audit::{EntityStorageAuditSink, LogRecord};
use fedcat_storage::MemoryStorage;
use fedcat_vc::{GaiaxVerifier, ResolveError, StaticKeyResolver};

use crate::config::{CatalogueConfig, ConfigError, LogFormat};
use crate::entry::{ParticipantEntry, ServiceDescriptionEntry};
use crate::service::FederatedCatalogue;

/// Errors while bringing a catalogue up.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("issuer key for {method} is unusable: {source}")]
    IssuerKey {
        method: String,
        #[source]
        source: ResolveError,
    },

    #[error("tracing subscriber already installed: {0}")]
    Tracing(String),

    #[error("metrics recorder could not be installed: {0}")]
    Metrics(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects events; `info` when unset.
pub fn init_tracing(format: LogFormat) -> Result<(), BootstrapError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };
    installed.map_err(|e| BootstrapError::Tracing(e.to_string()))
}

/// Install the global Prometheus recorder for the catalogue counters.
///
/// The returned handle renders the exposition text; serving it is up to the
/// embedder.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, BootstrapError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| BootstrapError::Metrics(e.to_string()))
}

/// An in-memory catalogue and the handles behind it.
#[derive(Debug, Clone)]
pub struct CatalogueComponents {
    /// The catalogue.
    pub catalogue: FederatedCatalogue,
    /// Key resolver the verifier consults; more keys may be added at runtime.
    pub resolver: Arc<StaticKeyResolver>,
    /// The audit sink, for reading the trail back.
    pub audit: Arc<EntityStorageAuditSink>,
    /// Participant store.
    pub participants: MemoryStorage<ParticipantEntry>,
    /// Service description store.
    pub service_descriptions: MemoryStorage<ServiceDescriptionEntry>,
}

/// Wire a catalogue over in-memory stores with a [`GaiaxVerifier`] trusting
/// `config.trusted_issuers` and resolving `config.issuer_keys`.
pub fn build_catalogue(config: &CatalogueConfig) -> Result<CatalogueComponents, BootstrapError> {
    config.validate()?;

    let resolver = Arc::new(StaticKeyResolver::new());
    for (method, hex) in &config.issuer_keys {
        resolver
            .insert_hex(method.clone(), hex)
            .map_err(|source| BootstrapError::IssuerKey {
                method: method.clone(),
                source,
            })?;
    }
    let verifier = GaiaxVerifier::new(resolver.clone(), config.trusted_issuers.iter().cloned());

    let participants = MemoryStorage::new();
    let service_descriptions = MemoryStorage::new();
    let audit = Arc::new(EntityStorageAuditSink::with_levels(
        Arc::new(MemoryStorage::<LogRecord>::new()),
        config.audit_levels.iter().copied(),
    ));

    let catalogue = FederatedCatalogue::new(
        Arc::new(verifier),
        Arc::new(participants.clone()),
        Arc::new(service_descriptions.clone()),
        audit.clone(),
    )
    .with_page_limits(config.default_page_size, config.max_page_size);

    tracing::info!(
        trusted_issuers = config.trusted_issuers.len(),
        issuer_keys = resolver.len(),
        "federated catalogue ready"
    );
    Ok(CatalogueComponents {
        catalogue,
        resolver,
        audit,
        participants,
        service_descriptions,
    })
}

/// Load configuration from the environment, install tracing (and metrics
/// when enabled), and build the catalogue.
pub fn bootstrap_from_env() -> Result<(CatalogueComponents, Option<PrometheusHandle>), BootstrapError> {
    let config = CatalogueConfig::from_env()?;
    init_tracing(config.log_format)?;
    let metrics = if config.metrics_enabled {
        Some(install_metrics_recorder()?)
    } else {
        None
    };
    tracing::debug!(?config, "loaded catalogue configuration");
    Ok((build_catalogue(&config)?, metrics))
}
