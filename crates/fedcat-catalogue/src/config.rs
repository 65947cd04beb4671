//! Catalogue configuration.
//!
//! Every setting has a default so an unconfigured process starts with an
//! empty trust list, all audit levels captured, plain-text logs and no
//! metrics recorder. Override via environment variables or explicit
//! construction.

use std::collections::BTreeMap;

use fedcat_audit::LogLevel;
use fedcat_storage::DEFAULT_PAGE_SIZE;

/// Default upper bound on a query page.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                var: "FEDCAT_LOG_FORMAT".into(),
                value: s.to_string(),
                reason: "expected text or json".into(),
            }),
        }
    }
}

/// Configuration for a catalogue instance.
///
/// Custom `Debug` prints issuer keys by verification method only.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogueConfig {
    /// Issuers whose compliance credentials are accepted.
    pub trusted_issuers: Vec<String>,
    /// Hex Ed25519 public keys by verification method or bare DID.
    pub issuer_keys: BTreeMap<String, String>,
    /// Levels the entity storage audit sink keeps.
    pub audit_levels: Vec<LogLevel>,
    /// Page size when a query gives none.
    pub default_page_size: usize,
    /// Larger requested page sizes are clamped to this.
    pub max_page_size: usize,
    /// Log output format.
    pub log_format: LogFormat,
    /// Install the Prometheus metrics recorder.
    pub metrics_enabled: bool,
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            trusted_issuers: Vec::new(),
            issuer_keys: BTreeMap::new(),
            audit_levels: LogLevel::ALL.to_vec(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            log_format: LogFormat::Text,
            metrics_enabled: false,
        }
    }
}

impl std::fmt::Debug for CatalogueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogueConfig")
            .field("trusted_issuers", &self.trusted_issuers)
            .field("issuer_keys", &self.issuer_keys.keys().collect::<Vec<_>>())
            .field("audit_levels", &self.audit_levels)
            .field("default_page_size", &self.default_page_size)
            .field("max_page_size", &self.max_page_size)
            .field("log_format", &self.log_format)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl CatalogueConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FEDCAT_TRUSTED_ISSUERS`: comma-separated issuer DIDs (default: none)
    /// - `FEDCAT_ISSUER_KEYS`: comma-separated `<method or DID>=<hex key>` (default: none)
    /// - `FEDCAT_AUDIT_LEVELS`: comma-separated levels (default: all)
    /// - `FEDCAT_DEFAULT_PAGE_SIZE` (default: 20)
    /// - `FEDCAT_MAX_PAGE_SIZE` (default: 100)
    /// - `FEDCAT_LOG_FORMAT`: `text` or `json` (default: `text`)
    /// - `FEDCAT_METRICS`: `true` or `false` (default: `false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let audit_levels = match var("FEDCAT_AUDIT_LEVELS") {
            Some(raw) => split_list(&raw)
                .map(|level| {
                    level.parse::<LogLevel>().map_err(|e| ConfigError::InvalidValue {
                        var: "FEDCAT_AUDIT_LEVELS".into(),
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.audit_levels,
        };

        let config = Self {
            trusted_issuers: var("FEDCAT_TRUSTED_ISSUERS")
                .map(|raw| split_list(&raw).map(str::to_string).collect())
                .unwrap_or_default(),
            issuer_keys: match var("FEDCAT_ISSUER_KEYS") {
                Some(raw) => parse_issuer_keys(&raw)?,
                None => BTreeMap::new(),
            },
            audit_levels,
            default_page_size: env_usize(
                var("FEDCAT_DEFAULT_PAGE_SIZE"),
                "FEDCAT_DEFAULT_PAGE_SIZE",
                defaults.default_page_size,
            )?,
            max_page_size: env_usize(
                var("FEDCAT_MAX_PAGE_SIZE"),
                "FEDCAT_MAX_PAGE_SIZE",
                defaults.max_page_size,
            )?,
            log_format: match var("FEDCAT_LOG_FORMAT") {
                Some(raw) => raw.parse()?,
                None => defaults.log_format,
            },
            metrics_enabled: env_bool(var("FEDCAT_METRICS"), "FEDCAT_METRICS", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check page size bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(ConfigError::InvalidPageLimits {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidPageLimits {
                default: self.default_page_size,
                max: self.max_page_size,
            });
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_issuer_keys(raw: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    split_list(raw)
        .map(|pair| -> Result<(String, String), ConfigError> {
            let (method, key) = pair.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                var: "FEDCAT_ISSUER_KEYS".into(),
                value: pair.to_string(),
                reason: "expected <verification method>=<hex public key>".into(),
            })?;
            Ok((method.trim().to_string(), key.trim().to_string()))
        })
        .collect()
}

fn env_usize(raw: Option<String>, var: &str, default: usize) -> Result<usize, ConfigError> {
    match raw {
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) => Ok(n),
            Err(_) => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw,
                reason: "expected a non-negative integer".into(),
            }),
        },
        None => Ok(default),
    }
}

fn env_bool(raw: Option<String>, var: &str, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.unwrap_or_default(),
            reason: "expected true or false".into(),
        }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value \"{value}\" for {var}: {reason}")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },
    #[error("invalid page limits: default {default}, max {max} (both must be positive, default <= max)")]
    InvalidPageLimits { default: usize, max: usize },
}
