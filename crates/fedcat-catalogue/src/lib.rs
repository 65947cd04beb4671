//! # fedcat-catalogue — Federated Catalogue
//!
//! Ingests signed compliance and service description credentials, keeps a
//! catalogue of verified participants and the services they offer, and
//! answers cursor-paginated queries over both.
//!
//! - **entry**: the stored [`ParticipantEntry`] and [`ServiceDescriptionEntry`].
//! - **extract**: verified claims → entries.
//! - **service**: [`FederatedCatalogue`], the registration pipeline and query
//!   facade.
//! - **config**: [`CatalogueConfig`] from the environment.
//! - **bootstrap**: tracing, metrics, and in-memory wiring.
//!
//! ```no_run
//! use fedcat_catalogue::{bootstrap, CatalogueConfig, ParticipantQuery};
//!
//! let config = CatalogueConfig::from_env()?;
//! let components = bootstrap::build_catalogue(&config)?;
//! let page = components.catalogue.query_participants(&ParticipantQuery::default())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bootstrap;
pub mod config;
pub mod entry;
pub mod error;
pub mod extract;
pub mod service;

pub use config::{CatalogueConfig, ConfigError, LogFormat};
pub use entry::{ParticipantEntry, ServiceDescriptionEntry};
pub use error::CatalogueError;
pub use extract::ExtractError;
pub use service::{
    FederatedCatalogue, ParticipantQuery, QueryPage, ServiceDescriptionQuery, AUDIT_SOURCE,
};
