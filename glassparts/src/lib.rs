//! # glassparts - Client du service de stock de vitrage automobile
//!
//! Cette crate fournit un client asynchrone typé pour un service SOAP 1.1
//! (`pdaservice.asmx`) de recherche de pièces de vitrage : marques, modèles,
//! lignes de prix, dépôts, disponibilité et recherche par immatriculation.
//!
//! ## Vue d'ensemble
//!
//! - Identifiants résolus depuis l'environnement, la configuration ou des valeurs par défaut
//! - Construction des enveloppes et extraction des réponses (via `glasssoap`)
//! - Transport HTTP avec délai par appel et logs tronqués
//! - Neuf opérations typées ([`GlassPartsClient`])
//! - Agrégation de disponibilité multi-dépôts à concurrence bornée
//!
//! ## Structure des modules
//!
//! ```text
//! glassparts/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # Client et opérations SOAP
//! │   ├── availability.rs     # Agrégation multi-dépôts
//! │   ├── transport.rs        # Transport HTTP (trait SoapTransport)
//! │   ├── retry.rs            # Nouvelles tentatives
//! │   ├── models.rs           # Structures de données
//! │   ├── config_ext.rs       # Extension glassconfig
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use glassparts::GlassPartsClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Identifiants et réglages depuis glassconfig et GLASSPARTS_*
//!     let client = GlassPartsClient::from_config()?;
//!
//!     let models = client.get_models("FORD").await?;
//!     println!("{} models", models.len());
//!
//!     let availability = client
//!         .aggregate_availability("2448AGNMV1B", 1, None)
//!         .await?;
//!     println!("{} units in stock", availability.total_qty);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Erreurs
//!
//! Les échecs de transport ([`GatewayError::Transport`], [`GatewayError::Timeout`])
//! sont distincts des refus du service ([`GatewayError::SoapFault`]). Une
//! valeur numérique illisible dans une réponse n'est pas une erreur : elle
//! vaut 0.

mod availability;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod retry;
pub mod transport;

pub use client::{
    ClientBuilder, GlassPartsClient, DEFAULT_MAX_CONCURRENCY, DEFAULT_NAMESPACE,
    DEFAULT_SERVICE_URL, DEFAULT_USER_AGENT, normalize_vrn,
};
pub use config_ext::{
    resolve_credentials_with, GlassPartsConfigExt, DEFAULT_LOGIN, DEFAULT_PASSWORD,
    DEFAULT_USER_ID, ENV_LOGIN, ENV_PASSWORD, ENV_USER_ID,
};
pub use error::{GatewayError, Result};
pub use models::{
    AggregatedAvailability, ArgicVehicleMatch, Availability, AvailabilityOutcome, Depot,
    PriceRecord, StockItem, StockList, VehicleDescriptor, VrnLookup,
};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, SoapTransport, TransportResult};

pub use glasssoap::Credentials;
