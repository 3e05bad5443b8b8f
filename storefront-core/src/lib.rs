//! Storefront Core - client-side session and catalog logic for the storefront API
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Session, UserProfile, Product, etc.)
//! - **ports**: Trait definitions for external dependencies (HttpTransport, Notifier)
//! - **services**: Stores and the refresh-on-401 API client
//! - **adapters**: Concrete implementations (reqwest, scripted backend, notifiers)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::sync::Arc;

use anyhow::Result;

use adapters::reqwest_transport::ReqwestTransport;
use config::Config;
use ports::{HttpTransport, Notifier};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{NewProduct, Notification, Product, Role, Session, SessionPhase, UserProfile};
pub use services::{AuthProbe, CatalogState, Navigation, Route, SignupForm};

/// Main context for storefront operations
///
/// Builds the API client and both stores once; front ends hold the context
/// and reach everything through it.
pub struct StorefrontContext {
    pub config: Config,
    pub api: Arc<ApiClient>,
    pub session: SessionStore,
    pub catalog: CatalogStore,
}

impl StorefrontContext {
    /// Create a context talking to the configured backend over HTTP
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.api)?);
        Ok(Self::with_transport(config, transport, notifier))
    }

    /// Create a context over any transport
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = SessionState::new();
        let api = Arc::new(ApiClient::new(transport, state.clone(), &config.api));
        let session = SessionStore::new(Arc::clone(&api), state, Arc::clone(&notifier));
        let catalog = CatalogStore::new(Arc::clone(&api), notifier);

        tracing::debug!(
            transport = api.transport_name(),
            base_url = %config.api.base_url,
            "storefront context ready"
        );

        Self {
            config,
            api,
            session,
            catalog,
        }
    }
}
