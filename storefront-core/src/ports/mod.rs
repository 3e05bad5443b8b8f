//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod notifier;
mod transport;

pub use notifier::Notifier;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport};
