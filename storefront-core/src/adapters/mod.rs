//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest (with an in-memory cookie jar) for the HttpTransport port
//! - a scripted in-memory backend for tests
//! - tracing and in-memory recorders for the Notifier port

pub mod notifier;
pub mod reqwest_transport;
pub mod scripted;

#[cfg(test)]
pub mod mock_server;
