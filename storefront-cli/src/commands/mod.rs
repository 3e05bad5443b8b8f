//! CLI command implementations

pub mod config;
pub mod products;
pub mod shell;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use storefront_core::config::Config;
use storefront_core::ports::Notifier;
use storefront_core::StorefrontContext;

/// Get the storefront directory from environment or default
pub fn get_storefront_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("STOREFRONT_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".storefront"))
        .context("Could not find home directory; set STOREFRONT_DIR")
}

/// Build a storefront context from the on-disk configuration
pub fn get_context(notifier: Arc<dyn Notifier>) -> Result<StorefrontContext> {
    let storefront_dir = get_storefront_dir()?;
    tracing::debug!(dir = ?storefront_dir, "loading configuration");
    let config = Config::load(&storefront_dir)
        .with_context(|| format!("Failed to load configuration from {:?}", storefront_dir))?;

    StorefrontContext::new(config, notifier)
}
