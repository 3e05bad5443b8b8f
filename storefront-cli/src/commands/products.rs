//! Products command - list the catalog

use std::sync::Arc;

use anyhow::{Context, Result};
use storefront_core::adapters::notifier::TracingNotifier;

use super::get_context;
use crate::output;

pub async fn run(category: Option<String>, featured: bool, json: bool) -> Result<()> {
    // Failures are reported once, by main; store notifications only go to the log
    let ctx = get_context(Arc::new(TracingNotifier))?;

    let fetched = match (&category, featured) {
        (Some(category), _) => ctx.catalog.fetch_by_category(category).await,
        (None, true) => ctx.catalog.fetch_featured().await,
        (None, false) => ctx.catalog.fetch_all().await,
    };
    fetched.with_context(|| format!("Failed to fetch products from {}", ctx.config.api.base_url))?;

    let products = ctx.catalog.products();
    if json {
        println!("{}", serde_json::to_string_pretty(&products)?);
        return Ok(());
    }

    if let Some(category) = &category {
        output::info(&format!("Category: {}", category));
    } else if featured {
        output::info("Featured products");
    }
    output::print_products(&products);
    Ok(())
}
