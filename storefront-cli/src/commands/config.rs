//! Config command - show or update settings.json

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use storefront_core::config::Config;

use super::get_storefront_dir;
use crate::output;

pub fn run(set_api_url: Option<String>, json: bool) -> Result<()> {
    let storefront_dir = get_storefront_dir()?;

    if let Some(url) = set_api_url {
        // Start from the file alone so environment overrides are not persisted
        let mut stored = Config::load_with(&storefront_dir, |_| None)?;
        stored.api.base_url = url;
        stored.save(&storefront_dir)?;
        if !json {
            output::success(&format!("Saved API URL: {}", stored.api.base_url));
        }
    }

    let config = Config::load(&storefront_dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.api)?);
        return Ok(());
    }

    println!("{}", "Storefront Configuration".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Settings directory", &storefront_dir.display().to_string()]);
    table.add_row(vec!["API base URL", &config.api.base_url]);
    table.add_row(vec![
        "Request timeout",
        &format!("{}s", config.api.request_timeout_secs),
    ]);
    table.add_row(vec![
        "Refresh timeout",
        &format!("{}s", config.api.refresh_timeout_secs),
    ]);
    table.add_row(vec!["Refresh endpoint", &config.api.refresh_path]);
    println!("{}", table);

    Ok(())
}
