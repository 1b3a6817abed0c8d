//! Prompt catalog listing.

use anyhow::Result;

use bender::config::Config;
use bender::prompts::PromptCatalog;

use super::render::print_catalog;

/// List the catalog, optionally filtered by keyword.
pub(crate) fn cmd_prompts(config: &Config, search: Option<&str>, show_keys: bool) -> Result<()> {
    let catalog = PromptCatalog::load(config.catalog.path.as_deref());

    let Some(keyword) = search else {
        print_catalog(&catalog, show_keys);
        return Ok(());
    };

    let hits = catalog.search(keyword);
    if hits.is_empty() {
        println!("No prompts match '{}'.", keyword);
        return Ok(());
    }

    println!("Prompts matching '{}':", keyword);
    for entry in hits {
        // Positions stay those of the full catalog so they can be typed back in.
        let position = catalog
            .entries()
            .iter()
            .position(|e| e.key == entry.key)
            .map_or(0, |i| i + 1);
        if show_keys {
            println!("{}. [{}] {}", position, entry.key, entry.text);
        } else {
            println!("{}. {}", position, entry.text);
        }
    }
    Ok(())
}
