//! List the products in a catalog file

use std::path::Path;

use anyhow::Result;

use crate::commands::load_catalog;
use crate::ui;

pub async fn run(file: &Path, verbose: bool) -> Result<()> {
    let catalog = load_catalog(Some(file))?;

    ui::header(&format!("Catalog ({} products)", catalog.len()));
    if catalog.is_empty() {
        ui::info("The catalog is empty");
        return Ok(());
    }

    for product in catalog.iter() {
        ui::key_value(product.id().as_str(), product.product_type().as_str());
        if verbose && !product.price().is_empty() {
            println!("      {} {}", product.price(), product.currency());
        }
    }

    Ok(())
}
