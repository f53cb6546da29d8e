//! CLI command implementations

pub mod buy;
pub mod catalog;
pub mod restore;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use unistore_lib::{BackendKind, Product, ProductCatalog, ProductType, StoreConfig};

use crate::ui;

/// Load the store configuration from `path` (if any) and apply env overrides.
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let mut config = config.apply_env()?;

    // Platform backends need a native provider the demo cannot supply.
    if config.backend != BackendKind::Fake {
        ui::warning(&format!(
            "backend '{}' is not available in the demo, using the fake store",
            config.backend
        ));
        config.backend = BackendKind::Fake;
    }
    Ok(config)
}

/// Load a catalog file, or the built-in demo catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<ProductCatalog> {
    match path {
        Some(path) => ProductCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display())),
        None => Ok(demo_catalog()?),
    }
}

/// Products available when no catalog file is given.
pub fn demo_catalog() -> unistore_lib::Result<ProductCatalog> {
    ProductCatalog::from_products([
        Product::new("coin_100", ProductType::Consumable).with_price("$0.99", "USD"),
        Product::new("no_ads", ProductType::NonConsumable).with_price("$2.99", "USD"),
        Product::new("vip_monthly", ProductType::Subscription).with_price("$4.99", "USD"),
    ])
}
