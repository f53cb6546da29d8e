//! Buy a product and print the event stream

use std::path::Path;

use anyhow::Result;
use unistore_lib::validator::ValidatorConfig;
use unistore_lib::{StoreBackend, StoreConfig, StoreEvent, UniversalStore};

use crate::commands::load_catalog;
use crate::ui;

#[tracing::instrument(skip(config, catalog_path, validation_url))]
pub async fn run(
    config: StoreConfig,
    catalog_path: Option<&Path>,
    id: &str,
    validation_url: Option<String>,
    verbose: bool,
) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    if !catalog.contains(id) {
        ui::error(&format!("Unknown product '{}'", id));
        ui::info(&format!(
            "Available products: {}",
            catalog
                .ids()
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        anyhow::bail!("product '{}' is not in the catalog", id);
    }

    let config = match validation_url {
        Some(url) => {
            let validation = match config.validation.clone() {
                Some(existing) => ValidatorConfig { url, ..existing },
                None => ValidatorConfig::new(url),
            };
            config.with_validation(validation)
        }
        None => config,
    };

    ui::header(&format!("Buying {}", id));
    if verbose {
        ui::key_value("backend", config.backend.as_str());
        if let Some(validation) = &config.validation {
            ui::key_value("validation", &validation.url);
        }
    }

    let store = UniversalStore::builder(catalog).config(config).build()?;
    let mut events = store.subscribe();

    store.initialize().await;
    ui::key_value("price", &store.price(id));

    let spinner = ui::spinner("Purchasing...");
    store.buy(id).await;
    spinner.finish_and_clear();

    ui::separator();
    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, StoreEvent::PurchaseFailed { .. }) {
            failed = true;
        }
        ui::event(&event);
    }
    ui::separator();

    if store.is_purchased(id) {
        ui::success(&format!("{} is now owned", id));
    }
    if failed {
        anyhow::bail!("purchase of '{}' failed", id);
    }

    Ok(())
}
