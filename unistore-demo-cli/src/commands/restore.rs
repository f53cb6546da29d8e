//! Restore purchases

use std::path::Path;

use anyhow::Result;
use unistore_lib::{StoreBackend, StoreConfig, UniversalStore};

use crate::commands::load_catalog;
use crate::ui;

pub async fn run(config: StoreConfig, catalog_path: Option<&Path>, verbose: bool) -> Result<()> {
    let catalog = load_catalog(catalog_path)?;
    let store = UniversalStore::builder(catalog).config(config).build()?;
    let mut events = store.subscribe();

    ui::header("Restoring purchases");
    store.initialize().await;
    store.restore_purchases().await;

    while let Ok(event) = events.try_recv() {
        if verbose || event.name() == "restored" {
            ui::event(&event);
        }
    }

    Ok(())
}
