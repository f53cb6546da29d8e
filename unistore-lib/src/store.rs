//! The unified store facade.
//!
//! [`UniversalStore`] picks one backend at construction from
//! [`StoreConfig::backend`] and forwards every operation to it. Events come
//! straight from the backend's channel.
//!
//! # Example
//!
//! ```ignore
//! use unistore_lib::prelude::*;
//!
//! let store = UniversalStore::builder(catalog)
//!     .config(StoreConfig::new(BackendKind::Plugin))
//!     .plugin_provider(Arc::new(MyPluginBinding::new()))
//!     .build()?;
//!
//! store.initialize().await;
//! let handle = store.spawn_buy("no_ads");
//! handle.await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::backends::{
    BackendKind, FakeStore, PluginStore, PurchasingProvider, SamsungIapSdk, SamsungStore,
    StoreBackend,
};
use crate::catalog::ProductCatalog;
use crate::config::StoreConfig;
use crate::events::{EventEmitter, EventReceiver};
use crate::purchase::PurchaseInfo;
use crate::validator::{HttpValidator, ReceiptValidator};
use crate::{Result, UniStoreError};

/// Single purchasing interface over the configured backend.
#[derive(Clone)]
pub struct UniversalStore {
    backend: Arc<dyn StoreBackend>,
    config: StoreConfig,
}

impl std::fmt::Debug for UniversalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversalStore")
            .field("backend", &self.backend.kind())
            .field("products", &self.backend.products().len())
            .field("initialized", &self.backend.is_initialized())
            .finish()
    }
}

impl UniversalStore {
    /// Start building a store over `catalog`.
    pub fn builder(catalog: ProductCatalog) -> UniversalStoreBuilder {
        UniversalStoreBuilder::new(catalog)
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(backend: Arc<dyn StoreBackend>) -> Self {
        let config = StoreConfig::new(backend.kind());
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Fresh store over a new instance of the same backend.
    pub fn new_instance(&self) -> Self {
        Self {
            backend: self.backend.create_new_instance(),
            config: self.config.clone(),
        }
    }

    /// Run `buy` on the tokio runtime without awaiting it.
    pub fn spawn_buy(&self, id: impl Into<String>) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let id = id.into();
        tokio::spawn(async move { backend.buy(&id).await })
    }

    /// Run `restore_purchases` on the tokio runtime without awaiting it.
    pub fn spawn_restore(&self) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move { backend.restore_purchases().await })
    }
}

#[async_trait]
impl StoreBackend for UniversalStore {
    fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn products(&self) -> &ProductCatalog {
        self.backend.products()
    }

    fn events(&self) -> &EventEmitter {
        self.backend.events()
    }

    fn is_initialized(&self) -> bool {
        self.backend.is_initialized()
    }

    async fn initialize(&self) {
        self.backend.initialize().await
    }

    fn is_purchased(&self, id: &str) -> bool {
        self.backend.is_purchased(id)
    }

    fn price(&self, id: &str) -> String {
        self.backend.price(id)
    }

    fn product_info(&self, id: &str) -> Option<PurchaseInfo> {
        self.backend.product_info(id)
    }

    async fn buy(&self, id: &str) {
        self.backend.buy(id).await
    }

    async fn try_restore_purchases(&self) -> bool {
        self.backend.try_restore_purchases().await
    }

    async fn restore_purchases(&self) {
        self.backend.restore_purchases().await
    }

    fn subscribe(&self) -> EventReceiver {
        self.backend.subscribe()
    }

    fn create_new_instance(&self) -> Arc<dyn StoreBackend> {
        Arc::new(self.new_instance())
    }
}

/// Builder for [`UniversalStore`].
pub struct UniversalStoreBuilder {
    catalog: ProductCatalog,
    config: StoreConfig,
    validator: Option<Arc<dyn ReceiptValidator>>,
    plugin_provider: Option<Arc<dyn PurchasingProvider>>,
    samsung_sdk: Option<Arc<dyn SamsungIapSdk>>,
}

impl UniversalStoreBuilder {
    pub fn new(catalog: ProductCatalog) -> Self {
        Self {
            catalog,
            config: StoreConfig::default(),
            validator: None,
            plugin_provider: None,
            samsung_sdk: None,
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `validator` instead of one built from `StoreConfig::validation`.
    pub fn validator(mut self, validator: Arc<dyn ReceiptValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn plugin_provider(mut self, provider: Arc<dyn PurchasingProvider>) -> Self {
        self.plugin_provider = Some(provider);
        self
    }

    pub fn samsung_sdk(mut self, sdk: Arc<dyn SamsungIapSdk>) -> Self {
        self.samsung_sdk = Some(sdk);
        self
    }

    /// Build the store.
    ///
    /// # Errors
    ///
    /// - [`UniStoreError::ProviderMissing`] if the selected backend's provider
    ///   was not supplied
    /// - [`UniStoreError::InvalidData`] if the validation config is invalid
    pub fn build(self) -> Result<UniversalStore> {
        let validator = match (self.validator, &self.config.validation) {
            (Some(validator), _) => Some(validator),
            (None, Some(config)) => {
                Some(Arc::new(HttpValidator::new(config.clone())?) as Arc<dyn ReceiptValidator>)
            }
            (None, None) => None,
        };
        let catalog = Arc::new(self.catalog);
        let kind = self.config.backend;

        let backend: Arc<dyn StoreBackend> = match kind {
            BackendKind::Fake => Arc::new(FakeStore::new(catalog, validator)),
            BackendKind::Plugin => {
                let provider = self
                    .plugin_provider
                    .ok_or_else(|| UniStoreError::ProviderMissing(kind.to_string()))?;
                Arc::new(
                    PluginStore::new(catalog, validator, provider)
                        .with_options(self.config.plugin.clone()),
                )
            }
            BackendKind::Samsung => {
                let sdk = self
                    .samsung_sdk
                    .ok_or_else(|| UniStoreError::ProviderMissing(kind.to_string()))?;
                Arc::new(
                    SamsungStore::new(catalog, validator, sdk)
                        .with_options(self.config.samsung.clone()),
                )
            }
        };

        tracing::info!(backend = %kind, "universal store built");
        Ok(UniversalStore {
            backend,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_catalog, MockPurchasingProvider, MockSamsungSdk};
    use crate::validator::ValidatorConfig;
    use crate::UniStoreErrorCode;

    #[test]
    fn test_default_builds_fake() {
        let store = UniversalStore::builder(sample_catalog()).build().unwrap();
        assert_eq!(store.kind(), BackendKind::Fake);
        assert!(store.is_initialized());
    }

    #[test]
    fn test_missing_provider_is_error() {
        let err = UniversalStore::builder(sample_catalog())
            .config(StoreConfig::new(BackendKind::Plugin))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UniStoreErrorCode::ProviderMissing);

        let err = UniversalStore::builder(sample_catalog())
            .config(StoreConfig::new(BackendKind::Samsung))
            .plugin_provider(Arc::new(MockPurchasingProvider::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("samsung"));
    }

    #[test]
    fn test_selects_configured_backend() {
        let store = UniversalStore::builder(sample_catalog())
            .config(StoreConfig::new(BackendKind::Samsung))
            .samsung_sdk(Arc::new(MockSamsungSdk::new()))
            .build()
            .unwrap();
        assert_eq!(store.kind(), BackendKind::Samsung);
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_invalid_validation_config() {
        let config = StoreConfig::default().with_validation(ValidatorConfig::new(""));
        let err = UniversalStore::builder(sample_catalog())
            .config(config)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), UniStoreErrorCode::InvalidData);
    }

    #[tokio::test]
    async fn test_spawn_buy_completes() {
        let store = UniversalStore::builder(sample_catalog()).build().unwrap();
        let mut rx = store.subscribe();

        store.spawn_buy("no_ads").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().name(), "purchase_started");
        assert_eq!(rx.recv().await.unwrap().name(), "purchase_succeeded");
        assert!(store.is_purchased("no_ads"));

        store.spawn_restore().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().name(), "restored");
    }
}
