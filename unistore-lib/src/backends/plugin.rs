//! Backend over a generic purchasing plugin.
//!
//! The application supplies the plugin binding as a [`PurchasingProvider`].
//! The store hands it the catalog's product definitions at initialization,
//! drives purchases through it and runs every completed purchase through the
//! common validation gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{BackendCore, BackendKind, StoreBackend};
use crate::catalog::{ProductCatalog, ProductType};
use crate::events::{EventEmitter, FailureReason, StoreEvent};
use crate::purchase::PurchaseInfo;
use crate::validator::{unwrap_unified_receipt, ReceiptValidator};
use crate::{ProductId, Result, UniStoreError};

/// Product registration passed to the provider at initialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDefinition {
    pub id: ProductId,
    #[serde(rename = "type")]
    pub product_type: ProductType,
}

/// Metadata the provider reports for a registered product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProduct {
    pub id: ProductId,
    /// Localized display price, e.g. "€0,99".
    #[serde(default)]
    pub localized_price: String,
    #[serde(default)]
    pub iso_currency_code: String,
    #[serde(default)]
    pub product_type: Option<ProductType>,
}

impl ProviderProduct {
    pub fn new(id: impl Into<ProductId>, localized_price: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            localized_price: localized_price.into(),
            iso_currency_code: String::new(),
            product_type: None,
        }
    }

    pub fn with_currency(mut self, iso_currency_code: impl Into<String>) -> Self {
        self.iso_currency_code = iso_currency_code.into();
        self
    }

    pub fn with_product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = Some(product_type);
        self
    }

    fn to_info(&self) -> PurchaseInfo {
        let info = PurchaseInfo::new(&self.id)
            .with_price(self.localized_price.clone(), self.iso_currency_code.clone());
        match self.product_type {
            Some(product_type) => info.with_product_type(product_type),
            None => info,
        }
    }
}

/// Receipt data of a completed purchase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReceipt {
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Raw receipt text; `None` or empty means the purchase has no receipt.
    #[serde(default)]
    pub receipt: Option<String>,
}

impl ProviderReceipt {
    pub fn new(receipt: impl Into<String>) -> Self {
        Self {
            transaction_id: None,
            receipt: Some(receipt.into()),
        }
    }

    /// A completion without receipt data.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }
}

/// Outcome of a provider purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderPurchase {
    Completed(ProviderReceipt),
    Failed { reason: String },
}

/// Binding to the purchasing plugin.
///
/// Errors returned from any method are logged by the store and turned into a
/// failure event or `false`; they never reach the application.
#[async_trait]
pub trait PurchasingProvider: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str {
        "plugin"
    }

    /// Register products and return the metadata the provider knows.
    async fn initialize(&self, products: &[ProductDefinition]) -> Result<Vec<ProviderProduct>>;

    /// Whether the provider's controller is available.
    fn is_ready(&self) -> bool;

    /// Run a purchase to its provider-level outcome.
    async fn purchase(&self, product_id: &ProductId) -> Result<ProviderPurchase>;

    /// Whether the platform offers a restore operation.
    fn supports_restore(&self) -> bool {
        false
    }

    /// Restore previous transactions.
    async fn restore(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Behavior switches for [`PluginStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginStoreOptions {
    /// Validate the `Payload` of the unified receipt envelope instead of the
    /// whole receipt text.
    #[serde(default)]
    pub unwrap_receipt_envelope: bool,
}

/// Store backed by a [`PurchasingProvider`].
pub struct PluginStore {
    core: BackendCore,
    provider: Arc<dyn PurchasingProvider>,
    options: PluginStoreOptions,
    initialized: AtomicBool,
    initialization_failed: AtomicBool,
}

impl PluginStore {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        validator: Option<Arc<dyn ReceiptValidator>>,
        provider: Arc<dyn PurchasingProvider>,
    ) -> Self {
        Self::from_core(
            BackendCore::new(BackendKind::Plugin, catalog, validator),
            provider,
            PluginStoreOptions::default(),
        )
    }

    fn from_core(
        core: BackendCore,
        provider: Arc<dyn PurchasingProvider>,
        options: PluginStoreOptions,
    ) -> Self {
        Self {
            core,
            provider,
            options,
            initialized: AtomicBool::new(false),
            initialization_failed: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: PluginStoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PluginStoreOptions {
        &self.options
    }

    /// Whether the last `initialize` failed.
    pub fn initialization_failed(&self) -> bool {
        self.initialization_failed.load(Ordering::Acquire)
    }

    fn definitions(&self) -> Vec<ProductDefinition> {
        self.core
            .catalog()
            .iter()
            .map(|product| ProductDefinition {
                id: product.id().clone(),
                product_type: product.product_type(),
            })
            .collect()
    }

    /// Receipt text that is validated and reported on success.
    fn receipt_payload(&self, raw: String) -> String {
        if self.core.validator().is_some() && self.options.unwrap_receipt_envelope {
            unwrap_unified_receipt(&raw).unwrap_or(raw)
        } else {
            raw
        }
    }
}

#[async_trait]
impl StoreBackend for PluginStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Plugin
    }

    fn products(&self) -> &ProductCatalog {
        self.core.catalog()
    }

    fn events(&self) -> &EventEmitter {
        self.core.events()
    }

    fn is_initialized(&self) -> bool {
        !self.initialization_failed.load(Ordering::Acquire)
            && self.initialized.load(Ordering::Acquire)
            && self.provider.is_ready()
    }

    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    async fn initialize(&self) {
        match self.provider.initialize(&self.definitions()).await {
            Ok(products) => {
                self.core
                    .set_product_infos(products.iter().map(ProviderProduct::to_info));
                self.initialization_failed.store(false, Ordering::Release);
                self.initialized.store(true, Ordering::Release);
                tracing::info!(products = products.len(), "plugin store initialized");
                self.core
                    .events()
                    .emit(StoreEvent::Initialized { success: true });
            }
            Err(e) => {
                tracing::warn!(error = %e, "plugin store initialization failed");
                self.initialization_failed.store(true, Ordering::Release);
                self.core
                    .events()
                    .emit(StoreEvent::Initialized { success: false });
            }
        }
    }

    fn is_purchased(&self, id: &str) -> bool {
        self.core.is_purchased(id)
    }

    fn price(&self, id: &str) -> String {
        self.core.price_or(id, "")
    }

    fn product_info(&self, id: &str) -> Option<PurchaseInfo> {
        self.core.product_info(id)
    }

    #[tracing::instrument(skip(self), fields(provider = self.provider.name()))]
    async fn buy(&self, id: &str) {
        if !self.is_initialized() {
            tracing::debug!(product_id = id, reason = %UniStoreError::NotInitialized, "buy ignored");
            return;
        }
        let Some((mut flow, info)) = self.core.start_purchase(id) else {
            return;
        };

        match self.provider.purchase(info.product_id()).await {
            Ok(ProviderPurchase::Completed(completed)) => {
                let mut info = info.with_purchased_at(Utc::now());
                if let Some(transaction_id) = completed.transaction_id {
                    info = info.with_purchase_id(transaction_id);
                }
                match completed.receipt.filter(|r| !r.is_empty()) {
                    Some(raw) => {
                        let receipt = self.receipt_payload(raw);
                        self.core.complete_purchase(&mut flow, info, receipt).await;
                    }
                    None => {
                        self.core
                            .fail_purchase(&mut flow, info, FailureReason::MissingReceipt);
                    }
                }
            }
            Ok(ProviderPurchase::Failed { reason }) => {
                self.core
                    .fail_purchase(&mut flow, info, FailureReason::Provider(reason));
            }
            Err(e) => {
                tracing::warn!(error = %e, "provider purchase error");
                self.core
                    .fail_purchase(&mut flow, info, FailureReason::Provider(e.to_string()));
            }
        }
    }

    async fn try_restore_purchases(&self) -> bool {
        if !self.is_initialized() {
            tracing::debug!("restore refused: store not initialized");
            return false;
        }
        if !self.provider.supports_restore() {
            return true;
        }
        match self.provider.restore().await {
            Ok(restored) => restored,
            Err(e) => {
                tracing::warn!(error = %e, "provider restore error");
                false
            }
        }
    }

    fn create_new_instance(&self) -> Arc<dyn StoreBackend> {
        Arc::new(Self::from_core(
            self.core.fresh(),
            Arc::clone(&self.provider),
            self.options.clone(),
        ))
    }
}
