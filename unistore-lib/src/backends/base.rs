//! State and purchase gate shared by all backends.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::BackendKind;
use crate::catalog::{ProductCatalog, ProductType};
use crate::events::{EventEmitter, FailureReason, StoreEvent};
use crate::purchase::{PurchaseFlow, PurchaseInfo, PurchaseOutcome, PurchaseState, PurchasedSet};
use crate::validator::{ReceiptValidator, ValidationVerdict};
use crate::{ProductId, UniStoreError};

/// Per-instance state every backend carries.
///
/// Owns the purchased set and the product-info table. Purchases are driven
/// through [`start_purchase`](Self::start_purchase) and then exactly one of
/// [`complete_purchase`](Self::complete_purchase) or
/// [`fail_purchase`](Self::fail_purchase).
pub struct BackendCore {
    kind: BackendKind,
    catalog: Arc<ProductCatalog>,
    validator: Option<Arc<dyn ReceiptValidator>>,
    purchased: PurchasedSet,
    product_infos: RwLock<HashMap<ProductId, PurchaseInfo>>,
    events: EventEmitter,
}

impl BackendCore {
    pub fn new(
        kind: BackendKind,
        catalog: Arc<ProductCatalog>,
        validator: Option<Arc<dyn ReceiptValidator>>,
    ) -> Self {
        Self {
            kind,
            catalog,
            validator,
            purchased: PurchasedSet::new(),
            product_infos: RwLock::new(HashMap::new()),
            events: EventEmitter::new(),
        }
    }

    /// Same catalog and validator, everything else empty.
    pub fn fresh(&self) -> Self {
        Self::new(self.kind, Arc::clone(&self.catalog), self.validator.clone())
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn shared_catalog(&self) -> Arc<ProductCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn validator(&self) -> Option<Arc<dyn ReceiptValidator>> {
        self.validator.clone()
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn purchased(&self) -> &PurchasedSet {
        &self.purchased
    }

    /// Owned in this instance. Always false for ids outside the catalog.
    pub fn is_purchased(&self, id: &str) -> bool {
        self.catalog.contains(id) && self.purchased.contains(id)
    }

    /// Replace the provider metadata table.
    pub fn set_product_infos(&self, infos: impl IntoIterator<Item = PurchaseInfo>) {
        let mut table = self
            .product_infos
            .write()
            .unwrap_or_else(|e| e.into_inner());
        table.clear();
        for info in infos {
            table.insert(info.product_id().clone(), info);
        }
    }

    pub fn product_info(&self, id: &str) -> Option<PurchaseInfo> {
        let table = self.product_infos.read().unwrap_or_else(|e| e.into_inner());
        table.get(id).cloned()
    }

    /// Provider price, or `fallback` when no metadata is loaded for `id`.
    pub fn price_or(&self, id: &str, fallback: &str) -> String {
        self.product_info(id)
            .map(|info| info.price().to_string())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Best known record for a catalog product.
    pub fn purchase_info(&self, id: &str) -> Option<PurchaseInfo> {
        let product = self.catalog.get(id)?;
        Some(match self.product_info(id) {
            Some(info) if info.product_type().is_some() => info,
            Some(info) => info.with_product_type(product.product_type()),
            None => PurchaseInfo::from_product(product),
        })
    }

    /// Begin a purchase of `id` and emit `PurchaseStarted`.
    ///
    /// Returns `None` without emitting anything if `id` is not in the catalog.
    pub fn start_purchase(&self, id: &str) -> Option<(PurchaseFlow, PurchaseInfo)> {
        let Some(info) = self.purchase_info(id) else {
            let reason = UniStoreError::UnknownProduct(id.to_string());
            tracing::debug!(backend = %self.kind, %reason, "buy ignored");
            return None;
        };

        let mut flow = PurchaseFlow::new(info.product_id());
        if let Err(e) = flow.advance(PurchaseState::Started) {
            tracing::warn!(error = %e, "purchase flow could not start");
            return None;
        }

        tracing::info!(backend = %self.kind, product_id = id, "purchase started");
        self.events
            .emit(StoreEvent::PurchaseStarted { info: info.clone() });
        Some((flow, info))
    }

    /// Run the provider-confirmed purchase through validation and report it.
    ///
    /// On acceptance owned product types are recorded in the purchased set
    /// before `PurchaseSucceeded` is emitted.
    pub async fn complete_purchase(
        &self,
        flow: &mut PurchaseFlow,
        info: PurchaseInfo,
        receipt: String,
    ) -> PurchaseState {
        if let Err(reason) = self.gate(flow, &info, &receipt).await {
            return self.fail_purchase(flow, info, reason);
        }
        if let Err(e) = flow.advance(PurchaseState::Completed(PurchaseOutcome::Success)) {
            return self.fail_purchase(flow, info, FailureReason::Internal(e.to_string()));
        }

        if self.owned_type(&info).is_owned_after_purchase() {
            self.purchased.insert(info.product_id().clone());
        }

        tracing::info!(backend = %self.kind, product_id = %info.product_id(), "purchase succeeded");
        self.events
            .emit(StoreEvent::PurchaseSucceeded { info, receipt });
        flow.state()
    }

    /// Report a purchase the provider already holds, without `PurchaseStarted`.
    ///
    /// Ids outside the catalog are skipped and return `None`.
    pub async fn confirm_owned(&self, info: PurchaseInfo) -> Option<PurchaseState> {
        if !self.catalog.contains(info.product_id().as_str()) {
            tracing::debug!(backend = %self.kind, product_id = %info.product_id(), "owned product not in catalog");
            return None;
        }
        let mut flow = PurchaseFlow::new(info.product_id());
        if let Err(e) = flow.advance(PurchaseState::Started) {
            tracing::warn!(error = %e, "purchase flow could not start");
            return None;
        }
        Some(self.complete_purchase(&mut flow, info, String::new()).await)
    }

    /// End the purchase as failed and emit `PurchaseFailed`.
    pub fn fail_purchase(
        &self,
        flow: &mut PurchaseFlow,
        info: PurchaseInfo,
        reason: FailureReason,
    ) -> PurchaseState {
        let failed = PurchaseState::Completed(PurchaseOutcome::Failed);
        if flow.advance(failed).is_err() {
            flow.abort();
        }

        tracing::warn!(
            backend = %self.kind,
            product_id = %info.product_id(),
            %reason,
            "purchase failed"
        );
        self.events.emit(StoreEvent::PurchaseFailed { info, reason });
        flow.state()
    }

    async fn gate(
        &self,
        flow: &mut PurchaseFlow,
        info: &PurchaseInfo,
        receipt: &str,
    ) -> std::result::Result<(), FailureReason> {
        if let Some(validator) = &self.validator {
            step(flow, PurchaseState::Validating)?;
            if let ValidationVerdict::Rejected(reason) =
                validator.validate(receipt, info.product_id()).await
            {
                step(flow, PurchaseState::Rejected)?;
                return Err(FailureReason::ValidationRejected(reason));
            }
        }
        step(flow, PurchaseState::Accepted)
    }

    /// Type deciding ownership: provider-reported, then catalog, then non-consumable.
    fn owned_type(&self, info: &PurchaseInfo) -> ProductType {
        info.product_type()
            .or_else(|| self.catalog.product_type(info.product_id().as_str()))
            .unwrap_or(ProductType::NonConsumable)
    }
}

fn step(flow: &mut PurchaseFlow, next: PurchaseState) -> std::result::Result<(), FailureReason> {
    flow.advance(next)
        .map(|_| ())
        .map_err(|e| FailureReason::Internal(e.to_string()))
}
