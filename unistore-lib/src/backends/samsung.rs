//! Backend over the Samsung in-app purchase SDK.
//!
//! The SDK binding is supplied by the application as a [`SamsungIapSdk`].
//! Payments produce no receipt, so they pass the common gate with an empty
//! receipt; consumable items are consumed after a successful purchase.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{BackendCore, BackendKind, StoreBackend, FAKE_PRICE};
use crate::catalog::{ProductCatalog, ProductType};
use crate::events::{EventEmitter, FailureReason, StoreEvent};
use crate::purchase::{PurchaseInfo, PurchaseOutcome, PurchaseState};
use crate::validator::ReceiptValidator;
use crate::{ProductId, Result, UniStoreError};

/// SDK operation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    Production,
    /// Purchases always succeed without charging.
    Test,
    /// Purchases always fail.
    TestFailure,
}

impl OperationMode {
    /// Name the SDK expects.
    pub fn as_sdk_str(&self) -> &'static str {
        match self {
            Self::Production => "OPERATION_MODE_PRODUCTION",
            Self::Test => "OPERATION_MODE_TEST",
            Self::TestFailure => "OPERATION_MODE_TEST_FAILURE",
        }
    }

    /// `Test` in debug builds, `Production` otherwise.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Test
        } else {
            Self::Production
        }
    }
}

/// Map the SDK's type fields to a [`ProductType`].
fn product_type(item_type: &str, consumable_yn: &str) -> ProductType {
    match item_type {
        "subscription" => ProductType::Subscription,
        _ if consumable_yn == "Y" => ProductType::Consumable,
        _ => ProductType::NonConsumable,
    }
}

/// Product details as reported by the SDK.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsungProduct {
    #[serde(rename = "mItemId")]
    pub item_id: String,
    #[serde(rename = "mItemName", default)]
    pub item_name: String,
    #[serde(rename = "mItemPriceString", default)]
    pub item_price_string: String,
    #[serde(rename = "mCurrencyCode", default)]
    pub currency_code: String,
    #[serde(rename = "mType", default)]
    pub item_type: String,
    #[serde(rename = "mConsumableYN", default)]
    pub consumable_yn: String,
}

impl SamsungProduct {
    pub fn product_type(&self) -> ProductType {
        product_type(&self.item_type, &self.consumable_yn)
    }

    fn to_info(&self) -> PurchaseInfo {
        PurchaseInfo::new(self.item_id.as_str())
            .with_price(self.item_price_string.clone(), self.currency_code.clone())
            .with_product_type(self.product_type())
    }
}

/// A purchased or owned item as reported by the SDK.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsungPurchase {
    #[serde(rename = "mItemId")]
    pub item_id: String,
    #[serde(rename = "mPurchaseId", default)]
    pub purchase_id: String,
    #[serde(rename = "mItemPriceString", default)]
    pub item_price_string: String,
    #[serde(rename = "mCurrencyCode", default)]
    pub currency_code: String,
    #[serde(rename = "mType", default)]
    pub item_type: String,
    #[serde(rename = "mConsumableYN", default)]
    pub consumable_yn: String,
    #[serde(rename = "mPassThroughParam", default)]
    pub pass_through_param: String,
}

impl SamsungPurchase {
    pub fn product_type(&self) -> ProductType {
        product_type(&self.item_type, &self.consumable_yn)
    }

    pub fn is_consumable(&self) -> bool {
        self.consumable_yn == "Y"
    }

    fn to_info(&self) -> PurchaseInfo {
        let info = PurchaseInfo::new(self.item_id.as_str())
            .with_price(self.item_price_string.clone(), self.currency_code.clone())
            .with_product_type(self.product_type())
            .with_purchased_at(Utc::now());
        if self.purchase_id.is_empty() {
            info
        } else {
            info.with_purchase_id(self.purchase_id.clone())
        }
    }

    /// The started purchase record, completed with what the SDK reported.
    fn complete(&self, started: PurchaseInfo) -> PurchaseInfo {
        let product_type = started
            .product_type()
            .unwrap_or_else(|| self.product_type());
        let info = started
            .with_price(self.item_price_string.clone(), self.currency_code.clone())
            .with_product_type(product_type)
            .with_purchased_at(Utc::now());
        if self.purchase_id.is_empty() {
            info
        } else {
            info.with_purchase_id(self.purchase_id.clone())
        }
    }
}

/// Error block of a payment result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsungErrorInfo {
    #[serde(rename = "errorCode")]
    pub error_code: i32,
    #[serde(rename = "errorString", default)]
    pub error_string: String,
}

/// Result of `start_payment`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    #[serde(rename = "errorInfo", default)]
    pub error_info: Option<SamsungErrorInfo>,
    #[serde(default)]
    pub results: Option<SamsungPurchase>,
}

impl PaymentResult {
    pub fn success(purchase: SamsungPurchase) -> Self {
        Self {
            error_info: Some(SamsungErrorInfo::default()),
            results: Some(purchase),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            error_info: Some(SamsungErrorInfo {
                error_code: code,
                error_string: message.into(),
            }),
            results: None,
        }
    }

    /// Error code; a result without error info counts as failed.
    pub fn error_code(&self) -> i32 {
        self.error_info.as_ref().map_or(1, |e| e.error_code)
    }

    fn failure_reason(&self) -> String {
        match &self.error_info {
            Some(info) if !info.error_string.is_empty() => info.error_string.clone(),
            _ => format!("payment error code {}", self.error_code()),
        }
    }
}

/// Result of consuming one purchase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeResult {
    #[serde(rename = "mPurchaseId")]
    pub purchase_id: String,
    #[serde(rename = "mStatusCode", default)]
    pub status_code: i32,
    #[serde(rename = "mStatusString", default)]
    pub status_string: String,
}

/// Binding to the Samsung IAP SDK.
#[async_trait]
pub trait SamsungIapSdk: Send + Sync {
    /// Start the SDK. Returns whether an SDK instance is available.
    async fn bootstrap(&self) -> Result<bool>;

    fn set_operation_mode(&self, mode: OperationMode) -> Result<()>;

    async fn product_details(&self, item_ids: &[ProductId]) -> Result<Vec<SamsungProduct>>;

    async fn start_payment(&self, item_id: &str, pass_through_param: &str)
        -> Result<PaymentResult>;

    async fn consume_purchased_items(&self, purchase_ids: &[String]) -> Result<Vec<ConsumeResult>>;

    async fn owned_products(&self) -> Result<Vec<SamsungPurchase>>;
}

/// Behavior switches for [`SamsungStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsungStoreOptions {
    /// Overrides the build-dependent mode from [`OperationMode::for_build`].
    #[serde(default)]
    pub operation_mode: Option<OperationMode>,
    /// Value sent with every payment and expected back in its result.
    #[serde(default)]
    pub pass_through_param: String,
}

impl SamsungStoreOptions {
    pub fn effective_mode(&self) -> OperationMode {
        self.operation_mode.unwrap_or_else(OperationMode::for_build)
    }
}

/// Store backed by a [`SamsungIapSdk`].
pub struct SamsungStore {
    core: BackendCore,
    sdk: Arc<dyn SamsungIapSdk>,
    options: SamsungStoreOptions,
    sdk_ready: AtomicBool,
}

impl SamsungStore {
    pub fn new(
        catalog: Arc<ProductCatalog>,
        validator: Option<Arc<dyn ReceiptValidator>>,
        sdk: Arc<dyn SamsungIapSdk>,
    ) -> Self {
        Self::from_core(
            BackendCore::new(BackendKind::Samsung, catalog, validator),
            sdk,
            SamsungStoreOptions::default(),
        )
    }

    fn from_core(core: BackendCore, sdk: Arc<dyn SamsungIapSdk>, options: SamsungStoreOptions) -> Self {
        Self {
            core,
            sdk,
            options,
            sdk_ready: AtomicBool::new(false),
        }
    }

    pub fn with_options(mut self, options: SamsungStoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SamsungStoreOptions {
        &self.options
    }

    async fn load_product_details(&self) {
        let ids = self.core.catalog().ids();
        match self.sdk.product_details(&ids).await {
            Ok(products) => {
                tracing::debug!(count = products.len(), "samsung product details");
                self.core
                    .set_product_infos(products.iter().map(SamsungProduct::to_info));
            }
            Err(e) => tracing::warn!(error = %e, "failed to load samsung product details"),
        }
    }

    async fn consume(&self, purchase_id: &str) {
        match self
            .sdk
            .consume_purchased_items(&[purchase_id.to_string()])
            .await
        {
            Ok(results) => {
                for result in results {
                    tracing::debug!(
                        purchase_id = %result.purchase_id,
                        status = result.status_code,
                        "consumed purchase"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, purchase_id, "failed to consume purchase"),
        }
    }

    /// Report every product the account already owns as a successful purchase.
    ///
    /// Returns how many owned products passed the purchase gate.
    #[tracing::instrument(skip(self))]
    pub async fn sync_owned_products(&self) -> usize {
        if !self.is_initialized() {
            tracing::debug!("owned products sync ignored: store not initialized");
            return 0;
        }
        let owned = match self.sdk.owned_products().await {
            Ok(owned) => owned,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list owned products");
                return 0;
            }
        };

        let mut confirmed = 0;
        for purchase in owned {
            let state = self.core.confirm_owned(purchase.to_info()).await;
            if state == Some(PurchaseState::Completed(PurchaseOutcome::Success)) {
                confirmed += 1;
            }
        }
        confirmed
    }
}

#[async_trait]
impl StoreBackend for SamsungStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Samsung
    }

    fn products(&self) -> &ProductCatalog {
        self.core.catalog()
    }

    fn events(&self) -> &EventEmitter {
        self.core.events()
    }

    fn is_initialized(&self) -> bool {
        self.sdk_ready.load(Ordering::Acquire)
    }

    #[tracing::instrument(skip(self), fields(backend = "samsung"))]
    async fn initialize(&self) {
        let ready = match self.sdk.bootstrap().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!(error = %e, "samsung sdk bootstrap failed");
                false
            }
        };

        if ready {
            let mode = self.options.effective_mode();
            if let Err(e) = self.sdk.set_operation_mode(mode) {
                tracing::warn!(error = %e, mode = mode.as_sdk_str(), "failed to set operation mode");
            }
        }
        self.sdk_ready.store(ready, Ordering::Release);
        tracing::info!(ready, "samsung store initialized");
        self.core
            .events()
            .emit(StoreEvent::Initialized { success: ready });

        if ready {
            self.load_product_details().await;
        }
    }

    fn is_purchased(&self, id: &str) -> bool {
        self.core.is_purchased(id)
    }

    fn price(&self, id: &str) -> String {
        self.core.price_or(id, FAKE_PRICE)
    }

    fn product_info(&self, id: &str) -> Option<PurchaseInfo> {
        self.core.product_info(id)
    }

    #[tracing::instrument(skip(self), fields(backend = "samsung"))]
    async fn buy(&self, id: &str) {
        if !self.is_initialized() {
            tracing::debug!(product_id = id, reason = %UniStoreError::NotInitialized, "buy ignored");
            return;
        }
        let Some((mut flow, info)) = self.core.start_purchase(id) else {
            return;
        };

        let result = match self
            .sdk
            .start_payment(id, &self.options.pass_through_param)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "samsung payment error");
                self.core
                    .fail_purchase(&mut flow, info, FailureReason::Provider(e.to_string()));
                return;
            }
        };

        if result.error_code() != 0 {
            let reason = result.failure_reason();
            self.core
                .fail_purchase(&mut flow, info, FailureReason::Provider(reason));
            return;
        }
        let Some(purchase) = result.results else {
            self.core.fail_purchase(
                &mut flow,
                info,
                FailureReason::Provider("payment returned no purchase details".into()),
            );
            return;
        };

        if purchase.item_id != id {
            tracing::warn!(
                product_id = id,
                reported = %purchase.item_id,
                "payment reported a different item"
            );
            let reason = format!(
                "payment reported item '{}' for '{}'",
                purchase.item_id, id
            );
            self.core
                .fail_purchase(&mut flow, info, FailureReason::Provider(reason));
            return;
        }

        if purchase.pass_through_param != self.options.pass_through_param {
            tracing::debug!(
                expected = %self.options.pass_through_param,
                actual = %purchase.pass_through_param,
                "pass-through parameter mismatch"
            );
        }

        let state = self
            .core
            .complete_purchase(&mut flow, purchase.complete(info), String::new())
            .await;
        if state == PurchaseState::Completed(PurchaseOutcome::Success) && purchase.is_consumable() {
            self.consume(&purchase.purchase_id).await;
        }
    }

    fn create_new_instance(&self) -> Arc<dyn StoreBackend> {
        Arc::new(Self::from_core(
            self.core.fresh(),
            Arc::clone(&self.sdk),
            self.options.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_catalog, FixedValidator, MockSamsungSdk};

    fn store(sdk: Arc<MockSamsungSdk>) -> SamsungStore {
        SamsungStore::new(Arc::new(sample_catalog()), None, sdk)
    }

    #[test]
    fn test_product_type_mapping() {
        assert_eq!(product_type("subscription", "Y"), ProductType::Subscription);
        assert_eq!(product_type("item", "Y"), ProductType::Consumable);
        assert_eq!(product_type("item", "N"), ProductType::NonConsumable);
        assert_eq!(product_type("", ""), ProductType::NonConsumable);
    }

    #[test]
    fn test_payment_result_without_error_info_is_failure() {
        assert_eq!(PaymentResult::default().error_code(), 1);
        assert_eq!(PaymentResult::success(SamsungPurchase::default()).error_code(), 0);
    }

    #[test]
    fn test_purchase_deserializes_sdk_names() {
        let purchase: SamsungPurchase = serde_json::from_str(
            r#"{"mItemId":"coin_100","mPurchaseId":"p-1","mConsumableYN":"Y","mType":"item"}"#,
        )
        .unwrap();
        assert_eq!(purchase.item_id, "coin_100");
        assert!(purchase.is_consumable());
        assert_eq!(purchase.product_type(), ProductType::Consumable);
    }

    #[tokio::test]
    async fn test_initialize_sets_mode_and_loads_details() {
        let sdk = Arc::new(MockSamsungSdk::new());
        let store = store(sdk.clone()).with_options(SamsungStoreOptions {
            operation_mode: Some(OperationMode::Production),
            pass_through_param: String::new(),
        });
        let mut rx = store.subscribe();

        assert!(!store.is_initialized());
        store.initialize().await;

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Initialized { success: true });
        assert!(store.is_initialized());
        assert_eq!(sdk.operation_mode(), Some(OperationMode::Production));
        assert_ne!(store.price("coin_100"), FAKE_PRICE);
        assert_eq!(store.price("missing"), FAKE_PRICE);
    }

    #[tokio::test]
    async fn test_consumable_purchase_is_consumed() {
        let sdk = Arc::new(MockSamsungSdk::new());
        let store = store(sdk.clone());
        store.initialize().await;
        let mut rx = store.subscribe();

        store.buy("coin_100").await;

        assert_eq!(rx.try_recv().unwrap().name(), "purchase_started");
        match rx.try_recv().unwrap() {
            StoreEvent::PurchaseSucceeded { info, receipt } => {
                assert_eq!(info.product_id().as_str(), "coin_100");
                assert!(receipt.is_empty());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(sdk.consumed().len(), 1);
        assert!(!store.is_purchased("coin_100"));
    }

    #[tokio::test]
    async fn test_non_consumable_is_owned_and_not_consumed() {
        let sdk = Arc::new(MockSamsungSdk::new());
        let store = store(sdk.clone());
        store.initialize().await;

        store.buy("no_ads").await;

        assert!(store.is_purchased("no_ads"));
        assert!(sdk.consumed().is_empty());
    }

    #[tokio::test]
    async fn test_payment_error_fails_purchase() {
        let sdk = Arc::new(MockSamsungSdk::new());
        sdk.fail_payment("no_ads", PaymentResult::error(-1003, "already purchased"));
        let store = store(sdk);
        store.initialize().await;
        let mut rx = store.subscribe();

        store.buy("no_ads").await;

        rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            StoreEvent::PurchaseFailed { reason, .. } => {
                assert_eq!(reason, FailureReason::Provider("already purchased".into()))
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!store.is_purchased("no_ads"));
    }

    #[tokio::test]
    async fn test_rejecting_validator_blocks_ownership() {
        let sdk = Arc::new(MockSamsungSdk::new());
        let store = SamsungStore::new(
            Arc::new(sample_catalog()),
            Some(Arc::new(FixedValidator::rejecting("1"))),
            sdk.clone(),
        );
        store.initialize().await;
        let mut rx = store.subscribe();

        store.buy("coin_100").await;

        assert_eq!(rx.try_recv().unwrap().name(), "purchase_started");
        match rx.try_recv().unwrap() {
            StoreEvent::PurchaseFailed { info, reason } => {
                assert_eq!(info.product_id().as_str(), "coin_100");
                assert!(matches!(reason, FailureReason::ValidationRejected(_)));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        assert!(!store.is_purchased("coin_100"));
        assert!(sdk.consumed().is_empty());
    }

    #[tokio::test]
    async fn test_payment_for_other_item_fails_requested_purchase() {
        let sdk = Arc::new(MockSamsungSdk::new());
        sdk.fail_payment(
            "no_ads",
            PaymentResult::success(SamsungPurchase {
                item_id: "vip_monthly".into(),
                purchase_id: "samsung-99".into(),
                item_type: "subscription".into(),
                ..Default::default()
            }),
        );
        let store = store(sdk);
        store.initialize().await;
        let mut rx = store.subscribe();

        store.buy("no_ads").await;

        assert_eq!(rx.try_recv().unwrap().name(), "purchase_started");
        match rx.try_recv().unwrap() {
            StoreEvent::PurchaseFailed { info, reason } => {
                assert_eq!(info.product_id().as_str(), "no_ads");
                assert!(matches!(reason, FailureReason::Provider(_)));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());
        assert!(!store.is_purchased("no_ads"));
        assert!(!store.is_purchased("vip_monthly"));
    }

    #[tokio::test]
    async fn test_success_event_keeps_requested_id_and_sdk_details() {
        let sdk = Arc::new(MockSamsungSdk::new());
        let store = store(sdk);
        store.initialize().await;
        let mut rx = store.subscribe();

        store.buy("no_ads").await;

        rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            StoreEvent::PurchaseSucceeded { info, .. } => {
                assert_eq!(info.product_id().as_str(), "no_ads");
                assert_eq!(info.product_type(), Some(ProductType::NonConsumable));
                assert!(info.purchase_id().is_some());
                assert!(info.purchased_at().is_some());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sync_owned_products() {
        let sdk = Arc::new(MockSamsungSdk::new());
        sdk.add_owned("no_ads");
        sdk.add_owned("not_in_catalog");
        let store = store(sdk);
        store.initialize().await;
        let mut rx = store.subscribe();

        assert_eq!(store.sync_owned_products().await, 1);
        assert!(store.is_purchased("no_ads"));
        assert_eq!(rx.try_recv().unwrap().name(), "purchase_succeeded");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unavailable_sdk() {
        let sdk = Arc::new(MockSamsungSdk::new().unavailable());
        let store = store(sdk.clone());
        let mut rx = store.subscribe();

        store.initialize().await;

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Initialized { success: false });
        assert!(!store.is_initialized());
        assert_eq!(sdk.operation_mode(), None);
        store.buy("no_ads").await;
        assert!(rx.try_recv().is_err());
        assert!(store.try_restore_purchases().await);
    }
}
