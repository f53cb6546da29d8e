//! Mock provider bindings, validator and event recording.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::broadcast::error::TryRecvError;

use super::fixtures::sample_samsung_products;
use crate::backends::{
    ConsumeResult, OperationMode, PaymentResult, ProductDefinition, ProviderProduct,
    ProviderPurchase, ProviderReceipt, PurchasingProvider, SamsungIapSdk, SamsungProduct,
    SamsungPurchase,
};
use crate::events::{EventReceiver, StoreEvent};
use crate::validator::{ReceiptValidator, RejectionReason, ValidationVerdict};
use crate::{ProductId, Result, UniStoreError};

/// What [`MockPurchasingProvider`] answers for a product.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockOutcome {
    /// Completed with the given receipt.
    Receipt(String),
    /// Completed without receipt data.
    NoReceipt,
    /// Provider-level failure with a reason.
    Fail(String),
    /// The provider call itself errors.
    Error(String),
}

/// Configurable [`PurchasingProvider`].
///
/// Products complete with receipt `receipt-<id>` unless an outcome was set.
pub struct MockPurchasingProvider {
    prices: RwLock<HashMap<String, (String, String)>>,
    outcomes: RwLock<HashMap<String, MockOutcome>>,
    init_error: Option<String>,
    restore: Option<std::result::Result<bool, String>>,
    ready: AtomicBool,
    registered: RwLock<Vec<ProductDefinition>>,
    purchases: RwLock<Vec<ProductId>>,
    counter: AtomicU64,
}

impl Default for MockPurchasingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPurchasingProvider {
    pub fn new() -> Self {
        Self {
            prices: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(HashMap::new()),
            init_error: None,
            restore: None,
            ready: AtomicBool::new(false),
            registered: RwLock::new(Vec::new()),
            purchases: RwLock::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Report `price` and `currency` for `id` at initialization.
    pub fn with_price(self, id: &str, price: &str, currency: &str) -> Self {
        self.prices
            .write()
            .unwrap()
            .insert(id.to_string(), (price.to_string(), currency.to_string()));
        self
    }

    /// Make `initialize` fail.
    pub fn failing_initialize(mut self, reason: &str) -> Self {
        self.init_error = Some(reason.to_string());
        self
    }

    /// Enable restore support with a fixed result.
    pub fn with_restore(mut self, result: std::result::Result<bool, String>) -> Self {
        self.restore = Some(result);
        self
    }

    pub fn set_outcome(&self, id: &str, outcome: MockOutcome) {
        self.outcomes.write().unwrap().insert(id.to_string(), outcome);
    }

    /// Definitions passed to the last `initialize`.
    pub fn registered(&self) -> Vec<ProductDefinition> {
        self.registered.read().unwrap().clone()
    }

    /// Products a purchase was requested for, in order.
    pub fn purchases(&self) -> Vec<ProductId> {
        self.purchases.read().unwrap().clone()
    }
}

#[async_trait]
impl PurchasingProvider for MockPurchasingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self, products: &[ProductDefinition]) -> Result<Vec<ProviderProduct>> {
        *self.registered.write().unwrap() = products.to_vec();
        if let Some(reason) = &self.init_error {
            return Err(UniStoreError::provider("mock", reason.clone()));
        }
        self.ready.store(true, Ordering::SeqCst);

        let prices = self.prices.read().unwrap();
        Ok(products
            .iter()
            .map(|definition| {
                let (price, currency) = prices
                    .get(definition.id.as_str())
                    .cloned()
                    .unwrap_or_else(|| ("$0.99".to_string(), "USD".to_string()));
                ProviderProduct::new(&definition.id, price)
                    .with_currency(currency)
                    .with_product_type(definition.product_type)
            })
            .collect())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn purchase(&self, product_id: &ProductId) -> Result<ProviderPurchase> {
        self.purchases.write().unwrap().push(product_id.clone());
        let outcome = self
            .outcomes
            .read()
            .unwrap()
            .get(product_id.as_str())
            .cloned()
            .unwrap_or_else(|| MockOutcome::Receipt(format!("receipt-{product_id}")));

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        match outcome {
            MockOutcome::Receipt(receipt) => Ok(ProviderPurchase::Completed(
                ProviderReceipt::new(receipt).with_transaction_id(format!("txn-{n}")),
            )),
            MockOutcome::NoReceipt => Ok(ProviderPurchase::Completed(ProviderReceipt::empty())),
            MockOutcome::Fail(reason) => Ok(ProviderPurchase::Failed { reason }),
            MockOutcome::Error(message) => Err(UniStoreError::provider("mock", message)),
        }
    }

    fn supports_restore(&self) -> bool {
        self.restore.is_some()
    }

    async fn restore(&self) -> Result<bool> {
        match &self.restore {
            Some(Ok(restored)) => Ok(*restored),
            Some(Err(message)) => Err(UniStoreError::provider("mock", message.clone())),
            None => Ok(true),
        }
    }
}

/// In-memory [`SamsungIapSdk`] seeded with [`sample_samsung_products`].
pub struct MockSamsungSdk {
    available: bool,
    products: RwLock<HashMap<String, SamsungProduct>>,
    payment_overrides: RwLock<HashMap<String, PaymentResult>>,
    owned: RwLock<Vec<SamsungPurchase>>,
    mode: RwLock<Option<OperationMode>>,
    payments: RwLock<Vec<(String, String)>>,
    consumed: RwLock<Vec<String>>,
    counter: AtomicU64,
}

impl Default for MockSamsungSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSamsungSdk {
    pub fn new() -> Self {
        let products = sample_samsung_products()
            .into_iter()
            .map(|p| (p.item_id.clone(), p))
            .collect();
        Self {
            available: true,
            products: RwLock::new(products),
            payment_overrides: RwLock::new(HashMap::new()),
            owned: RwLock::new(Vec::new()),
            mode: RwLock::new(None),
            payments: RwLock::new(Vec::new()),
            consumed: RwLock::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Bootstrap reports no SDK instance.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_product(self, product: SamsungProduct) -> Self {
        self.products
            .write()
            .unwrap()
            .insert(product.item_id.clone(), product);
        self
    }

    /// Answer payments for `id` with `result`.
    pub fn fail_payment(&self, id: &str, result: PaymentResult) {
        self.payment_overrides
            .write()
            .unwrap()
            .insert(id.to_string(), result);
    }

    /// Mark `id` as already owned by the account.
    pub fn add_owned(&self, id: &str) {
        let purchase = self.purchase_for(id, "");
        self.owned.write().unwrap().push(purchase);
    }

    pub fn operation_mode(&self) -> Option<OperationMode> {
        *self.mode.read().unwrap()
    }

    /// `(item_id, pass_through_param)` of every payment started.
    pub fn payments(&self) -> Vec<(String, String)> {
        self.payments.read().unwrap().clone()
    }

    /// Purchase ids consumed so far.
    pub fn consumed(&self) -> Vec<String> {
        self.consumed.read().unwrap().clone()
    }

    fn purchase_for(&self, id: &str, pass_through_param: &str) -> SamsungPurchase {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let product = self.products.read().unwrap().get(id).cloned();
        let product = product.unwrap_or_else(|| SamsungProduct {
            item_id: id.to_string(),
            consumable_yn: "N".to_string(),
            item_type: "item".to_string(),
            ..SamsungProduct::default()
        });
        SamsungPurchase {
            item_id: product.item_id,
            purchase_id: format!("samsung-{n}"),
            item_price_string: product.item_price_string,
            currency_code: product.currency_code,
            item_type: product.item_type,
            consumable_yn: product.consumable_yn,
            pass_through_param: pass_through_param.to_string(),
        }
    }
}

#[async_trait]
impl SamsungIapSdk for MockSamsungSdk {
    async fn bootstrap(&self) -> Result<bool> {
        Ok(self.available)
    }

    fn set_operation_mode(&self, mode: OperationMode) -> Result<()> {
        *self.mode.write().unwrap() = Some(mode);
        Ok(())
    }

    async fn product_details(&self, item_ids: &[ProductId]) -> Result<Vec<SamsungProduct>> {
        let products = self.products.read().unwrap();
        Ok(item_ids
            .iter()
            .filter_map(|id| products.get(id.as_str()).cloned())
            .collect())
    }

    async fn start_payment(
        &self,
        item_id: &str,
        pass_through_param: &str,
    ) -> Result<PaymentResult> {
        self.payments
            .write()
            .unwrap()
            .push((item_id.to_string(), pass_through_param.to_string()));
        let override_result = self.payment_overrides.read().unwrap().get(item_id).cloned();
        Ok(override_result
            .unwrap_or_else(|| PaymentResult::success(self.purchase_for(item_id, pass_through_param))))
    }

    async fn consume_purchased_items(&self, purchase_ids: &[String]) -> Result<Vec<ConsumeResult>> {
        self.consumed
            .write()
            .unwrap()
            .extend(purchase_ids.iter().cloned());
        Ok(purchase_ids
            .iter()
            .map(|id| ConsumeResult {
                purchase_id: id.clone(),
                status_code: 0,
                status_string: "success".to_string(),
            })
            .collect())
    }

    async fn owned_products(&self) -> Result<Vec<SamsungPurchase>> {
        Ok(self.owned.read().unwrap().clone())
    }
}

/// Validator answering every receipt with the same verdict.
pub struct FixedValidator {
    verdict: ValidationVerdict,
    receipts: Mutex<Vec<String>>,
}

impl FixedValidator {
    pub fn new(verdict: ValidationVerdict) -> Self {
        Self {
            verdict,
            receipts: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(ValidationVerdict::Accepted)
    }

    /// Rejects as if the service answered with `status`.
    pub fn rejecting(status: &str) -> Self {
        Self::new(ValidationVerdict::Rejected(RejectionReason::Status(
            status.to_string(),
        )))
    }

    /// Receipts submitted so far.
    pub fn receipts(&self) -> Vec<String> {
        self.receipts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.receipts.lock().unwrap().len()
    }
}

#[async_trait]
impl ReceiptValidator for FixedValidator {
    async fn validate(&self, receipt: &str, _product_id: &ProductId) -> ValidationVerdict {
        self.receipts.lock().unwrap().push(receipt.to_string());
        self.verdict.clone()
    }
}

/// Collects events from a store subscription.
pub struct EventRecorder {
    receiver: EventReceiver,
}

impl EventRecorder {
    pub fn new(receiver: EventReceiver) -> Self {
        Self { receiver }
    }

    /// Wait for the next event. `None` once the channel is closed.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.receiver.recv().await.ok()
    }

    /// Every event currently buffered, oldest first.
    pub fn drain(&mut self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        events
    }

    /// Names of every buffered event.
    pub fn drain_names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(StoreEvent::name).collect()
    }
}
