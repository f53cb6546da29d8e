//! In-process store for development builds.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::{BackendCore, BackendKind, StoreBackend};
use crate::catalog::ProductCatalog;
use crate::events::EventEmitter;
use crate::purchase::PurchaseInfo;
use crate::validator::ReceiptValidator;

/// Price reported for every fake product.
pub const FAKE_PRICE: &str = "$0.01 (fake)";

/// Currency reported for every fake product.
pub const FAKE_CURRENCY: &str = "USD";

/// Store that confirms every purchase immediately with an empty receipt.
///
/// # Example
///
/// ```ignore
/// let store = FakeStore::new(Arc::new(catalog), None);
/// let mut events = store.subscribe();
/// store.buy("coin_100").await;
/// ```
pub struct FakeStore {
    core: BackendCore,
}

impl FakeStore {
    pub fn new(catalog: Arc<ProductCatalog>, validator: Option<Arc<dyn ReceiptValidator>>) -> Self {
        Self::from_core(BackendCore::new(BackendKind::Fake, catalog, validator))
    }

    fn from_core(core: BackendCore) -> Self {
        let infos: Vec<PurchaseInfo> = core
            .catalog()
            .iter()
            .map(|product| PurchaseInfo::from_product(product).with_price(FAKE_PRICE, FAKE_CURRENCY))
            .collect();
        core.set_product_infos(infos);
        Self { core }
    }

    /// Ids owned in this instance.
    pub fn purchased(&self) -> Vec<crate::ProductId> {
        self.core.purchased().snapshot()
    }
}

#[async_trait]
impl StoreBackend for FakeStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Fake
    }

    fn products(&self) -> &ProductCatalog {
        self.core.catalog()
    }

    fn events(&self) -> &EventEmitter {
        self.core.events()
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

    #[tracing::instrument(skip(self), fields(backend = "fake"))]
    async fn buy(&self, id: &str) {
        let Some((mut flow, info)) = self.core.start_purchase(id) else {
            return;
        };

        let now = Utc::now();
        let info = info
            .with_purchase_id(format!("fake-{}", now.timestamp_millis()))
            .with_purchased_at(now);
        self.core
            .complete_purchase(&mut flow, info, String::new())
            .await;
    }

    fn create_new_instance(&self) -> Arc<dyn StoreBackend> {
        Arc::new(Self::from_core(self.core.fresh()))
    }
}
