//! The backend contract shared by every store.

use std::sync::Arc;

use async_trait::async_trait;

use super::BackendKind;
use crate::catalog::ProductCatalog;
use crate::events::{EventEmitter, EventReceiver, StoreEvent};
use crate::purchase::PurchaseInfo;

/// Core trait for store backends.
///
/// Implementations never surface errors from `buy` or restore: provider
/// failures are logged and reported as events or `false`. Purchases started
/// with `buy` always end in exactly one `PurchaseSucceeded` or
/// `PurchaseFailed` event after `PurchaseStarted`.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Catalog the backend was built with.
    fn products(&self) -> &ProductCatalog;

    /// Sending half of the backend's event channel.
    fn events(&self) -> &EventEmitter;

    /// Whether purchases can be made.
    ///
    /// Backends without an initialization step are always ready.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Establish readiness with the provider.
    ///
    /// Completion is reported with [`StoreEvent::Initialized`].
    async fn initialize(&self) {
        self.events().emit(StoreEvent::Initialized { success: true });
    }

    /// Whether the product is owned in this backend instance.
    fn is_purchased(&self, id: &str) -> bool;

    /// Provider-reported localized price.
    fn price(&self, id: &str) -> String;

    /// Provider metadata loaded at initialization.
    fn product_info(&self, id: &str) -> Option<PurchaseInfo> {
        let _ = id;
        None
    }

    /// Start a purchase.
    ///
    /// Silently does nothing if the store is not initialized or the id is not
    /// in the catalog.
    async fn buy(&self, id: &str);

    /// Restore previous purchases and report the single result.
    ///
    /// Returns `true` when the backend has nothing to restore.
    async fn try_restore_purchases(&self) -> bool {
        true
    }

    /// Restore previous purchases, reporting with [`StoreEvent::Restored`].
    async fn restore_purchases(&self) {
        let success = self.try_restore_purchases().await;
        self.events().emit(StoreEvent::Restored { success });
    }

    /// New receiver for this backend's events.
    fn subscribe(&self) -> EventReceiver {
        self.events().subscribe()
    }

    /// Fresh, uninitialized backend sharing catalog, validator and provider.
    fn create_new_instance(&self) -> Arc<dyn StoreBackend>;
}
