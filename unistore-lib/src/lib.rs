//! UniStore library.
//!
//! A single purchasing interface over several in-app-purchase backends. The
//! application talks to [`UniversalStore`]; the store delegates to exactly one
//! [`StoreBackend`] chosen from deployment configuration and reports every
//! outcome on an event channel.
//!
//! # Features
//!
//! - **Backends**: fake store, generic purchasing plugin, Samsung IAP SDK
//! - **Receipt validation**: remote HTTP validation with pluggable receipt encodings
//! - **Event surface**: initialization, purchase started/succeeded/failed, restore
//!
//! # Example
//!
//! ```ignore
//! use unistore_lib::prelude::*;
//!
//! let catalog = ProductCatalog::from_types([("coin_100", ProductType::Consumable)])?;
//! let store = UniversalStore::builder(catalog)
//!     .config(StoreConfig::default())
//!     .build()?;
//!
//! let mut events = store.subscribe();
//! store.initialize().await;
//! store.buy("coin_100").await;
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("{}", event.name());
//! }
//! ```

use std::borrow::Borrow;

pub mod backends;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod events;
pub mod prelude;
pub mod purchase;
pub mod store;
pub mod validator;

/// Test utilities for purchase flow testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backends::{BackendKind, StoreBackend};
pub use catalog::{Product, ProductCatalog, ProductType};
pub use config::StoreConfig;
pub use errors::{UniStoreError, UniStoreErrorCode};
pub use events::{EventReceiver, FailureReason, StoreEvent};
pub use purchase::PurchaseInfo;
pub use store::UniversalStore;

/// Common result alias for UniStore operations.
pub type Result<T> = std::result::Result<T, UniStoreError>;

/// Identifier of a product in the catalog.
///
/// # Example
///
/// ```
/// use unistore_lib::ProductId;
///
/// let id: ProductId = "coin_100".into();
/// assert_eq!(id.as_str(), "coin_100");
/// assert_eq!(id, ProductId::new("coin_100"));
/// ```
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    /// Create a new ProductId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identifier is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&ProductId> for ProductId {
    fn from(id: &ProductId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn product_id_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(ProductId::new("gem_pack"), 3);
        assert_eq!(map.get("gem_pack"), Some(&3));
    }

    #[test]
    fn product_id_serializes_transparently() {
        let id = ProductId::new("no_ads");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"no_ads\"");
        let back: ProductId = serde_json::from_str("\"no_ads\"").unwrap();
        assert_eq!(back, id);
    }
}
