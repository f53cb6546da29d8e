//! Purchase records and the per-purchase state machine.

use std::collections::HashSet;
use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{Product, ProductType};
use crate::{ProductId, Result, UniStoreError};

/// Details of one purchase attempt or result.
///
/// Built once through the `with_*` methods and then only read. Each event
/// carries its own copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInfo {
    product_id: ProductId,
    #[serde(default)]
    price: String,
    #[serde(default)]
    currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purchased_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    purchase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    product_type: Option<ProductType>,
}

impl PurchaseInfo {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            price: String::new(),
            currency: String::new(),
            purchased_at: None,
            purchase_id: None,
            product_type: None,
        }
    }

    /// Seed a record from a catalog product.
    pub fn from_product(product: &Product) -> Self {
        Self::new(product.id().clone())
            .with_price(product.price(), product.currency())
            .with_product_type(product.product_type())
    }

    pub fn with_price(mut self, price: impl Into<String>, currency: impl Into<String>) -> Self {
        self.price = price.into();
        self.currency = currency.into();
        self
    }

    pub fn with_purchase_id(mut self, purchase_id: impl Into<String>) -> Self {
        self.purchase_id = Some(purchase_id.into());
        self
    }

    pub fn with_purchased_at(mut self, at: DateTime<Utc>) -> Self {
        self.purchased_at = Some(at);
        self
    }

    pub fn with_product_type(mut self, product_type: ProductType) -> Self {
        self.product_type = Some(product_type);
        self
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Vendor-localized display price.
    pub fn price(&self) -> &str {
        &self.price
    }

    /// ISO currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn purchased_at(&self) -> Option<DateTime<Utc>> {
        self.purchased_at
    }

    /// Provider transaction identifier.
    pub fn purchase_id(&self) -> Option<&str> {
        self.purchase_id.as_deref()
    }

    pub fn product_type(&self) -> Option<ProductType> {
        self.product_type
    }
}

/// Products owned in the current backend instance.
///
/// Append-only: ids are inserted after a purchase passes every gate and are
/// never removed, so readers only ever see the set grow.
#[derive(Debug, Default)]
pub struct PurchasedSet {
    ids: RwLock<HashSet<ProductId>>,
}

impl PurchasedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ownership. Returns true if the id was not owned before.
    pub fn insert(&self, id: ProductId) -> bool {
        let mut ids = self.ids.write().unwrap_or_else(|e| e.into_inner());
        ids.insert(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        let ids = self.ids.read().unwrap_or_else(|e| e.into_inner());
        ids.contains(id)
    }

    pub fn len(&self) -> usize {
        let ids = self.ids.read().unwrap_or_else(|e| e.into_inner());
        ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the owned ids.
    pub fn snapshot(&self) -> Vec<ProductId> {
        let ids = self.ids.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<ProductId> = ids.iter().cloned().collect();
        out.sort();
        out
    }
}

/// Terminal result of a purchase flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Success,
    Failed,
}

/// State of a single purchase.
///
/// ```text
/// Idle -> Started -> Validating -> Accepted -> Completed(Success)
///                              \-> Rejected -> Completed(Failed)
///         Started -> Accepted                       (no validator)
///         Started -> Completed(Failed)              (provider failure)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PurchaseState {
    Idle,
    Started,
    Validating,
    Accepted,
    Rejected,
    Completed(PurchaseOutcome),
}

impl PurchaseState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: PurchaseState) -> bool {
        use PurchaseOutcome::*;
        use PurchaseState::*;

        matches!(
            (self, next),
            (Idle, Started)
                | (Started, Validating)
                | (Started, Accepted)
                | (Started, Completed(Failed))
                | (Validating, Accepted)
                | (Validating, Rejected)
                | (Accepted, Completed(Success))
                | (Rejected, Completed(Failed))
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Started => f.write_str("started"),
            Self::Validating => f.write_str("validating"),
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected => f.write_str("rejected"),
            Self::Completed(PurchaseOutcome::Success) => f.write_str("completed(success)"),
            Self::Completed(PurchaseOutcome::Failed) => f.write_str("completed(failed)"),
        }
    }
}

/// Tracks one purchase through [`PurchaseState`].
#[derive(Clone, Debug)]
pub struct PurchaseFlow {
    product_id: ProductId,
    state: PurchaseState,
}

impl PurchaseFlow {
    pub fn new(product_id: impl Into<ProductId>) -> Self {
        Self {
            product_id: product_id.into(),
            state: PurchaseState::Idle,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn state(&self) -> PurchaseState {
        self.state
    }

    /// Move to `next`, refusing transitions the state machine does not allow.
    pub fn advance(&mut self, next: PurchaseState) -> Result<PurchaseState> {
        if !self.state.can_transition_to(next) {
            return Err(UniStoreError::InvalidTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::trace!(product_id = %self.product_id, from = %self.state, to = %next, "purchase transition");
        self.state = next;
        Ok(next)
    }

    /// Force the flow into `Completed(Failed)`.
    ///
    /// Used when the flow can no longer be driven along a legal path.
    pub fn abort(&mut self) -> PurchaseState {
        self.state = PurchaseState::Completed(PurchaseOutcome::Failed);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PurchaseOutcome::*;
    use PurchaseState::*;

    #[test]
    fn test_purchase_info_builder() {
        let at = Utc::now();
        let info = PurchaseInfo::new("coin_100")
            .with_price("0.99", "USD")
            .with_purchase_id("GPA.1234")
            .with_purchased_at(at)
            .with_product_type(ProductType::Consumable);

        assert_eq!(info.product_id().as_str(), "coin_100");
        assert_eq!(info.price(), "0.99");
        assert_eq!(info.currency(), "USD");
        assert_eq!(info.purchase_id(), Some("GPA.1234"));
        assert_eq!(info.purchased_at(), Some(at));
        assert_eq!(info.product_type(), Some(ProductType::Consumable));
    }

    #[test]
    fn test_purchased_set_is_idempotent() {
        let set = PurchasedSet::new();
        assert!(set.is_empty());
        assert!(set.insert(ProductId::new("no_ads")));
        assert!(!set.insert(ProductId::new("no_ads")));
        assert!(set.contains("no_ads"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.snapshot(), vec![ProductId::new("no_ads")]);
    }

    #[test]
    fn test_flow_with_validation() {
        let mut flow = PurchaseFlow::new("no_ads");
        flow.advance(Started).unwrap();
        flow.advance(Validating).unwrap();
        flow.advance(Accepted).unwrap();
        assert_eq!(flow.advance(Completed(Success)).unwrap(), Completed(Success));
        assert!(flow.state().is_terminal());
    }

    #[test]
    fn test_flow_without_validation_skips_validating() {
        let mut flow = PurchaseFlow::new("coin_100");
        flow.advance(Started).unwrap();
        flow.advance(Accepted).unwrap();
        flow.advance(Completed(Success)).unwrap();
    }

    #[test]
    fn test_rejected_only_completes_as_failed() {
        let mut flow = PurchaseFlow::new("coin_100");
        flow.advance(Started).unwrap();
        flow.advance(Validating).unwrap();
        flow.advance(Rejected).unwrap();
        assert!(flow.advance(Completed(Success)).is_err());
        flow.advance(Completed(Failed)).unwrap();
    }

    #[test]
    fn test_illegal_transitions() {
        let mut flow = PurchaseFlow::new("coin_100");
        let err = flow.advance(Accepted).unwrap_err();
        assert!(err.to_string().contains("idle"));
        flow.advance(Started).unwrap();
        assert!(flow.advance(Completed(Success)).is_err());
        assert!(flow.advance(Rejected).is_err());
        assert_eq!(flow.abort(), Completed(Failed));
        assert!(flow.advance(Started).is_err());
    }
}
