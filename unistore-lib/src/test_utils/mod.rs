//! Test utilities for UniStore.
//!
//! This module provides testing infrastructure including:
//! - Mock provider bindings with configurable outcomes
//! - A validator with a fixed verdict
//! - Test fixtures for a small sample catalog
//! - Assertion helpers over recorded event streams
//!
//! ## Usage
//!
//! ```rust,ignore
//! use unistore_lib::test_utils::{sample_catalog, EventRecorder, MockPurchasingProvider};
//!
//! let provider = Arc::new(MockPurchasingProvider::new());
//! let store = UniversalStore::builder(sample_catalog())
//!     .config(StoreConfig::new(BackendKind::Plugin))
//!     .plugin_provider(provider)
//!     .build()?;
//!
//! let mut events = EventRecorder::new(store.subscribe());
//! store.initialize().await;
//! store.buy("no_ads").await;
//! assert_purchase_succeeded(&events.drain(), "no_ads");
//! ```

mod assertions;
mod fixtures;
mod mocks;

pub use fixtures::{sample_catalog, sample_samsung_products, unified_receipt, TestFixtures};

pub use mocks::{
    EventRecorder, FixedValidator, MockOutcome, MockPurchasingProvider, MockSamsungSdk,
};

pub use assertions::{
    assert_no_purchase_events, assert_purchase_failed, assert_purchase_succeeded, EventAssertion,
};
