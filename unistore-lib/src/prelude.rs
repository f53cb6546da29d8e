//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use unistore_lib::prelude::*;
//! ```
//!
//! ## What's Included
//!
//! - Core types: `ProductId`, `Product`, `ProductCatalog`, `ProductType`, `PurchaseInfo`
//! - Error types: `UniStoreError`, `UniStoreErrorCode`, `Result`
//! - Store: `UniversalStore`, `StoreBackend`, `StoreConfig`, `BackendKind`
//! - Events: `StoreEvent`, `FailureReason`, `EventReceiver`
//! - Validation: `ReceiptValidator`, `HttpValidator`, `ValidatorConfig`

// Core types
pub use crate::catalog::{Product, ProductCatalog, ProductType};
pub use crate::purchase::PurchaseInfo;
pub use crate::ProductId;

// Error handling
pub use crate::errors::{UniStoreError, UniStoreErrorCode};
pub use crate::Result;

// Store
pub use crate::backends::{BackendKind, StoreBackend};
pub use crate::config::StoreConfig;
pub use crate::store::UniversalStore;

// Provider bindings
pub use crate::backends::{PurchasingProvider, SamsungIapSdk};

// Events
pub use crate::events::{EventReceiver, FailureReason, StoreEvent};

// Validation
pub use crate::validator::{
    HttpValidator, ReceiptEncoding, ReceiptValidator, ValidationVerdict, ValidatorConfig,
};
