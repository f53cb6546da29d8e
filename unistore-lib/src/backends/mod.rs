//! Store backends.
//!
//! Each backend adapts one purchasing provider to the [`StoreBackend`]
//! contract. The shared purchase gate (validation, ownership, events) lives in
//! [`BackendCore`], so every backend reports outcomes the same way.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                UniversalStore                 │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │        Arc<dyn StoreBackend>            │  │
//! │  │  - FakeStore     (no provider)          │  │
//! │  │  - PluginStore   (PurchasingProvider)   │  │
//! │  │  - SamsungStore  (SamsungIapSdk)        │  │
//! │  │                                         │  │
//! │  │  BackendCore: catalog, validator,       │  │
//! │  │  purchased set, product infos, events   │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```

mod base;
mod fake;
mod plugin;
mod samsung;
mod traits;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, UniStoreError};

pub use base::BackendCore;
pub use fake::{FakeStore, FAKE_CURRENCY, FAKE_PRICE};
pub use plugin::{
    PluginStore, PluginStoreOptions, ProductDefinition, ProviderProduct, ProviderPurchase,
    ProviderReceipt, PurchasingProvider,
};
pub use samsung::{
    ConsumeResult, OperationMode, PaymentResult, SamsungErrorInfo, SamsungIapSdk, SamsungProduct,
    SamsungPurchase, SamsungStore, SamsungStoreOptions,
};
pub use traits::StoreBackend;

/// Which backend a store is built on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process store that confirms every purchase.
    #[default]
    Fake,
    /// Generic purchasing plugin.
    Plugin,
    /// Samsung in-app purchase SDK.
    Samsung,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fake => "fake",
            Self::Plugin => "plugin",
            Self::Samsung => "samsung",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = UniStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fake" => Ok(Self::Fake),
            "plugin" | "unity" => Ok(Self::Plugin),
            "samsung" => Ok(Self::Samsung),
            other => Err(UniStoreError::invalid_data(
                "backend",
                format!("unknown backend '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("Samsung".parse::<BackendKind>().unwrap(), BackendKind::Samsung);
        assert_eq!(" plugin ".parse::<BackendKind>().unwrap(), BackendKind::Plugin);
        assert!("huawei".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::default(), BackendKind::Fake);
    }

    #[test]
    fn test_backend_kind_serde() {
        let kind: BackendKind = serde_json::from_str("\"plugin\"").unwrap();
        assert_eq!(kind, BackendKind::Plugin);
        assert_eq!(serde_json::to_string(&BackendKind::Fake).unwrap(), "\"fake\"");
    }
}
