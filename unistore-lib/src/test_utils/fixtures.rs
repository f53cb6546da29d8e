//! Test fixtures and data generators.

use crate::backends::SamsungProduct;
use crate::catalog::{Product, ProductCatalog, ProductType};

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Consumable product in [`sample_catalog`].
    pub const CONSUMABLE: &'static str = "coin_100";
    /// Non-consumable product in [`sample_catalog`].
    pub const NON_CONSUMABLE: &'static str = "no_ads";
    /// Subscription product in [`sample_catalog`].
    pub const SUBSCRIPTION: &'static str = "vip_monthly";

    pub const BUNDLE_ID: &'static str = "com.example.game";
    pub const USER_ID: &'static str = "device-0001";

    /// An opaque store receipt.
    pub const SAMPLE_RECEIPT: &'static str = "MIIT0gYJKoZIhvcNAQcCoIITwzCCE78CAQExCzAJBgUrDgMCGgUA";
}

/// Three products, one of each type.
pub fn sample_catalog() -> ProductCatalog {
    ProductCatalog::from_products([
        Product::new(TestFixtures::CONSUMABLE, ProductType::Consumable).with_price("$0.99", "USD"),
        Product::new(TestFixtures::NON_CONSUMABLE, ProductType::NonConsumable)
            .with_price("$2.99", "USD"),
        Product::new(TestFixtures::SUBSCRIPTION, ProductType::Subscription)
            .with_price("$4.99", "USD"),
    ])
    .expect("sample catalog has unique ids")
}

/// SDK product details matching [`sample_catalog`].
pub fn sample_samsung_products() -> Vec<SamsungProduct> {
    vec![
        samsung_product(TestFixtures::CONSUMABLE, "₩1,200", "item", "Y"),
        samsung_product(TestFixtures::NON_CONSUMABLE, "₩3,500", "item", "N"),
        samsung_product(TestFixtures::SUBSCRIPTION, "₩5,900", "subscription", "N"),
    ]
}

fn samsung_product(id: &str, price: &str, item_type: &str, consumable_yn: &str) -> SamsungProduct {
    SamsungProduct {
        item_id: id.to_string(),
        item_name: id.replace('_', " "),
        item_price_string: price.to_string(),
        currency_code: "KRW".to_string(),
        item_type: item_type.to_string(),
        consumable_yn: consumable_yn.to_string(),
    }
}

/// Unified receipt envelope wrapping `payload`.
pub fn unified_receipt(payload: &str) -> String {
    serde_json::json!({
        "Store": "GooglePlay",
        "TransactionID": "GPA.3372-1234-5678-90123",
        "Payload": payload,
    })
    .to_string()
}
