//! Product catalog.
//!
//! The catalog is the static list of products the application sells, keyed by
//! [`ProductId`]. It is supplied at construction and never changes afterwards;
//! provider-reported metadata (localized prices) lives in the backends.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProductId, Result, UniStoreError};

/// Lifecycle category of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Can be bought repeatedly; consumed on delivery.
    #[serde(alias = "Consumable")]
    Consumable,
    /// Bought once and owned forever.
    #[serde(alias = "NonConsumable", alias = "non-consumable")]
    NonConsumable,
    /// Recurring entitlement.
    #[serde(alias = "Subscription")]
    Subscription,
}

impl ProductType {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::NonConsumable => "non_consumable",
            Self::Subscription => "subscription",
        }
    }

    /// Whether a confirmed purchase leaves the product owned.
    ///
    /// Consumables are used up on delivery and never enter the purchased set.
    pub fn is_owned_after_purchase(&self) -> bool {
        !matches!(self, Self::Consumable)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = UniStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "consumable" => Ok(Self::Consumable),
            "non_consumable" | "nonconsumable" => Ok(Self::NonConsumable),
            "subscription" => Ok(Self::Subscription),
            other => Err(UniStoreError::invalid_data(
                "product_type",
                format!("unknown product type '{other}'"),
            )),
        }
    }
}

/// A product declared in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    #[serde(rename = "type")]
    product_type: ProductType,
    #[serde(default)]
    price: String,
    #[serde(default)]
    currency: String,
}

impl Product {
    /// Create a product with no display price.
    pub fn new(id: impl Into<ProductId>, product_type: ProductType) -> Self {
        Self {
            id: id.into(),
            product_type,
            price: String::new(),
            currency: String::new(),
        }
    }

    /// Set the display price and ISO currency code.
    pub fn with_price(mut self, price: impl Into<String>, currency: impl Into<String>) -> Self {
        self.price = price.into();
        self.currency = currency.into();
        self
    }

    pub fn id(&self) -> &ProductId {
        &self.id
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }

    /// Display price declared in the catalog (may be empty).
    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

/// Catalog document accepted by [`ProductCatalog::from_json_str`].
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    /// `{ "coin_100": "consumable", "no_ads": "non_consumable" }`
    Types(BTreeMap<String, ProductType>),
    /// `[ { "id": "coin_100", "type": "consumable", "price": "$0.99", "currency": "USD" } ]`
    Products(Vec<Product>),
}

/// Immutable set of products keyed by id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    products: BTreeMap<ProductId, Product>,
}

impl ProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from products, rejecting empty or duplicate ids.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for product in products {
            if product.id.is_empty() {
                return Err(UniStoreError::invalid_data(
                    "product_id",
                    "product id cannot be empty",
                ));
            }
            let id = product.id.clone();
            if map.insert(id.clone(), product).is_some() {
                return Err(UniStoreError::invalid_data(
                    "product_id",
                    format!("duplicate product id '{id}'"),
                ));
            }
        }
        Ok(Self { products: map })
    }

    /// Builds a catalog from `(id, type)` pairs.
    pub fn from_types<I, K>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, ProductType)>,
        K: Into<ProductId>,
    {
        Self::from_products(
            entries
                .into_iter()
                .map(|(id, product_type)| Product::new(id, product_type)),
        )
    }

    /// Parses a catalog from JSON, either an id → type map or a product array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        match serde_json::from_str::<CatalogDocument>(json)? {
            CatalogDocument::Types(types) => Self::from_types(types),
            CatalogDocument::Products(products) => Self::from_products(products),
        }
    }

    /// Reads and parses a JSON catalog file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Gets a product by id.
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.get(id)
    }

    /// Checks if a product id is declared.
    pub fn contains(&self, id: &str) -> bool {
        self.products.contains_key(id)
    }

    /// Declared type of a product.
    pub fn product_type(&self, id: &str) -> Option<ProductType> {
        self.get(id).map(Product::product_type)
    }

    /// All product ids in sorted order.
    pub fn ids(&self) -> Vec<ProductId> {
        self.products.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_from_type_map_json() {
        let catalog = ProductCatalog::from_json_str(
            r#"{"coin_100": "consumable", "no_ads": "NonConsumable", "vip": "subscription"}"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.product_type("coin_100"),
            Some(ProductType::Consumable)
        );
        assert_eq!(
            catalog.product_type("no_ads"),
            Some(ProductType::NonConsumable)
        );
        assert_eq!(catalog.product_type("vip"), Some(ProductType::Subscription));
    }

    #[test]
    fn test_catalog_from_product_array_json() {
        let catalog = ProductCatalog::from_json_str(
            r#"[{"id": "gems_500", "type": "consumable", "price": "$4.99", "currency": "USD"}]"#,
        )
        .unwrap();

        let product = catalog.get("gems_500").unwrap();
        assert_eq!(product.price(), "$4.99");
        assert_eq!(product.currency(), "USD");
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_empty_ids() {
        let dup = ProductCatalog::from_products([
            Product::new("a", ProductType::Consumable),
            Product::new("a", ProductType::NonConsumable),
        ]);
        assert!(dup.is_err());

        let empty = ProductCatalog::from_types([("", ProductType::Consumable)]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_unknown_product_lookup() {
        let catalog = ProductCatalog::from_types([("coin_100", ProductType::Consumable)]).unwrap();
        assert!(catalog.get("missing").is_none());
        assert!(!catalog.contains("missing"));
    }

    #[test]
    fn test_product_type_parsing() {
        assert_eq!(
            "non-consumable".parse::<ProductType>().unwrap(),
            ProductType::NonConsumable
        );
        assert_eq!(
            "Subscription".parse::<ProductType>().unwrap(),
            ProductType::Subscription
        );
        assert!("bundle".parse::<ProductType>().is_err());
        assert!(ProductType::NonConsumable.is_owned_after_purchase());
        assert!(!ProductType::Consumable.is_owned_after_purchase());
    }
}
