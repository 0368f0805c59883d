//! # Product Types
//!
//! Catalog types for the storefront. The seed catalog is loaded from
//! `config/products.toml`; Admin/Seller users may add products at runtime.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported currencies (ISO 4217). A deployment fixes a single currency
/// for all payment sessions via `AppConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
        }
    }

    /// Parse a currency code as configured in the environment
    pub fn from_code(code: &str) -> Option<Currency> {
        match code.to_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            "jpy" => Some(Currency::JPY),
            _ => None,
        }
    }

    /// Number of decimal places (JPY has 0, the others 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, etc.)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for USD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a price from a decimal amount (9.99 USD becomes 999 cents)
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price directly from minor units
    pub fn from_minor(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
        };
        if self.currency.decimal_places() == 0 {
            format!("{}{}", symbol, self.amount)
        } else {
            format!("{}{:.2}", symbol, self.as_decimal())
        }
    }
}

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product id
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Unit price
    pub unit_price: Price,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    /// Whether this product is available for purchase
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create a new active product with a generated id
    pub fn new(name: impl Into<String>, unit_price: Price) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            unit_price,
            stock: 0,
            active: true,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set stock level
    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = stock;
        self
    }
}

/// Product catalog (seeded from config, mutable at runtime)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) -> StoreResult<()> {
        if self.products.iter().any(|p| p.id == product.id) {
            return Err(StoreError::Validation(format!(
                "duplicate product id: {}",
                product.id
            )));
        }
        if product.name.trim().is_empty() {
            return Err(StoreError::Validation("product name is required".into()));
        }
        self.products.push(product);
        Ok(())
    }

    /// Find a product by id
    pub fn get(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Active products whose name contains `filter` (case-insensitive),
    /// ordered by name. `None` lists every active product.
    pub fn search(&self, filter: Option<&str>) -> Vec<&Product> {
        let needle = filter.map(str::to_lowercase);
        let mut found: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.active)
            .filter(|p| match &needle {
                Some(q) => p.name.to_lowercase().contains(q),
                None => true,
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let usd = Currency::USD;
        assert_eq!(usd.to_smallest_unit(9.99), 999);
        assert_eq!(usd.to_smallest_unit(5.00), 500);
        assert_eq!(usd.from_smallest_unit(999), 9.99);

        let jpy = Currency::JPY;
        assert_eq!(jpy.to_smallest_unit(1000.0), 1000);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(29.99, Currency::USD);
        assert_eq!(price.display(), "$29.99");
        assert_eq!(Price::new(19.99, Currency::EUR).display(), "€19.99");
    }

    #[test]
    fn test_catalog_search_filters_and_sorts() {
        let mut catalog = ProductCatalog::new();
        catalog
            .add(Product::new("Walnut Desk", Price::new(120.0, Currency::USD)))
            .unwrap();
        catalog
            .add(Product::new("Desk Lamp", Price::new(25.0, Currency::USD)))
            .unwrap();
        let mut hidden = Product::new("Desk Mat", Price::new(9.0, Currency::USD));
        hidden.active = false;
        catalog.add(hidden).unwrap();

        let found = catalog.search(Some("desk"));
        let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Desk Lamp", "Walnut Desk"]);

        assert_eq!(catalog.search(None).len(), 2);
        assert!(catalog.search(Some("chair")).is_empty());
    }

    #[test]
    fn test_catalog_rejects_duplicate_id() {
        let mut catalog = ProductCatalog::new();
        let product = Product::new("Mug", Price::new(12.0, Currency::USD));
        let duplicate = product.clone();
        catalog.add(product).unwrap();
        assert!(catalog.add(duplicate).is_err());
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[products]]
            id = "7b7a4b0e-62d2-4c11-9a3f-1f2d5a7c9b10"
            name = "Field Notebook"
            description = "A5, dot grid"
            unit_price = { amount = 1250, currency = "usd" }
            stock = 40
        "#;

        let catalog = ProductCatalog::from_toml(toml_str).unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.products[0].name, "Field Notebook");
        assert_eq!(catalog.products[0].unit_price.amount, 1250);
        assert!(catalog.products[0].active);
    }
}
