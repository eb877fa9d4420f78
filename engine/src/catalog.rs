//! Render-time product lookup and cart pricing.
//!
//! Prices, images and categories are never stored authoritatively in a list.
//! They are resolved from the catalog whenever a cart is rendered.

use crate::{CartItem, ItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Orders above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Flat shipping charge below the free-shipping threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Category shown for products the catalog no longer knows.
pub const UNAVAILABLE_CATEGORY: &str = "Unavailable";

/// Current details for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub category: String,
}

impl ProductDetails {
    /// Placeholder for a product missing from the catalog.
    pub fn unavailable() -> Self {
        Self {
            price: Decimal::ZERO,
            image: String::new(),
            category: UNAVAILABLE_CATEGORY.to_string(),
        }
    }
}

/// The product catalog collaborator.
pub trait Catalog: Send + Sync {
    /// Resolve a product by id, falling back to its display name.
    fn lookup(&self, id: &str, name: &str) -> Option<ProductDetails>;
}

/// Catalog held in memory, keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    by_id: HashMap<ItemId, (String, ProductDetails)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style product registration.
    pub fn with_product(
        mut self,
        id: impl Into<ItemId>,
        name: impl Into<String>,
        details: ProductDetails,
    ) -> Self {
        self.insert(id, name, details);
        self
    }

    pub fn insert(&mut self, id: impl Into<ItemId>, name: impl Into<String>, details: ProductDetails) {
        self.by_id.insert(id.into(), (name.into(), details));
    }
}

impl Catalog for StaticCatalog {
    fn lookup(&self, id: &str, name: &str) -> Option<ProductDetails> {
        self.by_id
            .get(id)
            .or_else(|| self.by_id.values().find(|(known, _)| known == name))
            .map(|(_, details)| details.clone())
    }
}

/// One rendered cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item: CartItem,
    pub details: ProductDetails,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

/// Totals shown under the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    /// Sum of quantities
    pub item_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl CartSummary {
    pub fn is_free_shipping(&self) -> bool {
        self.shipping.is_zero()
    }
}

/// Shipping charged on a subtotal.
pub fn shipping_for(subtotal: Decimal) -> Decimal {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING
    }
}

/// Resolve every cart entry against the catalog.
pub fn price_cart<C: Catalog + ?Sized>(catalog: &C, items: &[CartItem]) -> Vec<CartLine> {
    items
        .iter()
        .map(|item| {
            let details = catalog
                .lookup(&item.id, &item.name)
                .unwrap_or_else(ProductDetails::unavailable);
            let line_total = details.price * Decimal::from(item.quantity);
            CartLine {
                item: item.clone(),
                details,
                line_total,
            }
        })
        .collect()
}

/// Totals for a set of priced lines.
pub fn summarize(lines: &[CartLine]) -> CartSummary {
    let subtotal: Decimal = lines.iter().map(|line| line.line_total).sum();
    let item_count = lines.iter().map(|line| u64::from(line.item.quantity)).sum();
    let shipping = if lines.is_empty() {
        Decimal::ZERO
    } else {
        shipping_for(subtotal)
    };

    CartSummary {
        item_count,
        subtotal,
        shipping,
        total: subtotal + shipping,
    }
}

/// Label for a count badge; large counts are capped.
pub fn badge_label(count: u64) -> String {
    if count > 99 {
        "99+".to_string()
    } else {
        count.to_string()
    }
}
