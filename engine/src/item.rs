//! Cart and wishlist entries.

use crate::ItemId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// The two synchronized lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Cart,
    Wishlist,
}

impl ListKind {
    /// Well-known key, used both as the local storage key and as the field
    /// name in the remote user document.
    pub fn key(self) -> &'static str {
        match self {
            ListKind::Cart => "cart",
            ListKind::Wishlist => "wishlist",
        }
    }
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// An entry of a synchronized list.
///
/// Lists are sets keyed by [`ListItem::id`].
pub trait ListItem:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Which list this item type lives in.
    const KIND: ListKind;

    /// Stable product identifier.
    fn id(&self) -> &str;

    /// How many units this entry contributes to the list's count.
    fn units(&self) -> u64;

    /// Fold a repeated add of the same id into this entry.
    ///
    /// Returns false when the list already expresses the add and nothing
    /// changed.
    fn absorb(&mut self, incoming: Self) -> bool;

    /// Whether a decoded entry belongs in the list at all.
    fn is_valid(&self) -> bool {
        true
    }
}

fn default_quantity() -> u32 {
    1
}

/// An entry in the shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ItemId,
    pub name: String,
    /// Always at least 1; entries reaching 0 are removed.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Set on insertion, never touched by quantity changes.
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// A single unit of a product, added now.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self::with_added_at(id, name, Utc::now())
    }

    /// A single unit of a product, added at the given instant.
    pub fn with_added_at(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity: 1,
            added_at,
        }
    }

    /// Builder-style quantity override.
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }
}

impl ListItem for CartItem {
    const KIND: ListKind = ListKind::Cart;

    fn id(&self) -> &str {
        &self.id
    }

    fn units(&self) -> u64 {
        u64::from(self.quantity.max(1))
    }

    fn absorb(&mut self, incoming: Self) -> bool {
        self.quantity = self.quantity.saturating_add(incoming.quantity.max(1));
        true
    }

    fn is_valid(&self) -> bool {
        self.quantity > 0
    }
}

/// An entry in the wishlist. Membership is boolean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: ItemId,
    pub name: String,
    /// Price when the item was wished for. Older entries carry the display
    /// text (`"₹450"`); anything unreadable becomes zero.
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "lenient_price",
        default
    )]
    pub price: Decimal,
    #[serde(default)]
    pub image: String,
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        price: Decimal,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: image.into(),
            added_at: Utc::now(),
        }
    }
}

impl ListItem for WishlistItem {
    const KIND: ListKind = ListKind::Wishlist;

    fn id(&self) -> &str {
        &self.id
    }

    fn units(&self) -> u64 {
        1
    }

    fn absorb(&mut self, _incoming: Self) -> bool {
        false
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
    Other(Value),
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    let price = match RawPrice::deserialize(deserializer)? {
        RawPrice::Number(n) => Decimal::try_from(n).unwrap_or_default(),
        RawPrice::Text(text) => parse_price_text(&text),
        RawPrice::Other(_) => Decimal::ZERO,
    };
    Ok(price)
}

/// Read a displayed price such as `"₹1,299.50"`.
fn parse_price_text(text: &str) -> Decimal {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or_default()
}

/// Decode list entries one by one, skipping those that do not decode or are
/// not valid list members. Duplicate ids collapse to their first occurrence.
pub fn decode_entries<T: ListItem>(entries: Vec<Value>) -> Vec<T> {
    let total = entries.len();
    let items: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<T>(entry).ok())
        .filter(T::is_valid)
        .collect();

    if items.len() < total {
        tracing::warn!(
            list = %T::KIND,
            skipped = total - items.len(),
            "Skipped undecodable list entries"
        );
    }

    dedupe_by_id(items)
}

/// Drop entries whose id was already seen, keeping the first occurrence.
pub fn dedupe_by_id<T: ListItem>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id().to_owned()))
        .collect()
}

/// Find an entry by id.
pub fn find<'a, T: ListItem>(items: &'a [T], id: &str) -> Option<&'a T> {
    items.iter().find(|item| item.id() == id)
}

/// Count view: sum of units (cart quantities, or one per wishlist entry).
pub fn count<T: ListItem>(items: &[T]) -> u64 {
    items.iter().map(ListItem::units).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_keys() {
        assert_eq!(ListKind::Cart.key(), "cart");
        assert_eq!(ListKind::Wishlist.key(), "wishlist");
        assert_eq!(ListKind::Wishlist.to_string(), "wishlist");
    }

    #[test]
    fn cart_item_defaults_quantity_to_one() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "p1",
            "name": "Tulsi",
            "addedAt": "2024-02-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(item.quantity, 1);
        assert_eq!(item.units(), 1);
    }

    #[test]
    fn cart_item_ignores_legacy_fields() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "p1",
            "name": "Tulsi",
            "price": 199.0,
            "image": "tulsi.png",
            "quantity": 3,
            "addedAt": "2024-02-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn cart_item_serializes_camel_case() {
        let item = CartItem::new("p1", "Tulsi").quantity(2);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["quantity"], 2);
        assert!(value.get("addedAt").is_some());
    }

    #[test]
    fn quantity_builder_floors_at_one() {
        assert_eq!(CartItem::new("p1", "Tulsi").quantity(0).quantity, 1);
    }

    #[test]
    fn wishlist_price_is_a_json_number() {
        let item = WishlistItem::new("p2", "Aloe", Decimal::new(24950, 2), "aloe.png");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["price"], json!(249.5));
    }

    #[test]
    fn absorb_repeated_adds() {
        let mut cart_item = CartItem::new("p1", "Tulsi").quantity(2);
        let added_at = cart_item.added_at;
        assert!(cart_item.absorb(CartItem::new("p1", "Tulsi")));
        assert_eq!(cart_item.quantity, 3);
        assert_eq!(cart_item.added_at, added_at);

        let mut wished = WishlistItem::new("p1", "Tulsi", Decimal::ONE, "");
        assert!(!wished.absorb(wished.clone()));
    }

    #[test]
    fn dedupe_keeps_first() {
        let a = CartItem::new("p1", "first").quantity(2);
        let b = CartItem::new("p1", "second");
        let c = CartItem::new("p2", "other");

        let deduped = dedupe_by_id(vec![a.clone(), b, c.clone()]);
        assert_eq!(deduped, vec![a, c]);
    }

    #[test]
    fn counts() {
        let cart = vec![
            CartItem::new("p1", "a").quantity(2),
            CartItem::new("p2", "b"),
        ];
        assert_eq!(count(&cart), 3);

        let wishlist = vec![
            WishlistItem::new("p1", "a", Decimal::ZERO, ""),
            WishlistItem::new("p2", "b", Decimal::ZERO, ""),
        ];
        assert_eq!(count(&wishlist), 2);
        assert!(find(&wishlist, "p2").is_some());
        assert!(find(&wishlist, "p3").is_none());
    }

    #[test]
    fn wishlist_price_from_display_text() {
        let decode = |price: Value| -> WishlistItem {
            serde_json::from_value(json!({
                "id": "p2",
                "name": "Aloe",
                "price": price,
                "image": "aloe.png",
                "addedAt": "2024-02-01T10:00:00Z"
            }))
            .unwrap()
        };

        assert_eq!(decode(json!("₹450")).price, Decimal::new(450, 0));
        assert_eq!(decode(json!("₹1,299.50")).price, Decimal::new(129950, 2));
        assert_eq!(decode(json!("")).price, Decimal::ZERO);
        assert_eq!(decode(json!("call us")).price, Decimal::ZERO);
        assert_eq!(decode(Value::Null).price, Decimal::ZERO);
        assert_eq!(decode(json!(249.5)).price, Decimal::new(2495, 1));
    }

    #[test]
    fn decode_entries_skips_zero_quantity_and_garbage() {
        let entries = vec![
            json!({"id": "p1", "name": "Tulsi", "quantity": 0, "addedAt": "2024-02-01T10:00:00Z"}),
            json!({"id": "p2", "name": "Aloe", "quantity": 2, "addedAt": "2024-02-01T10:00:00Z"}),
            json!({"id": "p3", "quantity": -1}),
            json!("p4"),
        ];
        let cart: Vec<CartItem> = decode_entries(entries);

        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id, "p2");
        assert_eq!(count(&cart), 2);
    }
}
