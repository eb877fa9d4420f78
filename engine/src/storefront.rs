//! The mutation API called by storefront UI code.
//!
//! Each operation goes through the [`SyncEngine`], then either re-renders
//! and shows a confirmation, or shows an error and leaves the UI alone.
//! The result is returned as well so callers can branch on it.

use crate::{
    catalog::{price_cart, summarize, CartLine, CartSummary, Catalog},
    engine::{Change, ListView, Outcome, SyncEngine},
    error::Result,
    local::KeyValueStore,
    remote::DocumentStore,
    session::{Session, SessionContext},
    CartItem, ItemId, ListKind, UserId, WishlistItem,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The UI collaborator: re-renders lists and shows notices.
pub trait UiHooks: Send + Sync {
    /// Re-render whatever shows `list`.
    fn refresh(&self, list: ListKind);

    fn notify(&self, notice: Notice);
}

/// Everything needed to draw the cart page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPage {
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
    /// The cart came from the offline mirror.
    pub stale: bool,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub summary: CartSummary,
    pub placed_at: DateTime<Utc>,
}

/// Storefront-facing operations over a shared [`SyncEngine`].
pub struct Storefront<K, D, C, U> {
    engine: Arc<SyncEngine<K, D>>,
    context: SessionContext,
    catalog: C,
    ui: U,
}

impl<K, D, C, U> Storefront<K, D, C, U>
where
    K: KeyValueStore,
    D: DocumentStore,
    C: Catalog,
    U: UiHooks,
{
    pub fn new(engine: Arc<SyncEngine<K, D>>, context: SessionContext, catalog: C, ui: U) -> Self {
        Self {
            engine,
            context,
            catalog,
            ui,
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<K, D>> {
        &self.engine
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// The session last published by the identity provider.
    pub fn session(&self) -> Option<Session> {
        self.context.current()
    }

    /// Keep the engine in step with the identity provider until it closes.
    pub async fn follow_identity(&self) -> Result<()> {
        self.engine.run(self.context.clone()).await
    }

    pub async fn add_to_cart(
        &self,
        id: impl Into<ItemId>,
        name: impl Into<String>,
    ) -> Result<Outcome<CartItem>> {
        let result = self.engine.add(CartItem::new(id, name)).await;
        self.report(ListKind::Cart, result, |outcome| match outcome.change {
            Change::Added => Notice::success("Product added to cart!"),
            _ => Notice::success("Cart quantity updated"),
        })
    }

    pub async fn remove_from_cart(&self, id: &str) -> Result<Outcome<CartItem>> {
        let result = self.engine.remove::<CartItem>(id).await;
        self.report(ListKind::Cart, result, |_| {
            Notice::success("Product removed from cart")
        })
    }

    /// Set a quantity outright; zero or less removes the line.
    pub async fn update_cart_item_quantity(
        &self,
        id: &str,
        quantity: i64,
    ) -> Result<Outcome<CartItem>> {
        let result = self.engine.set_quantity(id, quantity).await;
        self.report(ListKind::Cart, result, quantity_notice)
    }

    /// The `+`/`-` buttons.
    pub async fn change_cart_quantity(&self, id: &str, delta: i64) -> Result<Outcome<CartItem>> {
        let result = self.engine.adjust_quantity(id, delta).await;
        self.report(ListKind::Cart, result, quantity_notice)
    }

    pub async fn add_to_wishlist(&self, item: WishlistItem) -> Result<Outcome<WishlistItem>> {
        let result = self.engine.add(item).await;
        self.report(ListKind::Wishlist, result, |outcome| match outcome.change {
            Change::AlreadyPresent => Notice::info("Product is already in your wishlist"),
            _ => Notice::success("Added to wishlist"),
        })
    }

    pub async fn remove_from_wishlist(&self, id: &str) -> Result<Outcome<WishlistItem>> {
        let result = self.engine.remove::<WishlistItem>(id).await;
        self.report(ListKind::Wishlist, result, |_| {
            Notice::success("Removed from wishlist")
        })
    }

    /// The heart button on a product card.
    pub async fn toggle_wishlist(&self, item: WishlistItem) -> Result<Outcome<WishlistItem>> {
        let result = self.engine.toggle(item).await;
        self.report(ListKind::Wishlist, result, |outcome| match outcome.change {
            Change::Removed => Notice::success("Removed from wishlist"),
            _ => Notice::success("Added to wishlist"),
        })
    }

    /// Place an order for the signed-in user's cart and empty it.
    pub async fn checkout(&self) -> Result<Order> {
        let result = self.engine.take_cart().await.map(|(user_id, items)| {
            let lines = price_cart(&self.catalog, &items);
            let summary = summarize(&lines);
            Order {
                user_id,
                lines,
                summary,
                placed_at: Utc::now(),
            }
        });

        if let Ok(order) = &result {
            tracing::info!(
                user = %order.user_id,
                items = order.summary.item_count,
                total = %order.summary.total,
                "Order placed"
            );
        }
        self.report(ListKind::Cart, result, |_| {
            Notice::success("Order placed successfully!")
        })
    }

    /// Priced cart for rendering. A stale cart is still returned, with an
    /// error notice.
    pub async fn cart_page(&self) -> CartPage {
        let view = self.engine.view::<CartItem>().await;
        self.warn_if_stale(&view);

        let lines = price_cart(&self.catalog, &view.items);
        let summary = summarize(&lines);
        CartPage {
            lines,
            summary,
            stale: view.is_stale(),
        }
    }

    pub async fn wishlist_page(&self) -> ListView<WishlistItem> {
        let view = self.engine.view::<WishlistItem>().await;
        self.warn_if_stale(&view);
        view
    }

    /// Cart badge count: sum of quantities.
    pub async fn cart_count(&self) -> u64 {
        self.engine.view::<CartItem>().await.count()
    }

    /// Wishlist badge count: number of entries.
    pub async fn wishlist_count(&self) -> u64 {
        self.engine.view::<WishlistItem>().await.count()
    }

    fn warn_if_stale<T>(&self, view: &ListView<T>) {
        if view.stale.is_some() {
            self.ui
                .notify(Notice::error("Showing your saved list, the store is unreachable"));
        }
    }

    fn report<T>(
        &self,
        list: ListKind,
        result: Result<T>,
        on_success: impl FnOnce(&T) -> Notice,
    ) -> Result<T> {
        match &result {
            Ok(value) => {
                self.ui.refresh(list);
                self.ui.notify(on_success(value));
            }
            Err(e) => {
                tracing::warn!(list = %list, error = %e, "Storefront action failed");
                self.ui.notify(Notice::error(e.to_string()));
            }
        }
        result
    }
}

fn quantity_notice(outcome: &Outcome<CartItem>) -> Notice {
    match outcome.change {
        Change::Removed => Notice::success("Product removed from cart"),
        _ => Notice::success("Cart updated"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ProductDetails, StaticCatalog};
    use crate::local::MemoryKv;
    use crate::remote::MemoryDocuments;
    use crate::Error;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingUi {
        refreshes: Mutex<Vec<ListKind>>,
        notices: Mutex<Vec<Notice>>,
    }

    impl UiHooks for RecordingUi {
        fn refresh(&self, list: ListKind) {
            self.refreshes.lock().unwrap().push(list);
        }

        fn notify(&self, notice: Notice) {
            self.notices.lock().unwrap().push(notice);
        }
    }

    type TestStorefront = Storefront<MemoryKv, MemoryDocuments, StaticCatalog, RecordingUi>;

    fn storefront(session: Session) -> (crate::IdentityHandle, TestStorefront) {
        let engine = Arc::new(SyncEngine::new(MemoryKv::new(), MemoryDocuments::new()));
        let (identity, context) = SessionContext::fixed(session);
        let catalog = StaticCatalog::new().with_product(
            "p1",
            "Tulsi",
            ProductDetails {
                price: Decimal::new(200, 0),
                image: "tulsi.png".into(),
                category: "Herbs".into(),
            },
        );
        let storefront = Storefront::new(engine, context, catalog, RecordingUi::default());
        (identity, storefront)
    }

    fn last_notice(storefront: &TestStorefront) -> Notice {
        storefront.ui().notices.lock().unwrap().last().cloned().unwrap()
    }

    #[tokio::test]
    async fn success_refreshes_and_notifies() {
        let (_identity, storefront) = storefront(Session::Guest);
        storefront.add_to_cart("p1", "Tulsi").await.unwrap();

        assert_eq!(
            *storefront.ui().refreshes.lock().unwrap(),
            vec![ListKind::Cart]
        );
        assert_eq!(last_notice(&storefront), Notice::success("Product added to cart!"));
        assert_eq!(storefront.cart_count().await, 1);
    }

    #[tokio::test]
    async fn failure_notifies_without_refresh() {
        let (_identity, storefront) = storefront(Session::Guest);
        let result = storefront.remove_from_cart("missing-id").await;

        assert_eq!(result, Err(Error::ItemNotFound("missing-id".into())));
        assert!(storefront.ui().refreshes.lock().unwrap().is_empty());
        assert_eq!(last_notice(&storefront).level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn wishlist_duplicate_is_info() {
        let (_identity, storefront) = storefront(Session::Guest);
        let fern = WishlistItem::new("p9", "Fern", Decimal::ONE, "");
        storefront.add_to_wishlist(fern.clone()).await.unwrap();
        storefront.add_to_wishlist(fern).await.unwrap();

        assert_eq!(last_notice(&storefront).level, NoticeLevel::Info);
        assert_eq!(storefront.wishlist_count().await, 1);
    }

    #[tokio::test]
    async fn guest_checkout_requires_login() {
        let (_identity, storefront) = storefront(Session::Guest);
        storefront.add_to_cart("p1", "Tulsi").await.unwrap();

        assert_eq!(storefront.checkout().await, Err(Error::LoginRequired));
        assert_eq!(storefront.cart_count().await, 1);
    }

    #[tokio::test]
    async fn checkout_prices_and_empties_cart() {
        let (identity, storefront) = storefront(Session::Guest);
        storefront.add_to_cart("p1", "Tulsi").await.unwrap();
        storefront.change_cart_quantity("p1", 1).await.unwrap();

        identity.sign_in("u1");
        drop(identity);
        storefront.follow_identity().await.unwrap();

        let order = storefront.checkout().await.unwrap();
        assert_eq!(order.user_id, "u1");
        assert_eq!(order.summary.item_count, 2);
        assert_eq!(order.summary.subtotal, Decimal::new(400, 0));
        assert_eq!(order.summary.total, Decimal::new(450, 0));
        assert_eq!(storefront.cart_count().await, 0);
    }

    #[tokio::test]
    async fn cart_page_prices_lines() {
        let (_identity, storefront) = storefront(Session::Guest);
        storefront.add_to_cart("p1", "Tulsi").await.unwrap();
        storefront.add_to_cart("p2", "Unknown Fern").await.unwrap();

        let page = storefront.cart_page().await;
        assert_eq!(page.lines.len(), 2);
        assert_eq!(page.summary.subtotal, Decimal::new(200, 0));
        assert_eq!(page.lines[1].details.category, "Unavailable");
        assert!(!page.stale);
    }
}
