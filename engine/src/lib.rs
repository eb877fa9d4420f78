//! # Tote Engine
//!
//! Cart and wishlist synchronization for storefronts that let shoppers
//! collect items before signing in.
//!
//! A guest's lists live on the device. Once the shopper signs in, their
//! account's remote document becomes the source of truth, the guest lists
//! are folded into it exactly once, and the device keeps a mirror of the
//! account lists for offline reads.
//!
//! ## Core Concepts
//!
//! ### Stores
//!
//! - [`LocalStore`] over a [`KeyValueStore`] ([`MemoryKv`], [`FileKv`]):
//!   guest lists and the signed-in mirror. Malformed data reads as empty.
//! - [`RemoteStore`] over a [`DocumentStore`] ([`MemoryDocuments`],
//!   [`HttpDocuments`]): per-user documents with `cart` and `wishlist`
//!   fields, changed by read-modify-write.
//!
//! ### Engine
//!
//! The [`SyncEngine`] follows [`Session`] changes published through a
//! [`SessionContext`] and routes every read and write to whichever store is
//! authoritative. On sign-in it merges guest lists by item id with the
//! remote copy winning ([`reconcile`]).
//!
//! ### Storefront
//!
//! [`Storefront`] is the surface UI code calls: add/remove/quantity
//! operations, wishlist toggles, checkout and priced cart pages. It reports
//! back through [`UiHooks`].
//!
//! ## Quick Start
//!
//! ```rust
//! use tote_engine::{CartItem, MemoryDocuments, MemoryKv, Session, SyncEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = SyncEngine::new(MemoryKv::new(), MemoryDocuments::new());
//!
//! // Guests keep their cart on the device.
//! engine.add(CartItem::new("p1", "Tulsi").quantity(2)).await.unwrap();
//!
//! // Signing in folds it into the account.
//! engine.observe(Session::Authenticated("u1".into())).await;
//!
//! let cart = engine.view::<CartItem>().await;
//! assert_eq!(cart.count(), 2);
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod item;
pub mod local;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod storefront;

// Re-export main types at crate root
pub use catalog::{CartLine, CartSummary, Catalog, ProductDetails, StaticCatalog};
pub use config::{ClientConfig, ConfigError};
pub use engine::{Change, ListView, Mode, Outcome, SyncEngine, Transition};
pub use error::Error;
pub use http::HttpDocuments;
pub use item::{CartItem, ListItem, ListKind, WishlistItem};
pub use local::{FileKv, KeyValueStore, LocalStore, MemoryKv, Slot};
pub use reconcile::{LoginReport, MergePlan, MergeReport};
pub use remote::{Document, DocumentStore, MemoryDocuments, RemoteStore};
pub use session::{IdentityHandle, Session, SessionContext, SessionState};
pub use storefront::{CartPage, Notice, NoticeLevel, Order, Storefront, UiHooks};

/// Type aliases for clarity
pub type UserId = String;
pub type ItemId = String;
