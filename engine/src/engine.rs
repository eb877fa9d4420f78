//! The synchronization engine.
//!
//! Exactly one store is authoritative at any instant:
//!
//! - [`Mode::Guest`]: the device-local guest lists;
//! - [`Mode::Auth`]: the user's remote document, with the local mirror kept
//!   as a best-effort copy for offline reads.
//!
//! Session transitions, reads and mutations all queue on one async lock and
//! run to completion (remote round trips included) in arrival order, so two
//! read-modify-write cycles on the same remote list never interleave.

use crate::{
    error::Result,
    item::{self, ListItem},
    local::{KeyValueStore, LocalStore, Slot},
    reconcile::{plan_merge, LoginReport, MergeReport},
    remote::{DocumentStore, RemoteStore},
    session::{Session, SessionContext},
    CartItem, Error, ListKind, UserId, WishlistItem,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Which store is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Guest,
    Auth(UserId),
}

impl Mode {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Mode::Guest => None,
            Mode::Auth(user) => Some(user),
        }
    }
}

/// What a session notification did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Guest stayed guest.
    Unchanged,
    /// A signed-in user left; their mirror was dropped.
    SignedOut { user: UserId },
    /// A user is (still) signed in; guest lists were merged into theirs.
    Authenticated { user: UserId, report: LoginReport },
}

/// What a mutation did to its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Change {
    Added,
    Updated,
    Removed,
    /// The item was already in the list; nothing was written.
    AlreadyPresent,
}

impl Change {
    fn writes(self) -> bool {
        !matches!(self, Change::AlreadyPresent)
    }
}

/// Result of a successful mutation: the change and the authoritative list
/// after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub change: Change,
    pub items: Vec<T>,
}

/// A list as currently visible to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub items: Vec<T>,
    /// Set when the remote store could not be read and `items` came from the
    /// local mirror.
    pub stale: Option<Error>,
}

impl<T: ListItem> ListView<T> {
    /// Count view: cart quantities summed, or wishlist entries.
    pub fn count(&self) -> u64 {
        item::count(&self.items)
    }

    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }
}

/// Routes list reads and writes to the authoritative store and folds guest
/// lists into an account on sign-in.
#[derive(Debug)]
pub struct SyncEngine<K, D> {
    local: LocalStore<K>,
    remote: RemoteStore<D>,
    mode: Mutex<Mode>,
}

impl<K: KeyValueStore, D: DocumentStore> SyncEngine<K, D> {
    /// Create an engine in guest mode.
    pub fn new(kv: K, docs: D) -> Self {
        Self {
            local: LocalStore::new(kv),
            remote: RemoteStore::new(docs),
            mode: Mutex::new(Mode::Guest),
        }
    }

    pub fn local(&self) -> &LocalStore<K> {
        &self.local
    }

    pub fn remote(&self) -> &RemoteStore<D> {
        &self.remote
    }

    /// Current mode. Waits for any in-flight operation.
    pub async fn mode(&self) -> Mode {
        self.mode.lock().await.clone()
    }

    /// Follow the identity provider: wait for its first session, apply it,
    /// then apply every change until the provider goes away.
    pub async fn run(&self, mut context: SessionContext) -> Result<()> {
        let session = context.ready().await?;
        self.observe(session).await;

        while let Some(session) = context.next().await {
            self.observe(session).await;
        }

        tracing::debug!("Identity provider closed, session watch ended");
        Ok(())
    }

    /// Apply a session notification.
    ///
    /// Observing the same signed-in user again retries any merge that was
    /// left incomplete.
    pub async fn observe(&self, session: Session) -> Transition {
        let mut mode = self.mode.lock().await;

        let outgoing = match &*mode {
            Mode::Auth(previous) if session.user() != Some(previous) => Some(previous.clone()),
            _ => None,
        };
        if let Some(previous) = &outgoing {
            self.drop_mirror(previous);
            tracing::info!(user = %previous, "User signed out, mirror cleared");
        }

        match session {
            Session::Guest => {
                *mode = Mode::Guest;
                match outgoing {
                    Some(user) => Transition::SignedOut { user },
                    None => Transition::Unchanged,
                }
            }
            Session::Authenticated(user) => {
                *mode = Mode::Auth(user.clone());
                let report = self.merge_on_login(&user).await;
                Transition::Authenticated { user, report }
            }
        }
    }

    async fn merge_on_login(&self, user: &UserId) -> LoginReport {
        let mut report = LoginReport::default();
        *report.for_list_mut(ListKind::Cart) = self.merge_list::<CartItem>(user).await;
        *report.for_list_mut(ListKind::Wishlist) = self.merge_list::<WishlistItem>(user).await;

        tracing::info!(
            user = %user,
            cart_appended = report.cart.appended.len(),
            wishlist_appended = report.wishlist.appended.len(),
            complete = report.is_complete(),
            "Merged guest lists on login"
        );
        report
    }

    /// Fold the guest list into the user's remote list, one append at a time.
    async fn merge_list<T: ListItem>(&self, user: &UserId) -> MergeReport {
        let guest: Vec<T> = self.local.load(Slot::Guest);
        let mut report = MergeReport::default();

        if guest.is_empty() {
            self.refresh_mirror::<T>(user).await;
            return report;
        }

        let remote = match self.remote.fetch_or_empty::<T>(user).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(user = %user, list = %T::KIND, error = %e, "Merge postponed");
                report.pending = ids(&guest);
                report.failure = Some(e.to_string());
                return report;
            }
        };
        self.store_mirror(user, &remote);

        let plan = plan_merge(&remote, &guest);
        report.dropped = ids(&plan.dropped);

        let mut merged = 0;
        for item in &plan.to_append {
            match self.remote.add_one(user, item.clone()).await {
                Ok((items, appended)) => {
                    merged += 1;
                    if appended {
                        report.appended.push(item.id().to_owned());
                    } else {
                        // Another writer added the same id in the meantime.
                        report.dropped.push(item.id().to_owned());
                    }
                    self.store_mirror(user, &items);
                    self.store_guest(&plan.to_append[merged..]);
                }
                Err(e) => {
                    tracing::warn!(
                        user = %user,
                        list = %T::KIND,
                        id = %item.id(),
                        error = %e,
                        "Merge stopped, remainder kept for retry"
                    );
                    report.failure = Some(e.to_string());
                    break;
                }
            }
        }

        let remaining = &plan.to_append[merged..];
        self.store_guest(remaining);
        report.pending = ids(remaining);

        self.refresh_mirror::<T>(user).await;
        report
    }

    /// Read a list from the authoritative store.
    ///
    /// Signed in, a failed remote read falls back to the mirror and reports
    /// [`Error::SyncFailure`] in [`ListView::stale`].
    pub async fn view<T: ListItem>(&self) -> ListView<T> {
        let mode = self.mode.lock().await;
        match &*mode {
            Mode::Guest => ListView {
                items: self.local.load(Slot::Guest),
                stale: None,
            },
            Mode::Auth(user) => match self.remote.fetch_or_empty::<T>(user).await {
                Ok(items) => {
                    self.store_mirror(user, &items);
                    ListView { items, stale: None }
                }
                Err(e) => {
                    tracing::warn!(user = %user, list = %T::KIND, error = %e, "Serving mirror");
                    ListView {
                        items: self.local.load(Slot::Mirror(user)),
                        stale: Some(Error::SyncFailure(e.to_string())),
                    }
                }
            },
        }
    }

    /// Add an item. A repeated cart add raises the quantity; a repeated
    /// wishlist add changes nothing.
    pub async fn add<T: ListItem>(&self, item: T) -> Result<Outcome<T>> {
        self.mutate(move |items: &mut Vec<T>| Ok(apply_add(items, item)))
            .await
    }

    /// Remove an item by id.
    pub async fn remove<T: ListItem>(&self, id: &str) -> Result<Outcome<T>> {
        self.mutate(|items: &mut Vec<T>| apply_remove(items, id))
            .await
    }

    /// Remove the item if its id is listed, add it otherwise.
    pub async fn toggle<T: ListItem>(&self, item: T) -> Result<Outcome<T>> {
        self.mutate(move |items: &mut Vec<T>| {
            let id = item.id().to_owned();
            if item::find(items, &id).is_some() {
                apply_remove(items, &id)
            } else {
                Ok(apply_add(items, item))
            }
        })
        .await
    }

    /// Set a cart item's quantity. Zero or less removes the item.
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> Result<Outcome<CartItem>> {
        self.mutate(|items: &mut Vec<CartItem>| apply_set_quantity(items, id, quantity))
            .await
    }

    /// Change a cart item's quantity by `delta`, removing it at zero.
    pub async fn adjust_quantity(&self, id: &str, delta: i64) -> Result<Outcome<CartItem>> {
        self.mutate(|items: &mut Vec<CartItem>| {
            let current = item::find(items, id)
                .map(|item| i64::from(item.quantity))
                .ok_or_else(|| Error::ItemNotFound(id.to_owned()))?;
            apply_set_quantity(items, id, current.saturating_add(delta))
        })
        .await
    }

    /// Empty the signed-in user's cart for checkout, returning what it held.
    pub async fn take_cart(&self) -> Result<(UserId, Vec<CartItem>)> {
        let mode = self.mode.lock().await;
        let user = mode.user().ok_or(Error::LoginRequired)?;

        let items: Vec<CartItem> = self.remote.fetch_or_empty(user).await?;
        if items.is_empty() {
            return Err(Error::EmptyCart);
        }

        self.remote.replace::<CartItem>(user, Vec::new()).await?;
        if let Err(e) = self.local.clear(Slot::Mirror(user), ListKind::Cart) {
            tracing::warn!(user = %user, error = %e, "Failed to clear cart mirror");
        }

        tracing::info!(user = %user, items = items.len(), "Cart taken for checkout");
        Ok((user.clone(), items))
    }

    /// Read-modify-write against the authoritative store.
    ///
    /// The closure sees the latest list; nothing is persisted if it fails.
    /// Signed in, the mirror is overwritten with the list the remote store
    /// accepted.
    async fn mutate<T, F>(&self, f: F) -> Result<Outcome<T>>
    where
        T: ListItem,
        F: FnOnce(&mut Vec<T>) -> Result<Change> + Send,
    {
        let mode = self.mode.lock().await;
        match &*mode {
            Mode::Guest => {
                let mut items: Vec<T> = self.local.load(Slot::Guest);
                let change = f(&mut items)?;
                if change.writes() {
                    self.local.save_or_clear(Slot::Guest, &items)?;
                }
                tracing::debug!(list = %T::KIND, ?change, "Guest list updated");
                Ok(Outcome { change, items })
            }
            Mode::Auth(user) => {
                let mut items: Vec<T> = self.remote.fetch_or_empty(user).await?;
                let change = f(&mut items)?;
                let items = if change.writes() {
                    self.remote.replace(user, items).await?
                } else {
                    items
                };
                self.store_mirror(user, &items);
                tracing::debug!(user = %user, list = %T::KIND, ?change, "Remote list updated");
                Ok(Outcome { change, items })
            }
        }
    }

    async fn refresh_mirror<T: ListItem>(&self, user: &UserId) {
        match self.remote.fetch_or_empty::<T>(user).await {
            Ok(items) => self.store_mirror(user, &items),
            Err(e) => {
                tracing::warn!(user = %user, list = %T::KIND, error = %e, "Mirror refresh failed");
            }
        }
    }

    fn store_mirror<T: ListItem>(&self, user: &UserId, items: &[T]) {
        if let Err(e) = self.local.save(Slot::Mirror(user), items) {
            tracing::warn!(user = %user, list = %T::KIND, error = %e, "Mirror write failed");
        }
    }

    fn store_guest<T: ListItem>(&self, items: &[T]) {
        if let Err(e) = self.local.save_or_clear(Slot::Guest, items) {
            tracing::warn!(list = %T::KIND, error = %e, "Guest list write failed");
        }
    }

    fn drop_mirror(&self, user: &UserId) {
        for list in [ListKind::Cart, ListKind::Wishlist] {
            if let Err(e) = self.local.clear(Slot::Mirror(user), list) {
                tracing::warn!(user = %user, list = %list, error = %e, "Failed to clear mirror");
            }
        }
    }
}

fn ids<T: ListItem>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.id().to_owned()).collect()
}

fn apply_add<T: ListItem>(items: &mut Vec<T>, incoming: T) -> Change {
    match items.iter_mut().find(|item| item.id() == incoming.id()) {
        Some(existing) => {
            if existing.absorb(incoming) {
                Change::Updated
            } else {
                Change::AlreadyPresent
            }
        }
        None => {
            items.push(incoming);
            Change::Added
        }
    }
}

fn apply_remove<T: ListItem>(items: &mut Vec<T>, id: &str) -> Result<Change> {
    let index = items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| Error::ItemNotFound(id.to_owned()))?;
    items.remove(index);
    Ok(Change::Removed)
}

fn apply_set_quantity(items: &mut Vec<CartItem>, id: &str, quantity: i64) -> Result<Change> {
    if quantity <= 0 {
        return apply_remove(items, id);
    }

    let item = items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| Error::ItemNotFound(id.to_owned()))?;
    item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
    Ok(Change::Updated)
}
