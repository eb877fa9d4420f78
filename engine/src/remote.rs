//! Remote per-user documents.
//!
//! Each signed-in user owns one document whose list-valued fields (`cart`,
//! `wishlist`) hold that user's lists. The store offers last-writer-wins
//! field merges and nothing more: every list change here is a
//! read-modify-write against the latest fetched snapshot. Two writers racing
//! on the same list can lose an update.

use crate::{
    error::Result,
    item::{decode_entries, ListItem},
    Error, UserId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;

/// A user document: top-level field name to value.
pub type Document = serde_json::Map<String, Value>;

/// The remote persistence collaborator.
pub trait DocumentStore: Send + Sync {
    /// Fetch a user's document. `Ok(None)` when the user has none yet.
    fn fetch_document(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Merge top-level fields into a user's document, creating it if missing.
    /// Fields not named in `fields` are left untouched.
    fn merge_document(
        &self,
        user: &UserId,
        fields: Document,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// In-process document store.
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: Mutex<HashMap<UserId, Document>>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's document, replacing any existing one.
    pub async fn insert(&self, user: impl Into<UserId>, document: Document) {
        self.documents.lock().await.insert(user.into(), document);
    }

    /// Snapshot of a user's document.
    pub async fn get(&self, user: &str) -> Option<Document> {
        self.documents.lock().await.get(user).cloned()
    }
}

impl DocumentStore for MemoryDocuments {
    async fn fetch_document(&self, user: &UserId) -> Result<Option<Document>> {
        Ok(self.documents.lock().await.get(user).cloned())
    }

    async fn merge_document(&self, user: &UserId, fields: Document) -> Result<()> {
        let mut documents = self.documents.lock().await;
        let document = documents.entry(user.clone()).or_default();
        for (name, value) in fields {
            document.insert(name, value);
        }
        Ok(())
    }
}

/// Typed list access over a [`DocumentStore`].
#[derive(Debug)]
pub struct RemoteStore<D> {
    docs: D,
}

impl<D: DocumentStore> RemoteStore<D> {
    pub fn new(docs: D) -> Self {
        Self { docs }
    }

    /// The underlying document store.
    pub fn docs(&self) -> &D {
        &self.docs
    }

    /// Fetch a list.
    ///
    /// Fails with [`Error::DocumentNotFound`] when the user has no document
    /// and [`Error::MalformedData`] when the field is not a list. A document
    /// without the list field holds an empty list. Entries that do not decode
    /// are skipped.
    pub async fn fetch<T: ListItem>(&self, user: &UserId) -> Result<Vec<T>> {
        let document = self
            .docs
            .fetch_document(user)
            .await?
            .ok_or_else(|| Error::DocumentNotFound(user.clone()))?;

        match document.get(T::KIND.key()) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(entries)) => Ok(decode_entries(entries.clone())),
            Some(other) => Err(Error::MalformedData(format!(
                "remote {} for {} is not a list: {}",
                T::KIND,
                user,
                other
            ))),
        }
    }

    /// Fetch a list, treating a missing document as an empty list.
    pub async fn fetch_or_empty<T: ListItem>(&self, user: &UserId) -> Result<Vec<T>> {
        match self.fetch(user).await {
            Err(Error::DocumentNotFound(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    /// Replace a whole list. Returns the list as written.
    pub async fn replace<T: ListItem>(&self, user: &UserId, items: Vec<T>) -> Result<Vec<T>> {
        let mut fields = Document::new();
        fields.insert(T::KIND.key().to_owned(), serde_json::to_value(&items)?);
        self.docs.merge_document(user, fields).await?;
        Ok(items)
    }

    /// Append an item unless its id is already present.
    ///
    /// Returns the resulting list and whether the item was appended.
    pub async fn add_one<T: ListItem>(&self, user: &UserId, item: T) -> Result<(Vec<T>, bool)> {
        let mut items: Vec<T> = self.fetch_or_empty(user).await?;
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Ok((items, false));
        }
        items.push(item);
        let items = self.replace(user, items).await?;
        Ok((items, true))
    }

    /// Remove an item by id.
    pub async fn remove_one<T: ListItem>(&self, user: &UserId, id: &str) -> Result<Vec<T>> {
        let mut items: Vec<T> = self.fetch_or_empty(user).await?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return Err(Error::ItemNotFound(id.to_owned()));
        }
        self.replace(user, items).await
    }

    /// Rewrite an item by id. A patch returning `None` removes the item.
    pub async fn update_one<T, F>(&self, user: &UserId, id: &str, patch: F) -> Result<Vec<T>>
    where
        T: ListItem,
        F: FnOnce(T) -> Option<T> + Send,
    {
        let mut items: Vec<T> = self.fetch_or_empty(user).await?;
        let index = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_owned()))?;

        let current = items.remove(index);
        if let Some(updated) = patch(current) {
            items.insert(index, updated);
        }
        self.replace(user, items).await
    }
}
