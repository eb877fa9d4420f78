//! Device-local storage.
//!
//! [`KeyValueStore`] is the raw blob store (browser local storage, a data
//! directory, ...). [`LocalStore`] layers typed list access on top of it and
//! owns two kinds of slots:
//!
//! - the guest slot (`cart`, `wishlist`): authoritative while no user is
//!   signed in;
//! - the mirror slot (`mirror/<user>/cart`, ...): a best-effort copy of the
//!   signed-in user's remote lists, used for offline reads only.
//!
//! Loading never fails. Absent or malformed blobs read as an empty list.

use crate::{
    error::Result,
    item::{decode_entries, ListItem},
    Error, ListKind, UserId,
};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A device-scoped key-value store holding serialized blobs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`. Readers never observe a partial value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local key-value store.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// File-backed key-value store: one file per key inside a data directory.
///
/// Values are written to a temporary sibling and renamed into place.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// Flatten a key into a file name. Bytes outside `[A-Za-z0-9._-]` are
/// percent-encoded, so distinct keys never share a file.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                stem.push(char::from(byte))
            }
            _ => stem.push_str(&format!("%{byte:02X}")),
        }
    }
    stem
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Where a list lives on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    /// Guest-session lists.
    Guest,
    /// Cached copy of a signed-in user's remote lists.
    Mirror(&'a UserId),
}

impl Slot<'_> {
    /// Storage key for a list in this slot.
    pub fn key(&self, list: ListKind) -> String {
        match self {
            Slot::Guest => list.key().to_owned(),
            Slot::Mirror(user) => format!("mirror/{}/{}", user, list.key()),
        }
    }
}

/// Typed list access over a [`KeyValueStore`].
#[derive(Debug)]
pub struct LocalStore<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// The underlying key-value store.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Load a list. Absent, unreadable or malformed data yields an empty list.
    pub fn load<T: ListItem>(&self, slot: Slot<'_>) -> Vec<T> {
        let key = slot.key(T::KIND);
        let raw = match self.kv.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read local list");
                return Vec::new();
            }
        };

        match decode_list(&raw) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding malformed local list");
                Vec::new()
            }
        }
    }

    /// Overwrite a list.
    pub fn save<T: ListItem>(&self, slot: Slot<'_>, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.kv.set(&slot.key(T::KIND), &raw)
    }

    /// Remove a list entirely.
    pub fn clear(&self, slot: Slot<'_>, list: ListKind) -> Result<()> {
        self.kv.remove(&slot.key(list))
    }

    /// Save a list, or remove the key when the list is empty.
    pub fn save_or_clear<T: ListItem>(&self, slot: Slot<'_>, items: &[T]) -> Result<()> {
        if items.is_empty() {
            self.clear(slot, T::KIND)
        } else {
            self.save(slot, items)
        }
    }
}

/// Decode a serialized list.
///
/// The blob must be a JSON array. Entries that do not decode are skipped and
/// duplicate ids collapse to their first occurrence.
pub fn decode_list<T: ListItem>(raw: &str) -> Result<Vec<T>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    Ok(decode_entries(entries))
}
