//! In-memory backend.
//!
//! Same contract as the filesystem store, without touching disk. Useful for
//! tests and for embedding the engine where persistence is someone else's
//! job. A read-only store refuses every write with
//! [`StorageError::NotWritable`], which is how failure paths upstream are
//! exercised.

use super::{DeleteOutcome, ImageInfo, ImageStore, StorageError, check_keys};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

type Key = (String, String);

#[derive(Debug, Default)]
struct Entry {
    original: Option<Vec<u8>>,
    info: Option<ImageInfo>,
    variations: BTreeMap<u32, Vec<u8>>,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.original.is_none() && self.info.is_none() && self.variations.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Key, Entry>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write.
    pub fn read_only() -> Self {
        let store = Self::default();
        store.set_read_only(true);
        store
    }

    /// Switch write rejection on or off, e.g. after seeding.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// Number of variations held for one image.
    pub fn variation_count(&self, account: &str, identifier: &str) -> usize {
        self.entries
            .read()
            .get(&key(account, identifier))
            .map_or(0, |e| e.variations.len())
    }

    fn write<T>(
        &self,
        account: &str,
        identifier: &str,
        f: impl FnOnce(&mut Entry) -> T,
    ) -> Result<T, StorageError> {
        check_keys(account, identifier)?;
        if self.read_only.load(Ordering::Relaxed) {
            return Err(StorageError::NotWritable("memory store is read-only".into()));
        }
        let mut entries = self.entries.write();
        let entry = entries.entry(key(account, identifier)).or_default();
        let out = f(entry);
        if entry.is_empty() {
            entries.remove(&key(account, identifier));
        }
        Ok(out)
    }

    fn read<T>(
        &self,
        account: &str,
        identifier: &str,
        f: impl FnOnce(&Entry) -> Option<T>,
    ) -> Result<Option<T>, StorageError> {
        check_keys(account, identifier)?;
        Ok(self
            .entries
            .read()
            .get(&key(account, identifier))
            .and_then(f))
    }
}

fn key(account: &str, identifier: &str) -> Key {
    (account.to_string(), identifier.to_string())
}

impl ImageStore for MemoryStore {
    fn store_original(
        &self,
        account: &str,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), StorageError> {
        self.write(account, identifier, |e| e.original = Some(blob.to_vec()))
    }

    fn get_original(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        self.read(account, identifier, |e| e.original.clone())
    }

    fn delete_original(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<DeleteOutcome, StorageError> {
        self.write(account, identifier, |e| {
            let original = usize::from(e.original.take().is_some());
            let info = usize::from(e.info.take().is_some());
            DeleteOutcome::from_count(original + info)
        })
    }

    fn store_info(&self, info: &ImageInfo) -> Result<(), StorageError> {
        self.write(&info.account, &info.identifier, |e| e.info = Some(info.clone()))
    }

    fn load_info(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<Option<ImageInfo>, StorageError> {
        self.read(account, identifier, |e| e.info.clone())
    }

    fn store_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
        blob: &[u8],
    ) -> Result<(), StorageError> {
        self.write(account, identifier, |e| {
            e.variations.insert(width, blob.to_vec());
        })
    }

    fn get_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        self.read(account, identifier, |e| e.variations.get(&width).cloned())
    }

    fn delete_variations(
        &self,
        account: &str,
        identifier: &str,
        width: Option<u32>,
    ) -> Result<DeleteOutcome, StorageError> {
        self.write(account, identifier, |e| match width {
            Some(width) => {
                DeleteOutcome::from_count(usize::from(e.variations.remove(&width).is_some()))
            }
            None => DeleteOutcome::from_count(std::mem::take(&mut e.variations).len()),
        })
    }
}
