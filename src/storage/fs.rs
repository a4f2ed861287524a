//! Filesystem backend over the sharded layout in [`shard`](super::shard).
//!
//! Originals and variations live under separate roots so a variation
//! directory only ever contains width-named files:
//!
//! ```text
//! originals/c/h/r/christer/9/6/d/96d0…cdd/original
//!                                        /info.json
//! variations/c/h/r/christer/9/6/d/96d0…cdd/100
//!                                         /640
//! ```

use super::dirs::{
    TEMP_PREFIX, create_shared_dir, is_writable, read_if_exists, remove_if_exists, write_atomic,
};
use super::shard::{shard_dir, variation_path};
use super::{DeleteOutcome, ImageInfo, ImageStore, StorageError, check_keys};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const ORIGINAL_FILENAME: &str = "original";
const INFO_FILENAME: &str = "info.json";

/// Sharded filesystem store.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    originals_dir: PathBuf,
    variations_dir: PathBuf,
}

impl FilesystemStore {
    /// Use existing data roots. Nothing is created; writes fail with
    /// [`StorageError::NotWritable`] until the roots exist and are writable.
    pub fn new(originals_dir: impl Into<PathBuf>, variations_dir: impl Into<PathBuf>) -> Self {
        Self {
            originals_dir: originals_dir.into(),
            variations_dir: variations_dir.into(),
        }
    }

    /// Create the data roots if needed, then open them.
    pub fn create(
        originals_dir: impl Into<PathBuf>,
        variations_dir: impl Into<PathBuf>,
    ) -> Result<Self, StorageError> {
        let store = Self::new(originals_dir, variations_dir);
        create_shared_dir(&store.originals_dir)?;
        create_shared_dir(&store.variations_dir)?;
        Ok(store)
    }

    pub fn originals_dir(&self) -> &Path {
        &self.originals_dir
    }

    pub fn variations_dir(&self) -> &Path {
        &self.variations_dir
    }

    fn original_dir(&self, account: &str, identifier: &str) -> PathBuf {
        shard_dir(&self.originals_dir, account, identifier)
    }

    fn ensure_writable(root: &Path) -> Result<(), StorageError> {
        if is_writable(root) {
            Ok(())
        } else {
            Err(StorageError::NotWritable(root.display().to_string()))
        }
    }

    /// Write a blob into a shard directory, creating it on first use.
    fn put(root: &Path, dir: &Path, filename: &str, blob: &[u8]) -> Result<(), StorageError> {
        Self::ensure_writable(root)?;
        create_shared_dir(dir)?;
        write_atomic(&dir.join(filename), blob)?;
        Ok(())
    }
}

impl ImageStore for FilesystemStore {
    fn store_original(
        &self,
        account: &str,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), StorageError> {
        check_keys(account, identifier)?;
        let dir = self.original_dir(account, identifier);
        Self::put(&self.originals_dir, &dir, ORIGINAL_FILENAME, blob)?;
        tracing::debug!(account, identifier, bytes = blob.len(), "Stored original");
        Ok(())
    }

    fn get_original(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        check_keys(account, identifier)?;
        let path = self.original_dir(account, identifier).join(ORIGINAL_FILENAME);
        Ok(read_if_exists(&path)?)
    }

    fn delete_original(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<DeleteOutcome, StorageError> {
        check_keys(account, identifier)?;
        let dir = self.original_dir(account, identifier);
        if !dir.is_dir() {
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let mut removed = 0;
        for name in [ORIGINAL_FILENAME, INFO_FILENAME] {
            if remove_if_exists(&dir.join(name))? {
                removed += 1;
            }
        }
        remove_empty_dir(&dir)?;

        tracing::debug!(account, identifier, removed, "Deleted original");
        Ok(if removed == 0 {
            DeleteOutcome::NothingToDelete
        } else {
            DeleteOutcome::Deleted(removed)
        })
    }

    fn store_info(&self, info: &ImageInfo) -> Result<(), StorageError> {
        check_keys(&info.account, &info.identifier)?;
        let dir = self.original_dir(&info.account, &info.identifier);
        let json = serde_json::to_vec_pretty(info)?;
        Self::put(&self.originals_dir, &dir, INFO_FILENAME, &json)
    }

    fn load_info(
        &self,
        account: &str,
        identifier: &str,
    ) -> Result<Option<ImageInfo>, StorageError> {
        check_keys(account, identifier)?;
        let path = self.original_dir(account, identifier).join(INFO_FILENAME);
        match read_if_exists(&path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn store_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
        blob: &[u8],
    ) -> Result<(), StorageError> {
        check_keys(account, identifier)?;
        let dir = shard_dir(&self.variations_dir, account, identifier);
        Self::put(&self.variations_dir, &dir, &width.to_string(), blob)?;
        tracing::debug!(account, identifier, width, bytes = blob.len(), "Stored variation");
        Ok(())
    }

    fn get_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        check_keys(account, identifier)?;
        let path = variation_path(&self.variations_dir, account, identifier, width);
        Ok(read_if_exists(&path)?)
    }

    fn delete_variations(
        &self,
        account: &str,
        identifier: &str,
        width: Option<u32>,
    ) -> Result<DeleteOutcome, StorageError> {
        check_keys(account, identifier)?;

        if let Some(width) = width {
            let path = variation_path(&self.variations_dir, account, identifier, width);
            return Ok(if remove_if_exists(&path)? {
                DeleteOutcome::Deleted(1)
            } else {
                DeleteOutcome::NothingToDelete
            });
        }

        let dir = shard_dir(&self.variations_dir, account, identifier);
        if !dir.is_dir() {
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let mut removed = 0;
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            // Leftovers of interrupted writes go too, but are not variations
            let is_temp = entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX);
            if remove_if_exists(entry.path())? && !is_temp {
                removed += 1;
            }
        }
        remove_empty_dir(&dir)?;

        tracing::debug!(account, identifier, removed, "Deleted variations");
        Ok(DeleteOutcome::from_count(removed))
    }
}

/// Remove a directory that should now be empty. Already gone is fine.
fn remove_empty_dir(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use crate::test_helpers::ACCOUNT;
    use tempfile::TempDir;

    const ID: &str = "96d08a5943ebf1c5635a2995c9408cdd";

    fn temp_store() -> (TempDir, FilesystemStore) {
        let tmp = TempDir::new().unwrap();
        let store =
            FilesystemStore::create(tmp.path().join("originals"), tmp.path().join("variations"))
                .unwrap();
        (tmp, store)
    }

    #[test]
    fn satisfies_storage_contract() {
        let dirs = std::sync::Mutex::new(Vec::new());
        contract::run_all(|| {
            let (tmp, store) = temp_store();
            dirs.lock().unwrap().push(tmp);
            Box::new(store)
        });
    }

    #[test]
    fn variation_lands_in_sharded_path() {
        let (tmp, store) = temp_store();
        store.store_variation("christer", ID, 100, b"blob").unwrap();

        let expected = tmp
            .path()
            .join("variations/c/h/r/christer/9/6/d")
            .join(ID)
            .join("100");
        assert_eq!(std::fs::read(expected).unwrap(), b"blob");
    }

    #[test]
    fn delete_all_removes_container_directory() {
        let (tmp, store) = temp_store();
        for width in [100, 200, 300, 400] {
            store.store_variation(ACCOUNT, ID, width, b"x").unwrap();
        }
        let dir = shard_dir(&tmp.path().join("variations"), ACCOUNT, ID);
        assert!(dir.is_dir());

        let outcome = store.delete_variations(ACCOUNT, ID, None).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted(4));
        assert!(!dir.exists());
        assert_eq!(
            store.delete_variations(ACCOUNT, ID, None).unwrap(),
            DeleteOutcome::NothingToDelete
        );
    }

    #[test]
    fn leftover_temp_files_are_cleared_but_not_counted() {
        let (tmp, store) = temp_store();
        store.store_variation(ACCOUNT, ID, 100, b"x").unwrap();
        let dir = shard_dir(&tmp.path().join("variations"), ACCOUNT, ID);
        std::fs::write(dir.join(".tmp-abc123"), b"partial").unwrap();

        let outcome = store.delete_variations(ACCOUNT, ID, None).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted(1));
        assert!(!dir.exists());
    }

    #[test]
    fn container_with_only_temp_files_is_nothing_to_delete() {
        let (tmp, store) = temp_store();
        store.store_variation(ACCOUNT, ID, 100, b"x").unwrap();
        store.delete_variations(ACCOUNT, ID, Some(100)).unwrap();
        let dir = shard_dir(&tmp.path().join("variations"), ACCOUNT, ID);
        std::fs::write(dir.join(".tmp-abc123"), b"partial").unwrap();

        assert_eq!(
            store.delete_variations(ACCOUNT, ID, None).unwrap(),
            DeleteOutcome::NothingToDelete
        );
        assert!(!dir.exists());
    }

    #[test]
    fn unwritable_root_fails_fast() {
        let tmp = TempDir::new().unwrap();
        let store = FilesystemStore::new(tmp.path().join("missing-o"), tmp.path().join("missing-v"));

        let err = store.store_variation(ACCOUNT, ID, 100, b"x").unwrap_err();
        assert!(matches!(err, StorageError::NotWritable(_)));
        let err = store.store_original(ACCOUNT, ID, b"x").unwrap_err();
        assert!(matches!(err, StorageError::NotWritable(_)));
        // Nothing was created on the way
        assert!(!tmp.path().join("missing-v").exists());
    }

    #[test]
    fn concurrent_writers_leave_one_blob() {
        let (_tmp, store) = temp_store();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| store.store_variation(ACCOUNT, ID, 100, b"same").unwrap());
            }
        });
        assert_eq!(
            store.get_variation(ACCOUNT, ID, 100).unwrap().as_deref(),
            Some(&b"same"[..])
        );
    }

    #[test]
    fn info_is_json_on_disk() {
        let (tmp, store) = temp_store();
        let info = crate::test_helpers::sample_info(ID);
        store.store_info(&info).unwrap();

        let path = shard_dir(&tmp.path().join("originals"), ACCOUNT, ID).join(INFO_FILENAME);
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["identifier"], ID);
        assert_eq!(raw["width"], info.width);
    }
}
