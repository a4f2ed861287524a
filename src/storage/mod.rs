//! Pluggable storage for originals and their cached variations.
//!
//! The [`ImageStore`] trait is the contract every backend implements
//! identically, so the engine and the variation cache never know which one
//! they are talking to.
//!
//! | Backend | Use |
//! |---|---|
//! | [`FilesystemStore`] | Production: sharded directory tree on local disk |
//! | [`MemoryStore`] | Tests and embedding: a locked map, optional read-only mode |
//!
//! A missing blob is `Ok(None)`, never an error: that is the cache-miss
//! signal. Deleting something that is not there is
//! [`DeleteOutcome::NothingToDelete`], also not an error.

mod dirs;
pub mod fs;
pub mod memory;
pub mod shard;

pub use fs::FilesystemStore;
pub use memory::MemoryStore;

use crate::identifier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not store image (not writable: {0})")]
    NotWritable(String),
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Corrupt image info: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a delete call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// This many blobs were removed.
    Deleted(usize),
    /// The target did not exist.
    NothingToDelete,
}

impl DeleteOutcome {
    /// `NothingToDelete` when `removed` is zero.
    pub fn from_count(removed: usize) -> Self {
        if removed == 0 {
            DeleteOutcome::NothingToDelete
        } else {
            DeleteOutcome::Deleted(removed)
        }
    }

    pub fn deleted(self) -> usize {
        match self {
            DeleteOutcome::Deleted(n) => n,
            DeleteOutcome::NothingToDelete => 0,
        }
    }
}

/// Stored attributes of an original image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub account: String,
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    pub mime: String,
    /// SHA-256 of the original bytes (hex).
    pub checksum: String,
    /// Size of the original in bytes.
    pub size: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// Storage contract shared by every backend.
pub trait ImageStore: Send + Sync {
    /// Store the original bytes of an image.
    fn store_original(
        &self,
        account: &str,
        identifier: &str,
        blob: &[u8],
    ) -> Result<(), StorageError>;

    /// Fetch the original bytes, `None` if absent.
    fn get_original(&self, account: &str, identifier: &str)
    -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove the original and its stored info.
    fn delete_original(&self, account: &str, identifier: &str)
    -> Result<DeleteOutcome, StorageError>;

    /// Persist (create or replace) the info record of an original.
    fn store_info(&self, info: &ImageInfo) -> Result<(), StorageError>;

    /// Load the info record, `None` if absent.
    fn load_info(&self, account: &str, identifier: &str)
    -> Result<Option<ImageInfo>, StorageError>;

    /// Store one rendered variation. Overwrites: last write wins.
    fn store_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
        blob: &[u8],
    ) -> Result<(), StorageError>;

    /// Fetch one variation, `None` on a miss.
    fn get_variation(
        &self,
        account: &str,
        identifier: &str,
        width: u32,
    ) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete one variation (`Some(width)`) or all of them (`None`).
    fn delete_variations(
        &self,
        account: &str,
        identifier: &str,
        width: Option<u32>,
    ) -> Result<DeleteOutcome, StorageError>;
}

/// Validate both halves of a storage key before they touch a path or map.
pub(crate) fn check_keys(account: &str, identifier: &str) -> Result<(), StorageError> {
    identifier::check_account(account)
        .map_err(|p| StorageError::InvalidKey(format!("account '{account}' {p}")))?;
    identifier::check_image_identifier(identifier)
        .map_err(|p| StorageError::InvalidKey(format!("image identifier '{identifier}' {p}")))?;
    Ok(())
}
