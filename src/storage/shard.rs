//! Sharded path layout for the filesystem backend.
//!
//! A flat directory with millions of entries is slow on most filesystems.
//! Instead every image gets its own directory, nested under one level per
//! leading character of the account and of the identifier:
//!
//! ```text
//! <root>/c/h/r/christer/0/1/2/0123456789abcdef0123456789abcdef/
//!                                                            ├── 100
//!                                                            └── 640
//! ```
//!
//! Each shard level fans out at most to the size of the key alphabet, so no
//! single directory grows unbounded. The final directory holds one file per
//! cached width.
//!
//! Callers must validate keys first ([`check_keys`](super::check_keys));
//! these functions assume at least three characters.

use std::path::{Path, PathBuf};

/// Directory holding everything stored for one image.
pub fn shard_dir(root: &Path, account: &str, identifier: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    push_shards(&mut path, account);
    push_shards(&mut path, identifier);
    path
}

/// Full path of a single variation file.
pub fn variation_path(root: &Path, account: &str, identifier: &str, width: u32) -> PathBuf {
    shard_dir(root, account, identifier).join(width.to_string())
}

fn push_shards(path: &mut PathBuf, key: &str) {
    for c in key.chars().take(3) {
        let mut buf = [0u8; 4];
        path.push(c.encode_utf8(&mut buf));
    }
    path.push(key);
}
