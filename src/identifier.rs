//! Account and image identifier conventions.
//!
//! Images are content-addressed: the identifier is derived from the original
//! bytes, so uploading the same file twice lands on the same identifier and
//! the bytes are stored once. Both identifiers also become path components
//! in the sharded storage tree (their first three characters are shard
//! levels), which is why they are validated before any path is built.
//!
//! - `christer` → valid account (`c/h/r/christer/...`)
//! - `ab` → too short to shard
//! - `../etc` → rejected, would escape the storage root

use sha2::{Digest, Sha256};

/// Length of an image identifier in hex characters.
pub const IDENTIFIER_LEN: usize = 32;

/// Minimum length for any key used as a shard source.
const MIN_KEY_LEN: usize = 3;

/// SHA-256 of a byte slice as a lowercase hex string (64 chars).
pub fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Content identifier for an original: the first 32 hex characters of its
/// SHA-256 checksum.
pub fn image_identifier(bytes: &[u8]) -> String {
    let mut digest = checksum(bytes);
    digest.truncate(IDENTIFIER_LEN);
    digest
}

/// Why a key was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyProblem {
    TooShort,
    InvalidCharacter(char),
}

impl std::fmt::Display for KeyProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyProblem::TooShort => write!(f, "must be at least {MIN_KEY_LEN} characters"),
            KeyProblem::InvalidCharacter(c) => write!(f, "contains invalid character {c:?}"),
        }
    }
}

/// Check an account identifier: `[A-Za-z0-9_-]`, at least three chars.
pub fn check_account(account: &str) -> Result<(), KeyProblem> {
    check_key(account, |c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check an image identifier: hex digits only, at least three chars.
pub fn check_image_identifier(identifier: &str) -> Result<(), KeyProblem> {
    check_key(identifier, |c| c.is_ascii_hexdigit())
}

fn check_key(key: &str, allowed: impl Fn(char) -> bool) -> Result<(), KeyProblem> {
    if let Some(bad) = key.chars().find(|c| !allowed(*c)) {
        return Err(KeyProblem::InvalidCharacter(bad));
    }
    if key.len() < MIN_KEY_LEN {
        return Err(KeyProblem::TooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_32_hex_chars() {
        let id = image_identifier(b"hello world");
        assert_eq!(id.len(), IDENTIFIER_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn identifier_is_prefix_of_checksum() {
        let bytes = b"some image bytes";
        assert!(checksum(bytes).starts_with(&image_identifier(bytes)));
        assert_eq!(checksum(bytes).len(), 64);
    }

    #[test]
    fn identical_bytes_share_identifier() {
        assert_eq!(image_identifier(b"abc"), image_identifier(b"abc"));
        assert_ne!(image_identifier(b"abc"), image_identifier(b"abd"));
    }

    #[test]
    fn account_accepts_typical_names() {
        assert!(check_account("christer").is_ok());
        assert!(check_account("user_01-a").is_ok());
    }

    #[test]
    fn account_too_short() {
        assert_eq!(check_account("ab"), Err(KeyProblem::TooShort));
        assert_eq!(check_account(""), Err(KeyProblem::TooShort));
    }

    #[test]
    fn account_rejects_path_characters() {
        assert_eq!(
            check_account("../etc"),
            Err(KeyProblem::InvalidCharacter('.'))
        );
        assert_eq!(
            check_account("a/b/c"),
            Err(KeyProblem::InvalidCharacter('/'))
        );
    }

    #[test]
    fn image_identifier_must_be_hex() {
        assert!(check_image_identifier("0123456789abcdef").is_ok());
        assert_eq!(
            check_image_identifier("xyz123"),
            Err(KeyProblem::InvalidCharacter('x'))
        );
    }
}
