//! Crate-wide error type.
//!
//! Every operation in the engine surfaces one of these variants. The split
//! mirrors who caused the failure: client mistakes (a malformed
//! transformation list, an unknown transformation name, a missing image) map
//! to 4xx-style codes, server faults (storage, pixel work, hooks) to 500.
//! Nothing in the crate retries; callers decide.

use crate::hooks::Phase;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unknown transformation: {0}")]
    UnknownTransformation(String),
    #[error("Image not found: {account}/{identifier}")]
    ImageNotFound { account: String, identifier: String },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Transformation failed: {0}")]
    Transformation(String),
    #[error("Hook '{hook}' failed during {phase}: {message}")]
    HookExecution {
        hook: String,
        phase: Phase,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub(crate) fn not_found(account: &str, identifier: &str) -> Self {
        Error::ImageNotFound {
            account: account.to_string(),
            identifier: identifier.to_string(),
        }
    }

    /// HTTP-style status code for the response formatter.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) | Error::UnknownTransformation(_) => 400,
            Error::Storage(StorageError::InvalidKey(_)) => 400,
            Error::ImageNotFound { .. } => 404,
            Error::Storage(_) | Error::Transformation(_) | Error::HookExecution { .. } => 500,
        }
    }

    /// Whether the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(Error::invalid("bad").status_code(), 400);
        assert_eq!(
            Error::UnknownTransformation("sepia".into()).status_code(),
            400
        );
        assert_eq!(Error::not_found("christer", "abc").status_code(), 404);
        assert!(Error::not_found("christer", "abc").is_client_error());
    }

    #[test]
    fn invalid_storage_key_is_client_error() {
        let err = Error::from(StorageError::InvalidKey("ab".into()));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn server_faults_map_to_500() {
        let storage = Error::from(StorageError::NotWritable("/data".into()));
        assert_eq!(storage.status_code(), 500);
        assert!(!storage.is_client_error());
        assert_eq!(Error::Transformation("boom".into()).status_code(), 500);

        let hook = Error::HookExecution {
            hook: "audit".into(),
            phase: Phase::PreExec,
            message: "denied".into(),
        };
        assert_eq!(hook.status_code(), 500);
        assert_eq!(
            hook.to_string(),
            "Hook 'audit' failed during preExec: denied"
        );
    }
}
