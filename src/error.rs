use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors surfaced by vault operations.
///
/// Every operation either completes or fails with one of these; none are
/// retried, and a failed operation never leaves the in-memory cache out of
/// sync with the file on disk.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("no key with id '{0}' in the vault")]
    NotFound(Uuid),

    #[error("cannot decrypt vault: {0}")]
    Decryption(String),

    #[error("{0}")]
    Validation(String),

    #[error("vault file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vault data error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VaultError {
    pub(crate) fn wrong_key() -> Self {
        VaultError::Decryption("wrong password or corrupted data".to_string())
    }
}
