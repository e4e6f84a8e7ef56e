use thiserror::Error;

pub type CofreResult<T> = Result<T, CofreError>;

/// Errors are `Clone` so a failed fetch can be handed to every caller that
/// shares a single-flight cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CofreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("vault is locked")]
    Locked,
    #[error("a vault already exists")]
    VaultExists,
    #[error("no vault found")]
    VaultMissing,
    #[error("invalid master password")]
    InvalidCredentials,
    #[error("record not found")]
    NotFound,
    #[error("remote call failed: {0}")]
    Remote(String),
    #[error("attachment flush stopped: {uploaded} uploaded, {remaining} still staged")]
    Flush { uploaded: usize, remaining: usize },
    #[error("serialization failed")]
    Serialization,
    #[error("storage operation failed")]
    Storage,
    #[error("crypto operation failed")]
    Crypto,
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for CofreError {
    fn from(_: sqlx::Error) -> Self {
        Self::Storage
    }
}

impl From<serde_json::Error> for CofreError {
    fn from(_: serde_json::Error) -> Self {
        Self::Serialization
    }
}

impl From<chacha20poly1305::aead::Error> for CofreError {
    fn from(_: chacha20poly1305::aead::Error) -> Self {
        Self::Crypto
    }
}

impl From<argon2::password_hash::Error> for CofreError {
    fn from(_: argon2::password_hash::Error) -> Self {
        Self::Crypto
    }
}
